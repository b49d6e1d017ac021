// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Onboarding and app-config collaborators, consumed by RPC handlers.

use async_trait::async_trait;
use thiserror::Error;

/// Errors from onboarding operations
#[derive(Debug, Clone, Error)]
pub enum OnboardError {
    #[error("onboarding failed: {0}")]
    Failed(String),
}

/// Guidance-file onboarding, owned by an external collaborator.
#[async_trait]
pub trait OnboardingService: Send + Sync {
    async fn status(&self) -> Result<serde_json::Value, OnboardError>;
    async fn execute(&self) -> Result<serde_json::Value, OnboardError>;
}

/// Read-only view of the application config file.
pub trait AppConfigReader: Send + Sync {
    /// Subset safe to expose over RPC (no secrets).
    fn safe_subset(&self) -> serde_json::Value;

    /// Type-level validation; returns human-readable problems.
    fn validate(&self) -> Vec<String>;
}
