// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! courier-daemon: the agent daemon runtime (courierd).
//!
//! Architecture:
//! - Transport: newline-delimited JSON over a Unix socket, N concurrent clients
//! - RPC server: method dispatch, subscriptions with per-connection cleanup
//! - Router: channel events -> agent sessions -> outbound intents
//! - Scheduler: cron jobs hosting the pulse
//! - Daemon controller: boot order and prioritized shutdown
//!
//! LLM adapters, channel implementations, and the agent execution engine are
//! external collaborators injected through the traits in `courier-core`.

pub mod channels;
pub mod config;
pub mod conversations;
pub mod daemon;
pub mod last_active;
pub mod logging;
pub mod protocol;
pub mod pulse;
pub mod router;
pub mod rpc;
pub mod scheduler;
pub mod shutdown;
pub mod subscriptions;
pub mod transport;

pub use channels::ChannelRegistry;
pub use config::{CliOverrides, DaemonConfig, DestinationConfig, PulseConfig};
pub use conversations::{ConversationFilter, ConversationManager};
pub use daemon::{Daemon, DaemonDeps, DaemonError, DaemonState, StopRequest};
pub use last_active::LastActiveTracker;
pub use protocol::{RpcError, RpcNotification, RpcRequest, RpcResponse};
pub use pulse::{PulseJob, PulseOutcome};
pub use router::MessageRouter;
pub use rpc::{HandlerContext, RpcServer};
pub use scheduler::{ScheduledJob, Scheduler};
pub use shutdown::{ShutdownManager, ShutdownMode};
pub use subscriptions::{SubscriptionManager, Topic};
pub use transport::{Connection, FrameDecoder, SocketServer};

/// Daemon version string reported by `daemon.status`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
