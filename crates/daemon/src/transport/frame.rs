// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire framing: one JSON object per line.

use serde::Serialize;
use thiserror::Error;
use tracing::warn;

/// Maximum size of a single frame (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Framing errors
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Frame too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },
}

/// Encode a message as one newline-terminated JSON line.
///
/// `serde_json` never emits raw newlines inside a compact document, so the
/// trailing `\n` is an unambiguous frame boundary.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, FrameError> {
    let mut json = serde_json::to_vec(msg)?;
    if json.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: json.len(),
            max: MAX_FRAME_SIZE,
        });
    }
    json.push(b'\n');
    Ok(json)
}

/// Incremental decoder for newline-delimited JSON.
///
/// Buffers partial reads, splits on `\n`, and yields each complete line
/// that parses as a JSON object. Malformed lines and non-object JSON are
/// skipped with a warning; the trailing incomplete line is retained for
/// the next read.
#[derive(Debug, Default)]
pub struct FrameDecoder {
    buf: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed bytes in; get complete object frames out.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<serde_json::Value> {
        self.buf.extend_from_slice(bytes);

        let mut frames = Vec::new();
        while let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=pos).collect();
            let line = &line[..line.len() - 1];
            if line.is_empty() {
                continue;
            }

            match serde_json::from_slice::<serde_json::Value>(line) {
                Ok(value) if value.is_object() => frames.push(value),
                Ok(_) => {
                    warn!("discarding non-object frame");
                }
                Err(e) => {
                    warn!(error = %e, "discarding malformed frame");
                }
            }
        }

        // Runaway line with no terminator: drop it rather than buffering
        // without bound.
        if self.buf.len() > MAX_FRAME_SIZE {
            warn!(size = self.buf.len(), "discarding oversized partial frame");
            self.buf.clear();
        }

        frames
    }

    /// Bytes currently buffered awaiting a newline.
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
