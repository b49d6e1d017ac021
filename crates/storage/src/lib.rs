// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! courier-storage: persisted daemon state.
//!
//! Everything here is single-writer JSON updated through atomic
//! write-then-rename, so concurrent readers always observe a complete old
//! or complete new file.

mod atomic;
mod conversations;
mod last_active;

pub use atomic::{write_atomic, StorageError};
pub use conversations::ConversationStore;
pub use last_active::{LastActiveState, LastActiveStore};
