// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local transport: newline-delimited JSON over a Unix domain socket.
//!
//! Every message is one JSON object serialized without raw newlines,
//! terminated by `\n`. Framing errors never terminate a connection; a write
//! failure on one connection never affects the others.

mod frame;
mod server;

pub use frame::{encode, FrameDecoder, FrameError, MAX_FRAME_SIZE};
pub use server::{Connection, ConnectionMetadata, FrameHandler, SocketServer, TransportError};
