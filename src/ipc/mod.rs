// SPDX-License-Identifier: GPL-3.0-or-later

//! The IPC surface: wire framing/payload codec, the opcode
//! tables, and the calloop-driven connection loop that dispatches requests
//! against a [`server::Runtime`].

pub mod codec;
pub mod opcodes;
pub mod server;

pub use server::{Runtime, Shared};
