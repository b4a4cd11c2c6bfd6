// SPDX-License-Identifier: GPL-3.0-or-later

//! The expression VM: a tiny, single-threaded, stack-based
//! bytecode interpreter used to evaluate gating expressions and variable
//! initialisers against an agent's local state.
//!
//! The byte layout is kept identical to the original C engine
//! (`original_source/src/expressions.c`) for backward compatibility with
//! existing compiled packages: each instruction is `(opcode: u8, immediate:
//! u8)`, the stack holds 255 `f32` slots, and all branch displacements are
//! unsigned and forward-only, which is what caps every program at `bytecode
//! len` steps and makes termination a property rather than a convention.

mod host;
mod opcode;
mod vm;

pub use host::{HostTable, HOST_TABLE};
pub use opcode::Opcode;
pub use vm::{execute, ExecOutcome, Program, VmAgent, VmEnv, MAX_BYTECODE_LEN, MAX_STACK};
