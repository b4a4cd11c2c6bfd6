// SPDX-License-Identifier: GPL-3.0-or-later

//! `shimejid`: a desktop mascot companion runtime. Character packages are
//! parsed into [`prototype::Prototype`]s and published to a
//! [`prototype::store::Store`]; each live mascot is an [`agent::Agent`]
//! driven one tick at a time by the Action Interpreter ([`interpreter`])
//! against an [`environment::Environment`] host. [`ipc`] exposes the daemon
//! to clients over a Unix socket.

pub mod affordance;
pub mod agent;
pub mod config;
pub mod environment;
pub mod error;
pub mod expr;
pub mod interpreter;
pub mod ipc;
pub mod prototype;
