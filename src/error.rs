// SPDX-License-Identifier: GPL-3.0-or-later

//! Error types surfaced at each module boundary.
//!
//! Domain errors are modeled with `thiserror` enums so callers can match on
//! the specific failure kind; the binary's top-level `main` wraps these in
//! `anyhow::Result` with added context.

use thiserror::Error;

/// Errors that can occur while loading a character package into the Store.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LoadError {
    #[error("manifest.json is missing")]
    ManifestMissing,
    #[error("manifest.json is invalid: {0}")]
    ManifestInvalid(String),
    #[error("prototype version {found} is older than the minimum supported version {min}")]
    VersionTooOld { found: String, min: String },
    #[error("prototype version {found} is newer than the current supported version {current}")]
    VersionTooNew { found: String, current: String },
    #[error("programs.json is missing")]
    ProgramsMissing,
    #[error("programs.json is invalid: {0}")]
    ProgramsInvalid(String),
    #[error("actions.json is missing")]
    ActionsMissing,
    #[error("actions.json is invalid: {0}")]
    ActionsInvalid(String),
    #[error("behaviours.json is missing")]
    BehavioursMissing,
    #[error("behaviours.json is invalid: {0}")]
    BehavioursInvalid(String),
    #[error("failed to load sprite assets: {0}")]
    AssetsFailed(String),
    #[error("a prototype with this name is already loaded")]
    AlreadyLoaded,
    #[error("out of memory while loading prototype")]
    Oom,
}

/// Soft and hard failures from evaluating expressions / gating conditions.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VmError {
    #[error("stack underflow")]
    StackUnderflow,
    #[error("stack overflow")]
    StackOverflow,
    #[error("local variable index out of range")]
    LocalOutOfRange,
    #[error("global getter index out of range")]
    GlobalOutOfRange,
    #[error("host function index out of range")]
    FunctionOutOfRange,
    #[error("jump target past end of bytecode")]
    JumpOutOfRange,
    #[error("program aborted with ERR opcode")]
    ExplicitErr,
    #[error("host function reported failure")]
    HostFailure,
    #[error("bytecode ended without a RET instruction")]
    NoReturn,
}

/// Outcomes of one interpreter step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpretError {
    /// A VM error occurred evaluating a gating expression (soft: condition not met).
    Vm(VmError),
    /// The action's required border type did not match current geometry (soft).
    BorderMismatch,
    /// The per-agent action stack is full (soft: treated as `next`).
    ActionStackOverflow,
    /// Attempted to pop an empty action stack (soft).
    ActionStackEmpty,
    /// A transient, self-recovering condition (soft).
    Transient,
    /// Malformed action parameters (hard failure, surfaced to caller).
    ParamsInvalid,
}

/// Result of attempting to move a surface through the Environment facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveError {
    Clamped,
    EnvironmentChanged,
    OutOfBounds,
    Invalid,
}

/// Errors reported over the IPC protocol (carried in opcode `0x31` replies).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IpcError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),
    #[error("payload malformed: {0}")]
    PayloadMalformed(String),
    #[error("unknown mascot id {0}")]
    UnknownMascotId(u32),
    #[error("unknown prototype {0}")]
    UnknownPrototype(String),
    #[error("summon failed: no such environment")]
    SummonFailureNoEnv,
    #[error("summon failed: no such prototype")]
    SummonFailureNoProto,
    #[error("behaviour failed: no such behaviour")]
    BehaviourFailureNoBehaviour,
    #[error("reload failed: package failed to load")]
    ReloadFailureLoadFailed,
    #[error("reload failed: prototype is config-protected")]
    ReloadFailureConfigProtected,
    #[error("reload failed: out of memory")]
    ReloadFailureOom,
}

impl IpcError {
    /// Dotted reason string as carried in `request-result`/`reload-result` payloads.
    pub fn reason(&self) -> &'static str {
        match self {
            IpcError::UnknownOpcode(_) => "protocol.unknown_opcode",
            IpcError::PayloadMalformed(_) => "protocol.payload_malformed",
            IpcError::UnknownMascotId(_) => "mascot.unknown_id",
            IpcError::UnknownPrototype(_) => "prototype.unknown",
            IpcError::SummonFailureNoEnv => "summon.failure.no_env",
            IpcError::SummonFailureNoProto => "summon.failure.no_proto",
            IpcError::BehaviourFailureNoBehaviour => "behaviour.failure.no_behaviour",
            IpcError::ReloadFailureLoadFailed => "reload.failure.load_failed",
            IpcError::ReloadFailureConfigProtected => "reload.failure.config_protected",
            IpcError::ReloadFailureOom => "reload.failure.oom",
        }
    }
}

/// Errors from parsing or applying the `key=value` configuration file.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown configuration key {0:?}")]
    UnknownKey(String),
    #[error("invalid value {value:?} for key {key:?}")]
    InvalidValue { key: String, value: String },
    #[error("value {value} for key {key:?} is outside its allowed range")]
    OutOfRange { key: String, value: String },
}
