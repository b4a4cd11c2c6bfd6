// SPDX-License-Identifier: GPL-3.0-or-later

//! Embedded action kinds: each implements a shared
//! `init`/`next`/`tick`/`clean` contract rather than being dispatched
//! through a function-pointer table, so adding a new kind only means adding
//! a new type that implements [`EmbeddedAction`].

mod clone_action;
mod dispose;
mod drag;
mod fall;
mod interact;
mod jump;
mod scan_jump;
mod scan_move;
mod throw_window;
mod transform;
mod walk;
mod walk_with_window;

pub use clone_action::CloneAction;
pub use dispose::DisposeAction;
pub use drag::{DragAction, DragResistAction};
pub use fall::FallAction;
pub use interact::InteractAction;
pub use jump::JumpAction;
pub use scan_jump::ScanJumpAction;
pub use scan_move::ScanMoveAction;
pub use throw_window::ThrowWindowAction;
pub use transform::TransformAction;
pub use walk::WalkAction;
pub use walk_with_window::WalkWithWindowAction;

use crate::agent::Agent;
use crate::environment::Environment;
use crate::error::InterpretError;
use crate::prototype::EmbeddedKind;
use std::sync::{Mutex, Weak};

/// Outcome of one embedded action step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Ok,
    Next,
    Clone,
    CloneAndNext,
    Dispose,
    Transform,
    Reenter,
    Escape,
}

/// Per-tick context handed to an embedded action: the owning agent, tick
/// counter, environment, and affordance registry (only scan-jump/interact
/// touch the registry).
pub struct ActionCtx<'a> {
    pub agent: &'a mut Agent,
    pub tick: u64,
    pub env: &'a mut dyn Environment,
    pub affordances: &'a crate::affordance::Registry,
    /// A weak handle to `agent` itself, so kinds that advertise an
    /// affordance (scan-jump, interact) can register something the
    /// registry can hand back out to a seeking agent.
    pub self_handle: Weak<Mutex<Agent>>,
}

/// The init/next/tick/clean contract every embedded action kind implements.
/// `init` runs once when the action becomes current; `next` runs every tick
/// and returns the step outcome; `tick` runs only after `next` returns `Ok`
/// (a "this tick also advanced the pose" hook some kinds don't need);
/// `clean` runs once when the action is replaced.
pub trait EmbeddedAction: Send {
    fn init(&mut self, _ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        Ok(Step::Ok)
    }
    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError>;
    fn tick(&mut self, _ctx: &mut ActionCtx) {}
    fn clean(&mut self, _ctx: &mut ActionCtx) {}
}

/// Construct the handler for one embedded kind. Each call gets a fresh,
/// stateless handler; per-agent state the handler needs (e.g. drag's
/// pointer-delta history) lives on the `Agent`'s local variables instead,
/// matching the original's "locals are the only per-action scratch space"
/// design.
pub fn handler_for(kind: EmbeddedKind) -> Box<dyn EmbeddedAction> {
    match kind {
        EmbeddedKind::Fall => Box::new(FallAction),
        EmbeddedKind::Jump => Box::new(JumpAction),
        EmbeddedKind::Walk => Box::new(WalkAction),
        EmbeddedKind::Drag => Box::new(DragAction),
        EmbeddedKind::DragResist => Box::new(DragResistAction),
        EmbeddedKind::Clone => Box::new(CloneAction),
        EmbeddedKind::Transform => Box::new(TransformAction),
        EmbeddedKind::Dispose => Box::new(DisposeAction),
        EmbeddedKind::ScanMove => Box::new(ScanMoveAction::default()),
        EmbeddedKind::ScanJump => Box::new(ScanJumpAction::default()),
        EmbeddedKind::Interact => Box::new(InteractAction),
        EmbeddedKind::WalkWithWindow => Box::new(WalkWithWindowAction),
        EmbeddedKind::ThrowWindow => Box::new(ThrowWindowAction),
    }
}
