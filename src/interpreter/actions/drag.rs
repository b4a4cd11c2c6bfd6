// SPDX-License-Identifier: GPL-3.0-or-later

//! Pointer drag and its post-release resist state, grounded on
//! `original_source/src/actions/dragging.c` and `mascot.h`'s
//! `mascot_action_embedded_property_drag_resist`.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

/// Ticks of stalled drag displacement before release becomes probabilistic.
const IDLE_WINDOW: u64 = 250;
/// Chance per tick, once idle, that the drag continues rather than exits.
const CONTINUE_CHANCE: f64 = 0.1;

pub struct DragAction;

impl EmbeddedAction for DragAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let agent = &mut *ctx.agent;
        agent.set_local(slot::ModX, agent.local(slot::X));
        agent.set_local(slot::ModY, agent.local(slot::Y));
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let started = ctx.agent.drag.dragged_start_tick;
        if ctx.tick.saturating_sub(started) >= IDLE_WINDOW && rand::random::<f64>() > CONTINUE_CHANCE {
            return Ok(Step::Next);
        }
        Ok(Step::Ok)
    }

    fn tick(&mut self, ctx: &mut ActionCtx) {
        let agent = &mut *ctx.agent;
        let prev_x = agent.local(slot::ModX);
        let prev_y = agent.local(slot::ModY);
        let x = agent.local(slot::X);
        let y = agent.local(slot::Y);
        agent.set_local(slot::ModX, x);
        agent.set_local(slot::ModY, y);

        if (x - prev_x).abs() >= 5.0 || (y - prev_y).abs() >= 5.0 {
            agent.drag.dragged_start_tick = ctx.tick;
        }

        agent.set_local(slot::LookingRight, 0.0);
        let foot_x = agent.local(slot::FootX);
        let foot_dx = agent.local(slot::FootDX);
        let new_foot_dx = (foot_dx + (x - foot_x) * 0.1) * 0.8;
        agent.set_local(slot::FootDX, new_foot_dx);
        agent.set_local(slot::FootX, foot_x + new_foot_dx);
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        ctx.agent.set_local(slot::ModX, 0.0);
        ctx.agent.set_local(slot::ModY, 0.0);
    }
}

/// The brief state a mascot is left in right after a drag ends before the
/// interpreter falls through to the fall/thrown behaviour. Per
/// `mascot.h`'s comment on `mascot_action_embedded_property_drag_resist`:
/// once this action is entered, the mascot immediately escapes drag.
pub struct DragResistAction;

impl EmbeddedAction for DragResistAction {
    fn next(&mut self, _ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        Ok(Step::Escape)
    }
}
