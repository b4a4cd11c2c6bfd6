// SPDX-License-Identifier: GPL-3.0-or-later

//! Ground-level walk toward `(TargetX, Y)` at `VelocityParam` linear speed —
//! the floor-bound counterpart to [`super::jump::JumpAction`]'s diagonal
//! ballistic; no body survives in the reference pack (only the
//! function-table entry in `original_source/src/mascot.c` does), so the
//! motion equation mirrors jump's horizontal component.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

pub struct WalkAction;

impl EmbeddedAction for WalkAction {
    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let agent = &mut *ctx.agent;
        let x = agent.local(slot::X) as i32;
        let y = agent.local(slot::Y) as i32;
        let target_x = agent.local(slot::TargetX) as i32;
        let speed = agent.local(slot::VelocityParam).max(1.0);

        let distance_x = target_x - x;
        if distance_x == 0 {
            return Ok(Step::Next);
        }

        let looking_right = distance_x > 0;
        if looking_right != (agent.local(slot::LookingRight) != 0.0) {
            agent.set_local(slot::LookingRight, looking_right as i32 as f32);
        }

        let step = speed.min(distance_x.unsigned_abs() as f32) * distance_x.signum() as f32;
        let new_x = x + step as i32;
        agent.moved(new_x, y);

        if new_x == target_x {
            return Ok(Step::Next);
        }
        Ok(Step::Ok)
    }
}
