// SPDX-License-Identifier: GPL-3.0-or-later

//! Diagonal approach toward an affordance-advertising target, completing
//! with an atomic `interact` on arrival — grounded on
//! `original_source/src/actions/scanjump.c`.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;
use std::sync::{Mutex, Weak};

#[derive(Default)]
pub struct ScanJumpAction {
    target: Option<(u32, Weak<Mutex<crate::agent::Agent>>)>,
}

impl EmbeddedAction for ScanJumpAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some(affordance) = ctx.agent.current_action_ref_affordance() else {
            return Ok(Step::Next);
        };
        let Some(target) = ctx.affordances.find_target(ctx.agent.id, &affordance) else {
            return Ok(Step::Next);
        };
        self.target = Some(target);
        ctx.agent.set_local(slot::VelocityParam, 20.0);
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some((target_id, target_handle)) = self.target.clone() else {
            return Ok(Step::Next);
        };
        let Some(target_arc) = target_handle.upgrade() else {
            return Ok(Step::Next);
        };
        let (target_x, target_y, target_vx, target_vy) = {
            let target = target_arc.lock().expect("agent mutex poisoned");
            (
                target.local(slot::X),
                target.local(slot::Y),
                target.local(slot::VelocityX),
                target.local(slot::VelocityY),
            )
        };

        let agent = &mut *ctx.agent;
        let x = agent.local(slot::X);
        let y = agent.local(slot::Y);
        let distance = ((target_x - x).powi(2) + (target_y - y).powi(2)).sqrt();
        let target_speed = (target_vx * target_vx + target_vy * target_vy).sqrt() * 2.0;
        let my_speed = (agent.local(slot::VelocityX).powi(2) + agent.local(slot::VelocityY).powi(2)).sqrt() * 2.0;

        if distance <= target_speed.max(my_speed) {
            let Some(affordance) = agent.current_action_ref_affordance() else {
                return Ok(Step::Next);
            };
            let my_behaviour = agent.current_action_ref_behaviour();
            let target_behaviour = agent.current_action_ref_target_behaviour();
            let target_look = agent.current_action_ref_target_look();
            let ok = crate::affordance::interact(
                ctx.affordances,
                agent,
                target_id,
                &target_handle,
                &affordance,
                my_behaviour.as_deref(),
                target_behaviour.as_deref(),
                target_look,
            );
            self.target = None;
            return Ok(if ok { Step::Reenter } else { Step::Next });
        }

        let norm = distance.max(1.0);
        let speed = agent.local(slot::VelocityParam);
        let vx = speed * (target_x - x) / norm;
        let vy = speed * (target_y - y) / norm;
        agent.set_local(slot::VelocityX, vx);
        agent.set_local(slot::VelocityY, vy);
        agent.moved((x + vx) as i32, (y + vy) as i32);
        Ok(Step::Ok)
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        self.target = None;
        ctx.agent.set_local(slot::VelocityParam, 0.0);
    }
}
