// SPDX-License-Identifier: GPL-3.0-or-later

//! Parametric ballistic jump toward `(TargetX, TargetY)` at a fixed linear
//! speed (`VelocityParam`), grounded on `original_source/src/actions/jump.c`.
//!
//! Carries its own watchdog deadline separate from an action ref's declared
//! `duration_limit`: `jump.c` arms `action_duration = tick + 5` on entry and
//! re-arms it every tick the mascot actually moves, so a target that can
//! never be reached exactly (clamped against a border, fractional residue
//! below one pixel) still gets bumped out after 5 idle ticks rather than
//! looping forever.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

const WATCHDOG_TICKS: u64 = 5;

#[derive(Default)]
pub struct JumpAction {
    deadline: Option<u64>,
}

impl EmbeddedAction for JumpAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let tick = ctx.tick;
        let agent = &mut *ctx.agent;
        let y = agent.local(slot::Y) as i32;
        let mut target_x = agent.local(slot::TargetX) as i32;
        let mut target_y = agent.local(slot::TargetY) as i32;

        if target_x < ctx.env.workarea_left() {
            target_x = ctx.env.workarea_left();
        } else if target_x > ctx.env.workarea_right() {
            target_x = ctx.env.workarea_right();
        }
        agent.set_local(slot::TargetX, target_x as f32);

        if target_y == -1 {
            target_y = y;
        } else if target_y < ctx.env.workarea_top() {
            target_y = ctx.env.workarea_top();
        } else if target_y > ctx.env.workarea_bottom() {
            target_y = ctx.env.workarea_bottom();
        }
        agent.set_local(slot::TargetY, target_y as f32);

        self.deadline = Some(tick + WATCHDOG_TICKS);

        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        if let Some(deadline) = self.deadline {
            if ctx.tick >= deadline {
                return Ok(Step::Next);
            }
        }

        let tick = ctx.tick;
        let agent = &mut *ctx.agent;
        let mut x = agent.local(slot::X) as i32;
        let mut y = agent.local(slot::Y) as i32;
        let (orig_x, orig_y) = (x, y);
        let target_x = agent.local(slot::TargetX) as i32;
        let target_y = agent.local(slot::TargetY) as i32;
        let mut vx = agent.local(slot::VelocityX);
        let mut vy = agent.local(slot::VelocityY);
        let speed = agent.local(slot::VelocityParam);

        let looking_right = x < target_x;
        let distance_x = (target_x - x) as f32;

        if y >= ctx.env.workarea_bottom() {
            y = ctx.env.workarea_bottom();
            vy = 0.0;
        } else {
            let distance_y = (target_y - y) as f32;
            if distance_x != 0.0 {
                let norm = (distance_x * distance_x + distance_y * distance_y).sqrt();
                vx = speed * (distance_x / norm);
                vy = speed * (distance_y / norm);
                vy = if y > target_y { -vy.abs() } else { vy.abs() };

                x += vx as i32;
                y += vy as i32;
                agent.set_local(slot::VelocityX, vx);
                agent.set_local(slot::VelocityY, vy);
            }
        }

        if distance_x.abs() < vx.abs() {
            x = target_x;
            y = target_y;
        }

        if looking_right != (agent.local(slot::LookingRight) != 0.0) {
            agent.set_local(slot::LookingRight, looking_right as i32 as f32);
        }

        agent.moved(x, y);

        if x != orig_x || y != orig_y {
            self.deadline = Some(tick + WATCHDOG_TICKS);
        }

        if target_x - x == 0 {
            return Ok(Step::Next);
        }

        Ok(Step::Ok)
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        let agent = &mut *ctx.agent;
        agent.set_local(slot::VelocityParam, 0.0);
        agent.set_local(slot::TargetX, 0.0);
        agent.set_local(slot::TargetY, 0.0);
        self.deadline = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordance::Registry;
    use crate::agent::{Agent, SpawnParams};
    use crate::environment::HeadlessEnvironment;
    use crate::prototype::{Prototype, SpriteAtlas};
    use std::sync::Arc;

    fn bare_prototype() -> Arc<Prototype> {
        Arc::new(Prototype {
            id: 0,
            name: "t".into(),
            display_name: "t".into(),
            path: Default::default(),
            actions: Vec::new(),
            behaviours: Vec::new(),
            local_variables: Vec::new(),
            expressions: Vec::new(),
            root_behaviours: Vec::new(),
            atlas: SpriteAtlas::default(),
            drag_behaviour: None,
            thrown_behaviour: None,
            fall_behaviour: None,
            dismiss_action: None,
        })
    }

    #[test]
    fn jump_moves_toward_target_and_reports_next_on_arrival() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let mut agent = Agent::spawn(
            1,
            bare_prototype(),
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x: 500,
                y: 500,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        agent.set_local(slot::TargetX, 500.0);
        agent.set_local(slot::TargetY, 500.0);
        agent.set_local(slot::VelocityParam, 20.0);

        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = JumpAction::default();
        action.init(&mut ctx).unwrap();
        let step = action.next(&mut ctx).unwrap();
        assert_eq!(step, Step::Next);
    }

    #[test]
    fn jump_clamps_target_to_workarea() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let mut agent = Agent::spawn(
            1,
            bare_prototype(),
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x: 100,
                y: 100,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        agent.set_local(slot::TargetX, -500.0);
        agent.set_local(slot::TargetY, -1.0);

        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = JumpAction::default();
        action.init(&mut ctx).unwrap();
        assert_eq!(agent.local(slot::TargetX), env.workarea_left() as f32);
        assert_eq!(agent.local(slot::TargetY), 100.0);
    }

    #[test]
    fn jump_bails_out_once_watchdog_expires_without_progress() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let mut agent = Agent::spawn(
            1,
            bare_prototype(),
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x: 500,
                y: 500,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        agent.set_local(slot::TargetX, 700.0);
        agent.set_local(slot::TargetY, 500.0);
        // Zero speed: the x/y step below never moves the mascot, so only
        // the watchdog can ever escape this action.
        agent.set_local(slot::VelocityParam, 0.0);

        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = JumpAction::default();
        action.init(&mut ctx).unwrap();

        for tick in 1..WATCHDOG_TICKS {
            ctx.tick = tick;
            assert_eq!(action.next(&mut ctx).unwrap(), Step::Ok);
        }
        ctx.tick = WATCHDOG_TICKS;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Next);
    }
}
