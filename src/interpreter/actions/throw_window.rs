// SPDX-License-Identifier: GPL-3.0-or-later

//! Toss the attached foreground window ("IE") along a ballistic path,
//! grounded on `original_source/src/actions/throwie.c`: start the throw on
//! init, then each tick place the window at
//! `(start_x ± InitialVelX, start_y + InitialVelY + elapsed·Gravity)`.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

/// Defaults `throwie.c` falls back to when a package never overrides them.
const DEFAULT_INITIAL_VEL_X: f32 = 32.0;
const DEFAULT_INITIAL_VEL_Y: f32 = -10.0;
const DEFAULT_GRAVITY: f32 = 0.5;

pub struct ThrowWindowAction;

impl EmbeddedAction for ThrowWindowAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        if !ctx.env.ie_is_active() {
            if let Some(fall) = ctx.agent.prototype.fall_behaviour.clone() {
                ctx.agent.set_behaviour(fall);
            }
            return Ok(Step::Reenter);
        }
        let bb = ctx.env.get_active_ie().expect("ie_is_active implies get_active_ie");

        let agent = &mut *ctx.agent;
        if agent.local(slot::InitialVelX) == 0.0 {
            agent.set_local(slot::InitialVelX, DEFAULT_INITIAL_VEL_X);
        }
        if agent.local(slot::InitialVelY) == 0.0 {
            agent.set_local(slot::InitialVelY, DEFAULT_INITIAL_VEL_Y);
        }
        if agent.local(slot::Gravity) == 0.0 {
            agent.set_local(slot::Gravity, DEFAULT_GRAVITY);
        }
        agent.set_local(slot::ModX, bb.x as f32);
        agent.set_local(slot::ModY, bb.y as f32);
        agent.set_local(slot::Gap, ctx.tick as f32);

        let looking_right = agent.local(slot::LookingRight) != 0.0;
        let vx = agent.local(slot::InitialVelX) * if looking_right { 1.0 } else { -1.0 };
        let _ = ctx.env.ie_throw(vx, agent.local(slot::InitialVelY), agent.local(slot::Gravity), ctx.tick);
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        if !ctx.env.ie_is_active() {
            return Ok(Step::Next);
        }
        let agent = &mut *ctx.agent;
        let start_x = agent.local(slot::ModX);
        let start_y = agent.local(slot::ModY);
        let start_tick = agent.local(slot::Gap) as u64;
        let elapsed = (ctx.tick.saturating_sub(start_tick)) as f32;
        let looking_right = agent.local(slot::LookingRight) != 0.0;
        let vx = agent.local(slot::InitialVelX) * if looking_right { 1.0 } else { -1.0 };
        let vy = agent.local(slot::InitialVelY);
        let gravity = agent.local(slot::Gravity);

        let new_x = (start_x + vx) as i32;
        let new_y = (start_y + vy + elapsed * gravity) as i32;

        match ctx.env.ie_move(new_x, new_y) {
            crate::environment::MoveResult::Invalid | crate::environment::MoveResult::OutOfBounds => Ok(Step::Next),
            _ => Ok(Step::Ok),
        }
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        let _ = ctx.env.ie_stop_movement();
        let agent = &mut *ctx.agent;
        agent.set_local(slot::InitialVelX, 0.0);
        agent.set_local(slot::InitialVelY, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordance::Registry;
    use crate::agent::{Agent, SpawnParams};
    use crate::environment::{BoundingBox, CollisionKind, HeadlessEnvironment};
    use crate::prototype::{Behaviour, Prototype, SpriteAtlas};
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
            fall_behaviour: Some(Arc::new(Behaviour {
                name: "Fall".into(),
                hidden: false,
                is_condition: false,
                action: None,
                condition: None,
                add_behaviours: false,
                next_behaviours: Vec::new(),
                frequency: 1,
            })),
            dismiss_action: None,
        })
    }

    #[test]
    fn init_falls_back_to_fall_behaviour_when_no_window() {
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
                x: 0,
                y: 0,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = ThrowWindowAction;
        assert_eq!(action.init(&mut ctx).unwrap(), Step::Reenter);
    }

    #[test]
    fn throw_moves_the_window_along_a_parabola() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        env.active_ie = Some(BoundingBox {
            x: 400,
            y: 400,
            width: 200,
            height: 20,
            kind: CollisionKind::Outer,
        });
        let registry = Registry::new(4);
        let mut agent = Agent::spawn(
            1,
            bare_prototype(),
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x: 400,
                y: 400,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 5,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = ThrowWindowAction;
        action.init(&mut ctx).unwrap();
        ctx.tick = 6;
        let step = action.next(&mut ctx).unwrap();
        assert_eq!(step, Step::Ok);
        assert_eq!(env.active_ie.unwrap().x, 432);
    }
}
