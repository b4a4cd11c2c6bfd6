// SPDX-License-Identifier: GPL-3.0-or-later

//! Walk across an attached foreground window ("IE"), dragging it along
//! horizontally (`mascot_state_ie_walk` in `original_source/src/mascot.h`;
//! the embedded handler body itself isn't in the reference pack, so motion
//! follows [`super::walk::WalkAction`]'s equation plus the IE move call
//! `super::throw_window::ThrowWindowAction` already establishes).

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

pub struct WalkWithWindowAction;

impl EmbeddedAction for WalkWithWindowAction {
    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        if !ctx.env.ie_is_active() {
            if let Some(fall) = ctx.agent.prototype.fall_behaviour.clone() {
                ctx.agent.set_behaviour(fall);
            }
            return Ok(Step::Reenter);
        }
        let bb = ctx.env.get_active_ie().expect("ie_is_active implies get_active_ie");

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

        let _ = ctx.env.ie_move(bb.x + step as i32, bb.y);

        if new_x == target_x {
            return Ok(Step::Next);
        }
        Ok(Step::Ok)
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
    fn falls_back_to_fall_behaviour_when_ie_not_active() {
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
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = WalkWithWindowAction;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Reenter);
        assert_eq!(agent.current_behaviour.as_ref().map(|b| b.name.as_str()), Some("Fall"));
    }

    #[test]
    fn walks_toward_target_while_ie_is_active() {
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
                x: 500,
                y: 400,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: false,
            },
        );
        agent.set_local(slot::TargetX, 600.0);
        agent.set_local(slot::VelocityParam, 20.0);
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = WalkWithWindowAction;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Next);
    }
}
