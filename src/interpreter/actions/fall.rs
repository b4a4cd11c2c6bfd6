// SPDX-License-Identifier: GPL-3.0-or-later

//! Free-fall under gravity, with wall bounce and floor landing
//! (`original_source/src/physics.c`, `mascot.c`'s ground-check path).

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::environment::BorderMask;
use crate::error::InterpretError;

pub struct FallAction;

impl EmbeddedAction for FallAction {
    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let agent = &mut *ctx.agent;
        let gravity = agent.local(slot::Gravity);
        let mut vy = agent.local(slot::VelocityY) + gravity;
        let mut vx = agent.local(slot::VelocityX);
        let x = agent.local(slot::X) as i32;
        let y = agent.local(slot::Y) as i32;

        let new_x = x + vx as i32;
        let new_y = y + vy as i32;

        let border = ctx.env.get_border_type(new_x, new_y);
        if border.intersects(BorderMask::WALL) {
            let drag_x = agent.local(slot::AirDragX);
            vx = -vx * drag_x;
            agent.set_local(slot::VelocityX, vx);
        }
        if border.intersects(BorderMask::FLOOR) {
            agent.set_local(slot::VelocityY, 0.0);
            agent.moved(new_x, ctx.env.workarea_bottom());
            return Ok(Step::Next);
        }

        agent.set_local(slot::VelocityY, vy);
        agent.moved(new_x, new_y);
        let _ = vy;
        Ok(Step::Ok)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, SpawnParams};
    use crate::affordance::Registry;
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
    fn falling_agent_lands_on_floor_and_reports_next() {
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
                y: 1075,
                gravity: 2.0,
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
        let mut action = FallAction;
        let step = action.next(&mut ctx).unwrap();
        assert_eq!(step, Step::Next);
    }
}
