// SPDX-License-Identifier: GPL-3.0-or-later

//! "Breed": periodically spawns a copy of the agent.
//! No body for this survives in the reference pack — only the
//! `mascot.c` function-table entry and the `BornInterval`/`BornCount`
//! local-variable slots in `mascot.h` — so the cadence is designed from
//! those two fields: `BornInterval` ticks between spawns, `BornCount`
//! remaining spawns (0 disables the limit). `Gap` is reused as the
//! tick-of-last-spawn scratch, following this crate's convention that
//! fixed slots double as per-action scratch space since only one
//! embedded action is ever current for an agent at a time.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;

pub struct CloneAction;

impl EmbeddedAction for CloneAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        ctx.agent.set_local(slot::Gap, ctx.tick as i32 as f32);
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let agent = &mut *ctx.agent;
        let interval = agent.local(slot::BornInterval).max(1.0) as u64;
        let last_spawn = agent.local(slot::Gap) as i64 as u64;
        if ctx.tick < last_spawn || ctx.tick - last_spawn < interval {
            return Ok(Step::Ok);
        }

        let remaining = agent.local(slot::BornCount) as i32;
        if remaining > 0 {
            agent.set_local(slot::BornCount, (remaining - 1) as f32);
        }
        agent.set_local(slot::Gap, ctx.tick as i32 as f32);

        Ok(if remaining == 1 {
            Step::CloneAndNext
        } else {
            Step::Clone
        })
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        ctx.agent.set_local(slot::Gap, 0.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordance::Registry;
    use crate::agent::{Agent, SpawnParams};
    use crate::environment::HeadlessEnvironment;
    use crate::prototype::Prototype;
    use std::sync::Arc;

    fn blank_prototype() -> Arc<Prototype> {
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
            atlas: crate::prototype::SpriteAtlas::default(),
            drag_behaviour: None,
            thrown_behaviour: None,
            fall_behaviour: None,
            dismiss_action: None,
        })
    }

    fn spawn(proto: Arc<Prototype>) -> Agent {
        Agent::spawn(
            1,
            proto,
            1,
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
        )
    }

    #[test]
    fn waits_out_the_interval_before_cloning() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let mut agent = spawn(blank_prototype());
        agent.set_local(slot::BornInterval, 10.0);
        agent.set_local(slot::BornCount, 0.0);
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = CloneAction;
        action.init(&mut ctx).unwrap();
        ctx.tick = 5;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Ok);
        ctx.tick = 10;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Clone);
    }

    #[test]
    fn exhausting_born_count_stops_the_loop() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let mut agent = spawn(blank_prototype());
        agent.set_local(slot::BornInterval, 1.0);
        agent.set_local(slot::BornCount, 1.0);
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = CloneAction;
        action.init(&mut ctx).unwrap();
        ctx.tick = 1;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::CloneAndNext);
    }
}
