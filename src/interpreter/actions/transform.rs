// SPDX-License-Identifier: GPL-3.0-or-later

//! Swaps the agent onto a different prototype.
//! No body survives in the reference pack for this kind either; only
//! `mascot.c`'s function-table entry and `mascot_action::transform_target`/
//! `born_behavior` in `mascot.h`. The actual prototype lookup and swap
//! needs the prototype store, which only the interpreter loop has access
//! to, so this handler's whole job is to signal readiness — the
//! interpreter reads the current action's `transform_target`/
//! `born_behaviour` off the resolved action ref and performs the swap
//! when it sees `Step::Transform`.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::error::InterpretError;

pub struct TransformAction;

impl EmbeddedAction for TransformAction {
    fn next(&mut self, _ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        Ok(Step::Transform)
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

    #[test]
    fn always_signals_transform() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let proto = Arc::new(Prototype {
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
        });
        let mut agent = Agent::spawn(
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
        );
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = TransformAction;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Transform);
    }
}
