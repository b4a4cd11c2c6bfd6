// SPDX-License-Identifier: GPL-3.0-or-later

//! Terminal action: marks the agent for removal. There is no state to
//! track and nothing to tick — the whole contract is signalling the step.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::error::InterpretError;

pub struct DisposeAction;

impl EmbeddedAction for DisposeAction {
    fn next(&mut self, _ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        Ok(Step::Dispose)
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
    fn always_signals_dispose() {
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
        let mut action = DisposeAction;
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Dispose);
    }
}
