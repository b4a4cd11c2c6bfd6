// SPDX-License-Identifier: GPL-3.0-or-later

//! No-motion waiting action: advertises an affordance and holds until a
//! seeking agent's scan-jump completes the rendezvous, or the hold's
//! `duration_limit` elapses.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::error::InterpretError;

pub struct InteractAction;

impl EmbeddedAction for InteractAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some(affordance) = ctx.agent.current_action_ref_affordance() else {
            return Ok(Step::Next);
        };
        ctx.agent.current_affordance = Some(affordance.clone());
        ctx.affordances.announce(
            ctx.agent.id,
            ctx.agent.surface,
            ctx.self_handle.clone(),
            Some(affordance),
        );
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some(affordance) = ctx.agent.current_affordance.clone() else {
            return Ok(Step::Next);
        };
        if !ctx.affordances.is_advertising(ctx.agent.id, &affordance) {
            // rendezvous already completed this tick by the seeker's interact()
            return Ok(Step::Next);
        }
        if let Some(deadline) = ctx.agent.action_deadline_tick {
            if ctx.tick >= deadline {
                return Ok(Step::Next);
            }
        }
        Ok(Step::Ok)
    }

    fn clean(&mut self, ctx: &mut ActionCtx) {
        ctx.affordances.announce(ctx.agent.id, ctx.agent.surface, ctx.self_handle.clone(), None);
        ctx.agent.current_affordance = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordance::Registry;
    use crate::agent::{Agent, SpawnParams};
    use crate::environment::{BorderMask, HeadlessEnvironment};
    use crate::prototype::{Action, ActionKind, EmbeddedKind, Prototype, SpriteAtlas};
    use std::sync::Arc;

    fn prototype_with_interact() -> Arc<Prototype> {
        Arc::new(Prototype {
            id: 0,
            name: "t".into(),
            display_name: "t".into(),
            path: Default::default(),
            actions: vec![Arc::new(Action {
                name: "Greet".into(),
                kind: ActionKind::Embedded(EmbeddedKind::Interact),
                content: Vec::new(),
                looping: false,
                required_border: BorderMask::ANY,
                condition: None,
                target_behaviour: None,
                select_behaviour: None,
                born_behaviour: None,
                affordance: Some("Poke".into()),
                transform_target: None,
                born_mascot: None,
                behaviour: None,
                target_look: false,
            })],
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
    fn init_advertises_the_action_affordance() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let proto = prototype_with_interact();
        let mut agent = Agent::spawn(
            1,
            proto.clone(),
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
        agent
            .push_action(crate::agent::ActionStackEntry {
                action_ref: crate::agent::ResolvedActionRef {
                    action: proto.action_by_name("Greet").unwrap(),
                    overwritten_locals: Vec::new(),
                    duration_limit: None,
                    condition: None,
                },
                content_index: 0,
            })
            .unwrap();
        let mut ctx = ActionCtx {
            agent: &mut agent,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = InteractAction;
        action.init(&mut ctx).unwrap();
        assert!(registry.is_advertising(1, "Poke"));
    }
}
