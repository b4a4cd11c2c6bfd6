// SPDX-License-Identifier: GPL-3.0-or-later

//! Floor-level approach toward an affordance-advertising target: no
//! interact on arrival (that is scan-jump's job), just positioning.
//! Like scan-jump, `scanmove_action_*` has no surviving body in the
//! reference pack (only its `mascot.c` table entry); motion mirrors
//! [`super::walk::WalkAction`] steered at the target's current position
//! instead of a fixed `TargetX`.

use super::{ActionCtx, EmbeddedAction, Step};
use crate::agent::vars::slot;
use crate::error::InterpretError;
use std::sync::{Mutex, Weak};

#[derive(Default)]
pub struct ScanMoveAction {
    target: Option<(u32, Weak<Mutex<crate::agent::Agent>>)>,
}

impl EmbeddedAction for ScanMoveAction {
    fn init(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some(affordance) = ctx.agent.current_action_ref_affordance() else {
            return Ok(Step::Next);
        };
        let Some(target) = ctx.affordances.find_target(ctx.agent.id, &affordance) else {
            return Ok(Step::Next);
        };
        self.target = Some(target);
        Ok(Step::Ok)
    }

    fn next(&mut self, ctx: &mut ActionCtx) -> Result<Step, InterpretError> {
        let Some((target_id, target_handle)) = self.target.clone() else {
            return Ok(Step::Next);
        };
        let Some(affordance) = ctx.agent.current_action_ref_affordance() else {
            return Ok(Step::Next);
        };
        if !ctx.affordances.is_advertising(target_id, &affordance) {
            self.target = None;
            return Ok(Step::Next);
        }
        let Some(target_arc) = target_handle.upgrade() else {
            self.target = None;
            return Ok(Step::Next);
        };
        let target_x = target_arc.lock().expect("agent mutex poisoned").local(slot::X);

        let agent = &mut *ctx.agent;
        let x = agent.local(slot::X);
        let y = agent.local(slot::Y) as i32;
        let speed = agent.local(slot::VelocityParam).max(1.0);
        let distance_x = target_x - x;
        if distance_x.abs() < speed {
            return Ok(Step::Next);
        }

        let looking_right = distance_x > 0.0;
        if looking_right != (agent.local(slot::LookingRight) != 0.0) {
            agent.set_local(slot::LookingRight, looking_right as i32 as f32);
        }
        let new_x = x + speed.copysign(distance_x);
        agent.moved(new_x as i32, y);
        Ok(Step::Ok)
    }

    fn clean(&mut self, _ctx: &mut ActionCtx) {
        self.target = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::affordance::Registry;
    use crate::agent::{Agent, SpawnParams};
    use crate::environment::{BorderMask, HeadlessEnvironment};
    use crate::prototype::{Action, ActionKind, EmbeddedKind, Prototype, SpriteAtlas};
    use std::sync::{Arc, Mutex as StdMutex};

    fn prototype_with_scanmove() -> Arc<Prototype> {
        Arc::new(Prototype {
            id: 0,
            name: "t".into(),
            display_name: "t".into(),
            path: Default::default(),
            actions: vec![Arc::new(Action {
                name: "Approach".into(),
                kind: ActionKind::Embedded(EmbeddedKind::ScanMove),
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

    fn agent_with_current_action(id: u32, proto: Arc<Prototype>, x: i32, y: i32) -> Agent {
        let mut agent = Agent::spawn(
            id,
            proto.clone(),
            id,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x,
                y,
                gravity: 0.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        agent
            .push_action(crate::agent::ActionStackEntry {
                action_ref: crate::agent::ResolvedActionRef {
                    action: proto.action_by_name("Approach").unwrap(),
                    overwritten_locals: Vec::new(),
                    duration_limit: None,
                    condition: None,
                },
                content_index: 0,
            })
            .unwrap();
        agent
    }

    #[test]
    fn aborts_to_next_when_target_affordance_disappears() {
        let mut env = HeadlessEnvironment::new(1920, 1080);
        let registry = Registry::new(4);
        let proto = prototype_with_scanmove();
        let target = Arc::new(StdMutex::new(agent_with_current_action(2, proto.clone(), 600, 500)));
        registry.announce(2, 2, Arc::downgrade(&target), Some("Poke".into()));

        let mut seeker = agent_with_current_action(1, proto, 500, 500);
        let mut ctx = ActionCtx {
            agent: &mut seeker,
            tick: 0,
            env: &mut env,
            affordances: &registry,
            self_handle: std::sync::Weak::new(),
        };
        let mut action = ScanMoveAction::default();
        action.init(&mut ctx).unwrap();

        registry.announce(2, 2, Arc::downgrade(&target), None);
        assert_eq!(action.next(&mut ctx).unwrap(), Step::Next);
    }
}
