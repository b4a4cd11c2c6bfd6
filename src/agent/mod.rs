// SPDX-License-Identifier: GPL-3.0-or-later

//! The Agent: one live mascot — local variables, action
//! stack, behaviour pool, animation cursor, and drag state — driven one
//! tick at a time by [`crate::interpreter`].

pub mod vars;

use crate::environment::{BorderMask, Environment, SurfaceId};
use crate::error::InterpretError;
use crate::prototype::{Action, ActionRef, Behaviour, Prototype};
use std::sync::Arc;

pub const MAX_ACTION_STACK: usize = 128;
pub const MAX_BEHAVIOUR_POOL: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentState {
    None,
    Stay,
    Animate,
    Move,
    Fall,
    Interact,
    Jump,
    Drag,
    DragResist,
    ScanMove,
    ScanJump,
    IeFall,
    IeWalk,
    IeThrow,
}

/// A local-variable slot: value plus an optional backing expression that
/// re-derives it. Slots 0-23 carry fixed semantics; see
/// [`vars::slot`].
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSlot {
    pub in_use: bool,
    pub value: f32,
}

/// One entry on the action stack: the action-reference being executed and
/// its local progress (current content index), so a parent `sequence` can
/// resume where it left off when a child action finishes.
#[derive(Debug, Clone)]
pub struct ActionStackEntry {
    pub action_ref: ResolvedActionRef,
    pub content_index: usize,
}

/// An [`ActionRef`] with its target resolved against a specific
/// [`Prototype`] — actions are stored by name in the prototype graph so
/// forward and cyclic references stay expressible; the interpreter
/// resolves the `Arc<Action>` once per push and carries it from there.
#[derive(Debug, Clone)]
pub struct ResolvedActionRef {
    pub action: Arc<Action>,
    pub overwritten_locals: Vec<(u8, Arc<crate::expr::Program>)>,
    pub duration_limit: Option<Arc<crate::expr::Program>>,
    pub condition: Option<Arc<crate::expr::Program>>,
}

impl ResolvedActionRef {
    pub fn resolve(proto: &Prototype, r: &ActionRef) -> Option<Self> {
        Some(ResolvedActionRef {
            action: proto.action_by_name(&r.action_name)?,
            overwritten_locals: r.overwritten_locals.clone(),
            duration_limit: r.duration_limit.clone(),
            condition: r.condition.clone(),
        })
    }
}

/// A weighted candidate in the current behaviour pool; built fresh whenever the current behaviour changes.
#[derive(Debug, Clone)]
pub struct BehaviourPoolEntry {
    pub behaviour: Arc<Behaviour>,
    pub frequency: u64,
    pub condition: Option<Arc<crate::expr::Program>>,
}

#[derive(Debug, Clone, Default)]
pub struct DragState {
    pub dragged: bool,
    pub dragged_start_tick: u64,
    pub capturing: bool,
}

#[derive(Debug, Clone, Default)]
pub struct HotspotState {
    pub active: bool,
    pub held_behaviour: Option<String>,
}

/// One live mascot. Wrapped in `Arc<Mutex<Agent>>` by its [`Environment`]
/// host; the mutex is held for the entirety of one `tick()` call.
pub struct Agent {
    pub id: u32,
    pub prototype: Arc<Prototype>,
    pub surface: SurfaceId,

    pub locals: [LocalSlot; vars::MAX_LOCALS],

    pub action_stack: Vec<ActionStackEntry>,
    pub behaviour_pool: Vec<BehaviourPoolEntry>,
    pub current_behaviour: Option<Arc<Behaviour>>,
    pub current_action: Option<ActionStackEntry>,

    pub frame_index: usize,
    pub animation_index: usize,
    pub next_frame_tick: u64,
    pub action_deadline_tick: Option<u64>,

    pub state: AgentState,
    pub drag: DragState,
    pub hotspot: HotspotState,

    pub current_affordance: Option<String>,
    pub target_agent: Option<u32>,
    pub associated_ie: bool,

    /// The embedded handler for the current action, if it is an
    /// [`crate::prototype::EmbeddedKind`]. Built on entry (not per-tick —
    /// most kinds are stateless, but scan-jump/scan-move carry a resolved
    /// target across ticks) and dropped whenever the current action changes.
    pub embedded_handler: Option<Box<dyn crate::interpreter::actions::EmbeddedAction>>,

    /// Per-action-context cache for `evaluate_once` expressions, keyed by
    /// `Program::id`; cleared whenever the current action changes.
    pub eval_cache: std::collections::HashMap<u32, f32>,
}

#[allow(clippy::too_many_arguments)]
pub struct SpawnParams {
    pub initial_behaviour: Option<String>,
    pub vx: f32,
    pub vy: f32,
    pub x: i32,
    pub y: i32,
    pub gravity: f32,
    pub drag_x: f32,
    pub drag_y: f32,
    pub looking_right: bool,
}

impl Agent {
    pub fn spawn(id: u32, prototype: Arc<Prototype>, surface: SurfaceId, params: SpawnParams) -> Self {
        let mut locals = [LocalSlot::default(); vars::MAX_LOCALS];
        let mut set = |slot: u8, value: f32| {
            locals[slot as usize] = LocalSlot { in_use: true, value };
        };
        set(vars::slot::X, params.x as f32);
        set(vars::slot::Y, params.y as f32);
        set(vars::slot::TargetX, params.x as f32);
        set(vars::slot::TargetY, params.y as f32);
        set(vars::slot::Gravity, params.gravity);
        set(vars::slot::LookingRight, params.looking_right as i32 as f32);
        set(vars::slot::AirDragX, params.drag_x);
        set(vars::slot::AirDragY, params.drag_y);
        set(vars::slot::VelocityX, params.vx);
        set(vars::slot::VelocityY, params.vy);
        set(vars::slot::BornX, params.x as f32);
        set(vars::slot::BornY, params.y as f32);
        set(vars::slot::InitialVelX, params.vx);
        set(vars::slot::InitialVelY, params.vy);
        set(vars::slot::VelocityParam, vars::DEFAULT_VELOCITY_PARAM);

        let mut agent = Agent {
            id,
            prototype,
            surface,
            locals,
            action_stack: Vec::new(),
            behaviour_pool: Vec::new(),
            current_behaviour: None,
            current_action: None,
            frame_index: 0,
            animation_index: 0,
            next_frame_tick: 0,
            action_deadline_tick: None,
            state: AgentState::None,
            drag: DragState::default(),
            hotspot: HotspotState::default(),
            current_affordance: None,
            target_agent: None,
            associated_ie: false,
            embedded_handler: None,
            eval_cache: std::collections::HashMap::new(),
        };

        let initial = params
            .initial_behaviour
            .as_deref()
            .and_then(|name| agent.prototype.behaviour_by_name(name));
        if let Some(behaviour) = initial {
            agent.set_behaviour(behaviour);
        } else {
            agent.rebuild_pool_from_root();
        }
        agent
    }

    pub fn local(&self, slot: u8) -> f32 {
        self.locals
            .get(slot as usize)
            .filter(|s| s.in_use)
            .map(|s| s.value)
            .unwrap_or(0.0)
    }

    pub fn set_local(&mut self, slot: u8, value: f32) {
        if let Some(s) = self.locals.get_mut(slot as usize) {
            s.in_use = true;
            s.value = value;
        }
    }

    fn rebuild_pool_from_root(&mut self) {
        self.behaviour_pool = self
            .prototype
            .root_behaviours
            .iter()
            .filter_map(|r| {
                Some(BehaviourPoolEntry {
                    behaviour: self.prototype.behaviour_by_name(&r.behaviour_name)?,
                    frequency: r.frequency,
                    condition: r.condition.clone(),
                })
            })
            .collect();
    }

    /// Clean the current action, clear the action stack, and rebuild the
    /// behaviour pool from `b`'s next-behaviour list.
    pub fn set_behaviour(&mut self, b: Arc<Behaviour>) {
        self.action_stack.clear();
        self.current_action = None;
        self.frame_index = 0;
        self.animation_index = 0;
        // Dropped without calling `clean` — this path has no Environment/
        // Registry access. A handler mid-affordance-advertisement (interact,
        // scan-jump) left behind this way self-heals on its next announce(),
        // but won't un-announce immediately; see DESIGN.md.
        self.embedded_handler = None;
        self.eval_cache.clear();
        if b.add_behaviours {
            for next in &b.next_behaviours {
                if let Some(behaviour) = self.prototype.behaviour_by_name(&next.behaviour_name) {
                    self.behaviour_pool.push(BehaviourPoolEntry {
                        behaviour,
                        frequency: next.frequency,
                        condition: next.condition.clone(),
                    });
                }
            }
        } else {
            self.behaviour_pool = b
                .next_behaviours
                .iter()
                .filter_map(|next| {
                    Some(BehaviourPoolEntry {
                        behaviour: self.prototype.behaviour_by_name(&next.behaviour_name)?,
                        frequency: next.frequency,
                        condition: next.condition.clone(),
                    })
                })
                .collect();
        }
        self.current_behaviour = Some(b);
    }

    /// Transition to drag behaviour if dragging is permitted by the current
    /// state; hands pointer capture to this agent's surface.
    pub fn drag_start(&mut self, tick: u64) -> bool {
        if self.drag.capturing {
            return false;
        }
        let Some(drag_behaviour) = self.prototype.drag_behaviour.clone() else {
            return false;
        };
        self.drag.dragged = true;
        self.drag.dragged_start_tick = tick;
        self.drag.capturing = true;
        self.set_behaviour(drag_behaviour);
        self.state = AgentState::Drag;
        true
    }

    /// Release the drag, transitioning to thrown (if `thrown`) or fall.
    pub fn drag_end(&mut self, thrown: bool) {
        self.drag.dragged = false;
        self.drag.capturing = false;
        let next = if thrown {
            self.prototype.thrown_behaviour.clone()
        } else {
            self.prototype.fall_behaviour.clone()
        }
        .or_else(|| self.prototype.fall_behaviour.clone());
        if let Some(b) = next {
            self.set_behaviour(b);
            self.state = if thrown { AgentState::IeThrow } else { AgentState::Fall };
        }
    }

    /// Hit-test `(x, y)` in mascot-local coordinates against the current
    /// animation's hotspots; latch the matching behaviour on hit.
    pub fn hotspot_click(&mut self, x: i32, y: i32, button: crate::prototype::HotspotButton) -> bool {
        let Some(action) = self.current_action_ref() else {
            return false;
        };
        for content in &action.content {
            if let crate::prototype::ActionContent::Animation(anim) = content {
                for h in &anim.hotspots {
                    if h.button == button && h.contains(x, y) {
                        self.hotspot.active = true;
                        self.hotspot.held_behaviour = Some(h.behaviour.clone());
                        if let Some(b) = self.prototype.behaviour_by_name(&h.behaviour) {
                            self.set_behaviour(b);
                        }
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn hotspot_hold(&mut self) -> bool {
        self.hotspot.active
    }

    fn current_action_ref(&self) -> Option<Arc<Action>> {
        self.current_action.as_ref().map(|e| e.action_ref.action.clone())
    }

    /// The affordance name the current action advertises, if any; used by
    /// the interact/scan-jump embedded kinds.
    pub fn current_action_ref_affordance(&self) -> Option<String> {
        self.current_action_ref().and_then(|a| a.affordance.clone())
    }

    /// The behaviour the current action switches the seeker into on a
    /// successful `interact` (`Action::behaviour`).
    pub fn current_action_ref_behaviour(&self) -> Option<String> {
        self.current_action_ref().and_then(|a| a.behaviour.clone())
    }

    /// The behaviour the current action switches the interact target into
    /// (`Action::target_behaviour`).
    pub fn current_action_ref_target_behaviour(&self) -> Option<String> {
        self.current_action_ref().and_then(|a| a.target_behaviour.clone())
    }

    /// Whether the current action flips the target's `LookingRight` on
    /// interact (`Action::target_look`).
    pub fn current_action_ref_target_look(&self) -> bool {
        self.current_action_ref().map(|a| a.target_look).unwrap_or(false)
    }

    /// Update position-derived locals after an external move (pointer drag
    /// or environment migration).
    pub fn moved(&mut self, x: i32, y: i32) {
        self.set_local(vars::slot::X, x as f32);
        self.set_local(vars::slot::Y, y as f32);
    }

    pub fn required_border(&self) -> BorderMask {
        self.current_action_ref()
            .map(|a| a.required_border)
            .unwrap_or(BorderMask::ANY)
    }

    pub fn push_action(&mut self, entry: ActionStackEntry) -> Result<(), InterpretError> {
        if self.action_stack.len() >= MAX_ACTION_STACK {
            return Err(InterpretError::ActionStackOverflow);
        }
        if let Some(current) = self.current_action.take() {
            self.action_stack.push(current);
        }
        self.current_action = Some(entry);
        self.embedded_handler = None;
        self.eval_cache.clear();
        Ok(())
    }

    pub fn pop_action(&mut self) -> Result<(), InterpretError> {
        self.current_action = self.action_stack.pop();
        self.embedded_handler = None;
        self.eval_cache.clear();
        if self.current_action.is_none() {
            return Err(InterpretError::ActionStackEmpty);
        }
        Ok(())
    }

    /// Run one tick of the Action Interpreter against this agent.
    /// `affordances`/`self_handle` are only consulted by the
    /// interact/scan-jump/scan-move embedded kinds; callers that never
    /// spawn a prototype using those kinds may pass an empty registry and
    /// `Weak::new()`.
    pub fn tick(
        &mut self,
        tick_counter: u64,
        env: &mut dyn Environment,
        affordances: &crate::affordance::Registry,
        self_handle: std::sync::Weak<std::sync::Mutex<Agent>>,
    ) -> Vec<crate::interpreter::AgentEvent> {
        crate::interpreter::step_agent(self, tick_counter, env, affordances, self_handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prototype::{Behaviour, Prototype, SpriteAtlas};

    fn bare_prototype() -> Prototype {
        Prototype {
            id: 1,
            name: "Test".into(),
            display_name: "Test".into(),
            path: std::path::PathBuf::new(),
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
        }
    }

    #[test]
    fn spawn_seeds_position_and_velocity_locals() {
        let proto = Arc::new(bare_prototype());
        let agent = Agent::spawn(
            1,
            proto,
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 1.0,
                vy: -2.0,
                x: 100,
                y: 200,
                gravity: 1.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        assert_eq!(agent.local(vars::slot::X), 100.0);
        assert_eq!(agent.local(vars::slot::Y), 200.0);
        assert_eq!(agent.local(vars::slot::VelocityX), 1.0);
    }

    #[test]
    fn drag_end_without_thrown_falls_back_to_fall_behaviour() {
        let proto = Arc::new(bare_prototype());
        let mut agent = Agent::spawn(
            1,
            proto,
            0,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x: 0,
                y: 0,
                gravity: 1.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        );
        agent.drag.capturing = true;
        agent.drag_end(false);
        assert_eq!(agent.state, AgentState::Fall);
        assert!(!agent.drag.capturing);
    }
}
