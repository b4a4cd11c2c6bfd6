// SPDX-License-Identifier: GPL-3.0-or-later

//! The Action Interpreter: drives one [`Agent`] through at most
//! [`MAX_OUTER_ITERATIONS`] internal steps per tick, so every tick does
//! bounded work regardless of how the behaviour tree is shaped. Behaviour
//! selection, the common content/animation sub-steps, and embedded-action
//! dispatch all live here; the embedded kinds themselves live in
//! [`actions`].

pub mod actions;

use crate::affordance::Registry;
use crate::agent::{vars, Agent, ActionStackEntry, ResolvedActionRef};
use crate::environment::{BorderMask, Environment};
use crate::error::InterpretError;
use crate::expr::{Program, VmAgent, VmEnv};
use crate::prototype::{Action, ActionContent, ActionKind, Animation, EmbeddedKind};
use actions::{ActionCtx, Step};
use std::sync::{Arc, Mutex, Weak};

/// Hard cap on internal iterations within one `step_agent` call. Exceeding it without settling triggers
/// soft-lock recovery rather than looping further.
pub const MAX_OUTER_ITERATIONS: usize = 16;

/// Work a tick produced that the agent itself can't carry out — spawning a
/// new agent, swapping a prototype, or removing the agent all need access
/// the interpreter doesn't have (the Prototype Store, the agent table), so
/// `step_agent` reports them here for its caller to act on.
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// `clone`/`clone_and_next`: spawn a copy at
    /// `(x, y)`, optionally of a different prototype / initial behaviour.
    Clone {
        prototype_name: Option<String>,
        behaviour_name: Option<String>,
        x: i32,
        y: i32,
        looking_right: bool,
    },
    /// `transform`: swap the agent's prototype in
    /// place, preserving position and facing direction.
    Transform {
        prototype_name: Option<String>,
        behaviour_name: Option<String>,
    },
    /// `dispose`: remove the agent.
    Dispose,
}

impl VmAgent for Agent {
    fn local(&self, slot: u8) -> Option<f32> {
        self.locals.get(slot as usize).filter(|s| s.in_use).map(|s| s.value)
    }
}

/// Bridges the runtime [`Environment`] facade to the VM's narrower
/// [`VmEnv`] (which also wants a random source and a pointer snapshot).
struct EnvAdapter<'a> {
    env: &'a mut dyn Environment,
}

impl<'a> VmEnv for EnvAdapter<'a> {
    fn tick(&self) -> u64 {
        self.env.tick()
    }
    fn random(&mut self) -> f32 {
        rand::random()
    }
    fn screen_width(&self) -> i32 {
        self.env.screen_width()
    }
    fn screen_height(&self) -> i32 {
        self.env.screen_height()
    }
    fn workarea_left(&self) -> i32 {
        self.env.workarea_left()
    }
    fn workarea_right(&self) -> i32 {
        self.env.workarea_right()
    }
    fn workarea_top(&self) -> i32 {
        self.env.workarea_top()
    }
    fn workarea_bottom(&self) -> i32 {
        self.env.workarea_bottom()
    }
    fn pointer_x(&self) -> i32 {
        self.env.pointer_x()
    }
    fn pointer_y(&self) -> i32 {
        self.env.pointer_y()
    }
    fn ie_active(&self) -> bool {
        self.env.ie_is_active()
    }
}

/// Evaluate `program`, honoring its `evaluate_once` cache. A VM error is a
/// soft failure, treated as `0.0`.
fn eval_value(program: &Arc<Program>, agent: &mut Agent, env: &mut dyn Environment) -> f32 {
    if program.evaluate_once {
        if let Some(cached) = agent.eval_cache.get(&program.id) {
            return *cached;
        }
    }
    let mut adapter = EnvAdapter { env };
    let value = crate::expr::execute(program, agent, &mut adapter).unwrap_or(0.0);
    if program.evaluate_once {
        agent.eval_cache.insert(program.id, value);
    }
    value
}

fn eval_truthy(program: &Arc<Program>, agent: &mut Agent, env: &mut dyn Environment) -> bool {
    eval_value(program, agent, env) != 0.0
}

fn eval_opt_truthy(program: &Option<Arc<Program>>, agent: &mut Agent, env: &mut dyn Environment) -> bool {
    match program {
        Some(p) => eval_truthy(p, agent, env),
        None => true,
    }
}

fn current_border(agent: &Agent, env: &dyn Environment) -> BorderMask {
    env.get_border_type(agent.local(vars::slot::X) as i32, agent.local(vars::slot::Y) as i32)
}

fn apply_overwrites(agent: &mut Agent, overwrites: &[(u8, Arc<Program>)], env: &mut dyn Environment) {
    for (slot, program) in overwrites {
        let value = eval_value(program, agent, env);
        agent.set_local(*slot, value);
    }
}

fn set_deadline(agent: &mut Agent, tick: u64, env: &mut dyn Environment) {
    let duration = agent
        .current_action
        .as_ref()
        .and_then(|e| e.action_ref.duration_limit.clone());
    agent.action_deadline_tick = duration.map(|d| tick + eval_value(&d, agent, env).max(0.0) as u64);
}

/// Expand condition-behaviours transparently: a pool entry
/// whose behaviour `is_condition` contributes no frequency of its own —
/// when its guard is satisfied, its own next-behaviour list is inlined in
/// its place. Bounded to guard against a condition-behaviour cycle.
fn effective_candidates(agent: &mut Agent, env: &mut dyn Environment) -> Vec<crate::agent::BehaviourPoolEntry> {
    let mut result = Vec::new();
    let mut stack: Vec<crate::agent::BehaviourPoolEntry> = agent.behaviour_pool.clone();
    let mut guard = 0;
    while let Some(entry) = stack.pop() {
        guard += 1;
        if guard > 512 {
            break;
        }
        if entry.behaviour.is_condition {
            let gate = eval_opt_truthy(&entry.condition, agent, env)
                && eval_opt_truthy(&entry.behaviour.condition, agent, env);
            if gate {
                for next in &entry.behaviour.next_behaviours {
                    if let Some(b) = agent.prototype.behaviour_by_name(&next.behaviour_name) {
                        stack.push(crate::agent::BehaviourPoolEntry {
                            behaviour: b,
                            frequency: next.frequency,
                            condition: next.condition.clone(),
                        });
                    }
                }
            }
            continue;
        }
        result.push(entry);
    }
    result
}

/// Weighted random behaviour selection: sum the frequency of
/// every candidate whose condition is truthy and whose action's required
/// border matches current geometry, roll uniform in `[0, total)`, and walk
/// the pool deducting frequencies. Returns `false` if nothing is eligible.
fn select_behaviour(agent: &mut Agent, env: &mut dyn Environment) -> bool {
    let border = current_border(agent, env);
    let candidates = effective_candidates(agent, env);

    let mut eligible = Vec::new();
    let mut total: u64 = 0;
    for candidate in candidates {
        let required = candidate
            .behaviour
            .action
            .as_ref()
            .map(|a| a.required_border)
            .unwrap_or(BorderMask::ANY);
        if !border.contains(required) {
            continue;
        }
        if !eval_opt_truthy(&candidate.condition, agent, env) {
            continue;
        }
        total += candidate.frequency;
        eligible.push(candidate);
    }
    if total == 0 {
        return false;
    }

    let mut roll = (rand::random::<f64>() * total as f64) as u64;
    for candidate in eligible {
        if roll < candidate.frequency {
            agent.set_behaviour(candidate.behaviour);
            return true;
        }
        roll -= candidate.frequency;
    }
    false
}

fn enter_behaviour_action(agent: &mut Agent, tick: u64, env: &mut dyn Environment) -> bool {
    let Some(behaviour) = agent.current_behaviour.clone() else {
        return false;
    };
    let Some(action) = behaviour.action.clone() else {
        return false;
    };
    let entry = ActionStackEntry {
        action_ref: ResolvedActionRef {
            action,
            overwritten_locals: Vec::new(),
            duration_limit: None,
            condition: None,
        },
        content_index: 0,
    };
    if agent.push_action(entry).is_err() {
        return false;
    }
    set_deadline(agent, tick, env);
    true
}

fn finish_content(agent: &mut Agent, idx: usize, in_sequence: bool) -> Step {
    if in_sequence {
        if let Some(entry) = agent.current_action.as_mut() {
            entry.content_index = idx + 1;
        }
        Step::Reenter
    } else {
        Step::Next
    }
}

/// Advance one animation content entry by (at most) one frame. Shared by
/// the top-level "pick whichever animation's condition is true" form and
/// the sequence form (which instead runs content in declared order).
fn advance_single_animation(
    agent: &mut Agent,
    action: &Arc<Action>,
    anim: &Animation,
    idx: usize,
    tick: u64,
    env: &mut dyn Environment,
    in_sequence: bool,
) -> Result<Step, InterpretError> {
    if !eval_opt_truthy(&anim.condition, agent, env) {
        return Ok(finish_content(agent, idx, in_sequence));
    }
    if agent.animation_index != idx {
        agent.animation_index = idx;
        agent.frame_index = 0;
        agent.next_frame_tick = tick;
        return Ok(Step::Reenter);
    }
    if anim.frames.is_empty() {
        return Ok(finish_content(agent, idx, in_sequence));
    }
    if tick >= agent.next_frame_tick {
        let pose = anim.frames[agent.frame_index];
        if action.kind == ActionKind::Move {
            let x = agent.local(vars::slot::X) + pose.velocity_x;
            let y = agent.local(vars::slot::Y) + pose.velocity_y;
            agent.moved(x as i32, y as i32);
            env.subsurface_move(agent.surface, x as i32, y as i32, true, false);
        }
        agent.next_frame_tick = tick + pose.duration.max(1) as u64;
        if agent.frame_index + 1 >= anim.frames.len() {
            if action.looping {
                agent.frame_index = 0;
            } else {
                return Ok(finish_content(agent, idx, in_sequence));
            }
        } else {
            agent.frame_index += 1;
        }
    }
    Ok(Step::Ok)
}

fn step_animation(agent: &mut Agent, action: &Arc<Action>, tick: u64, env: &mut dyn Environment) -> Result<Step, InterpretError> {
    let mut chosen: Option<(usize, Animation)> = None;
    for (i, content) in action.content.iter().enumerate() {
        if let ActionContent::Animation(anim) = content {
            if eval_opt_truthy(&anim.condition, agent, env) {
                chosen = Some((i, anim.clone()));
                break;
            }
        }
    }
    let Some((idx, anim)) = chosen else {
        return Ok(Step::Next);
    };
    advance_single_animation(agent, action, &anim, idx, tick, env, false)
}

fn step_sequence(agent: &mut Agent, action: &Arc<Action>, tick: u64, env: &mut dyn Environment) -> Result<Step, InterpretError> {
    loop {
        let idx = agent.current_action.as_ref().map(|e| e.content_index).unwrap_or(0);
        let Some(content) = action.content.get(idx).cloned() else {
            return Ok(Step::Next);
        };
        match content {
            ActionContent::Animation(anim) => {
                return advance_single_animation(agent, action, &anim, idx, tick, env, true);
            }
            ActionContent::ActionRef(aref) => {
                let cond_ok = match &aref.condition {
                    Some(cond) => eval_truthy(cond, agent, env),
                    None => true,
                };
                let child = cond_ok.then(|| agent.prototype.action_by_name(&aref.action_name)).flatten();
                let Some(child_action) = child else {
                    if let Some(entry) = agent.current_action.as_mut() {
                        entry.content_index = idx + 1;
                    }
                    continue;
                };
                if let Some(entry) = agent.current_action.as_mut() {
                    entry.content_index = idx + 1;
                }
                let resolved = ResolvedActionRef {
                    action: child_action,
                    overwritten_locals: aref.overwritten_locals.clone(),
                    duration_limit: aref.duration_limit.clone(),
                    condition: None,
                };
                apply_overwrites(agent, &resolved.overwritten_locals, env);
                agent.push_action(ActionStackEntry {
                    action_ref: resolved,
                    content_index: 0,
                })?;
                set_deadline(agent, tick, env);
                return Ok(Step::Reenter);
            }
        }
    }
}

fn step_select(agent: &mut Agent, action: &Arc<Action>, tick: u64, env: &mut dyn Environment) -> Result<Step, InterpretError> {
    let refs: Vec<_> = action
        .content
        .iter()
        .filter_map(|c| match c {
            ActionContent::ActionRef(r) => Some(r.clone()),
            _ => None,
        })
        .collect();
    for aref in refs {
        let cond_ok = match &aref.condition {
            Some(cond) => eval_truthy(cond, agent, env),
            None => true,
        };
        if !cond_ok {
            continue;
        }
        let Some(child_action) = agent.prototype.action_by_name(&aref.action_name) else {
            continue;
        };
        let resolved = ResolvedActionRef {
            action: child_action,
            overwritten_locals: aref.overwritten_locals.clone(),
            duration_limit: aref.duration_limit.clone(),
            condition: None,
        };
        apply_overwrites(agent, &resolved.overwritten_locals, env);
        agent.push_action(ActionStackEntry {
            action_ref: resolved,
            content_index: 0,
        })?;
        set_deadline(agent, tick, env);
        return Ok(Step::Reenter);
    }
    Ok(Step::Next)
}

fn step_embedded(
    agent: &mut Agent,
    kind: EmbeddedKind,
    tick: u64,
    env: &mut dyn Environment,
    affordances: &Registry,
    self_handle: &Weak<Mutex<Agent>>,
) -> Result<Step, InterpretError> {
    let existing = agent.embedded_handler.take();
    let (mut handler, just_entered) = match existing {
        Some(h) => (h, false),
        None => (actions::handler_for(kind), true),
    };

    let step = {
        let mut ctx = ActionCtx {
            agent,
            tick,
            env,
            affordances,
            self_handle: self_handle.clone(),
        };
        let step = if just_entered { handler.init(&mut ctx) } else { handler.next(&mut ctx) }?;
        if step == Step::Ok {
            handler.tick(&mut ctx);
        } else {
            handler.clean(&mut ctx);
        }
        step
    };

    if step == Step::Ok {
        agent.embedded_handler = Some(handler);
    }
    Ok(step)
}

fn next_step(
    agent: &mut Agent,
    tick: u64,
    env: &mut dyn Environment,
    affordances: &Registry,
    self_handle: &Weak<Mutex<Agent>>,
) -> Result<Step, InterpretError> {
    let Some(current) = agent.current_action.clone() else {
        return Ok(Step::Next);
    };
    let action = current.action_ref.action.clone();

    if !eval_opt_truthy(&action.condition, agent, env) {
        return Ok(Step::Next);
    }
    if !eval_opt_truthy(&current.action_ref.condition, agent, env) {
        return Ok(Step::Next);
    }
    if let Some(deadline) = agent.action_deadline_tick {
        if tick >= deadline {
            return Ok(Step::Next);
        }
    }

    match action.kind {
        ActionKind::Embedded(kind) => step_embedded(agent, kind, tick, env, affordances, self_handle),
        ActionKind::Sequence => step_sequence(agent, &action, tick, env),
        ActionKind::Select => step_select(agent, &action, tick, env),
        ActionKind::Stay | ActionKind::Move | ActionKind::Animate => step_animation(agent, &action, tick, env),
    }
}

fn clone_event(agent: &Agent) -> AgentEvent {
    let action = agent.current_action.as_ref().map(|e| e.action_ref.action.clone());
    let looking_right = agent.local(vars::slot::LookingRight) != 0.0;
    let born_x = agent.local(vars::slot::BornX) as i32;
    let born_y = agent.local(vars::slot::BornY) as i32;
    let x = agent.local(vars::slot::X) as i32 + if looking_right { born_x } else { -born_x };
    let y = agent.local(vars::slot::Y) as i32 + born_y;
    AgentEvent::Clone {
        prototype_name: action.as_ref().and_then(|a| a.born_mascot.clone()),
        behaviour_name: action.as_ref().and_then(|a| a.born_behaviour.clone()),
        x,
        y,
        looking_right,
    }
}

fn transform_event(agent: &Agent) -> AgentEvent {
    let action = agent.current_action.as_ref().map(|e| e.action_ref.action.clone());
    AgentEvent::Transform {
        prototype_name: action.as_ref().and_then(|a| a.transform_target.clone()),
        behaviour_name: action.as_ref().and_then(|a| a.born_behaviour.clone()),
    }
}

/// Run one tick of the interpreter against `agent`. Bounded at
/// [`MAX_OUTER_ITERATIONS`] internal iterations; a behaviour that exceeds
/// the cap without settling has its frequency zeroed in the current pool
/// and a different behaviour is forced in on the next call.
pub fn step_agent(
    agent: &mut Agent,
    tick: u64,
    env: &mut dyn Environment,
    affordances: &Registry,
    self_handle: Weak<Mutex<Agent>>,
) -> Vec<AgentEvent> {
    let mut events = Vec::new();

    if agent.current_behaviour.is_none() && !select_behaviour(agent, env) {
        return events;
    }

    for _ in 0..MAX_OUTER_ITERATIONS {
        if agent.current_action.is_none() && !enter_behaviour_action(agent, tick, env) {
            return events;
        }

        let step = next_step(agent, tick, env, affordances, &self_handle).unwrap_or(Step::Next);

        match step {
            Step::Ok => return events,
            Step::Reenter => continue,
            Step::Next => {
                if agent.pop_action().is_err() && !select_behaviour(agent, env) {
                    return events;
                }
                continue;
            }
            Step::Escape => {
                agent.action_stack.clear();
                agent.current_action = None;
                agent.embedded_handler = None;
                agent.drag.dragged = false;
                agent.drag.capturing = false;
                if !select_behaviour(agent, env) {
                    return events;
                }
                continue;
            }
            Step::Clone | Step::CloneAndNext => {
                events.push(clone_event(agent));
                if step == Step::CloneAndNext && agent.pop_action().is_err() && !select_behaviour(agent, env) {
                    return events;
                }
                continue;
            }
            Step::Dispose => {
                events.push(AgentEvent::Dispose);
                return events;
            }
            Step::Transform => {
                events.push(transform_event(agent));
                return events;
            }
        }
    }

    // Soft-lock recovery: this behaviour drove 16 iterations
    // without settling into `ok`/`dispose`/`transform` — zero it out of the
    // pool and force a different pick for the next call.
    if let Some(current) = agent.current_behaviour.clone() {
        if let Some(entry) = agent
            .behaviour_pool
            .iter_mut()
            .find(|e| Arc::ptr_eq(&e.behaviour, &current))
        {
            entry.frequency = 0;
        }
    }
    select_behaviour(agent, env);
    events
}
