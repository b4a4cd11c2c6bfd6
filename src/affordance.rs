// SPDX-License-Identifier: GPL-3.0-or-later

//! The Affordance Registry: a fixed-capacity slot table agents
//! advertise capabilities into (`announce`) and scan for candidates through
//! (`find_target`), with an atomic two-agent rendezvous (`interact`).
//!
//! Grounded the same way as [`crate::prototype::store::Store`]: a single
//! mutex around the slot table, agents held by weak handle so the registry
//! never keeps an agent alive past its owner's lifetime.

use crate::agent::Agent;
use crate::prototype::HotspotButton;
use std::sync::{Mutex, Weak};

/// One advertised capability slot.
struct Entry {
    agent_id: u32,
    surface: crate::environment::SurfaceId,
    affordance: String,
    handle: Weak<Mutex<Agent>>,
}

struct Inner {
    slots: Vec<Entry>,
    capacity: usize,
}

/// Mutex-protected, fixed-capacity advertisement table.
pub struct Registry {
    inner: Mutex<Inner>,
}

impl Registry {
    pub fn new(capacity: usize) -> Self {
        Registry {
            inner: Mutex::new(Inner {
                slots: Vec::with_capacity(capacity),
                capacity,
            }),
        }
    }

    /// Place or remove `agent_id`'s advertisement. `affordance = None` clears it.
    pub fn announce(
        &self,
        agent_id: u32,
        surface: crate::environment::SurfaceId,
        handle: Weak<Mutex<Agent>>,
        affordance: Option<String>,
    ) {
        let mut inner = self.inner.lock().expect("affordance registry poisoned");
        inner.slots.retain(|e| e.agent_id != agent_id);
        if let Some(affordance) = affordance {
            if inner.slots.len() >= inner.capacity {
                return;
            }
            inner.slots.push(Entry {
                agent_id,
                surface,
                affordance,
                handle,
            });
        }
    }

    /// Scan for a candidate advertising `affordance` (case-insensitive),
    /// excluding `seeking_agent_id`. Ties are broken by a uniform random
    /// draw among all matches.
    pub fn find_target(&self, seeking_agent_id: u32, affordance: &str) -> Option<(u32, Weak<Mutex<Agent>>)> {
        let inner = self.inner.lock().expect("affordance registry poisoned");
        let candidates: Vec<&Entry> = inner
            .slots
            .iter()
            .filter(|e| e.agent_id != seeking_agent_id && e.affordance.eq_ignore_ascii_case(affordance))
            .collect();
        if candidates.is_empty() {
            return None;
        }
        let pick = rand::random::<usize>() % candidates.len();
        let chosen = candidates[pick];
        Some((chosen.agent_id, chosen.handle.clone()))
    }

    /// True if `agent_id` is still advertising exactly `affordance`.
    pub fn is_advertising(&self, agent_id: u32, affordance: &str) -> bool {
        let inner = self.inner.lock().expect("affordance registry poisoned");
        inner
            .slots
            .iter()
            .any(|e| e.agent_id == agent_id && e.affordance.eq_ignore_ascii_case(affordance))
    }

    fn clear(&self, agent_id: u32) {
        let mut inner = self.inner.lock().expect("affordance registry poisoned");
        inner.slots.retain(|e| e.agent_id != agent_id);
    }
}

/// Complete the rendezvous between `seeker` and the agent behind `target`:
/// copy the seeker's position onto the target, invert the target's
/// `LookingRight` if `target_look` is set and directions currently match,
/// switch each to its named behaviour, and clear both advertisements.
///
/// Returns `false` if the target handle no longer resolves (its owner has
/// disposed it since `find_target` ran) — the caller should treat that the
/// same as "no target found".
pub fn interact(
    registry: &Registry,
    seeker: &mut Agent,
    target_id: u32,
    target: &Weak<Mutex<Agent>>,
    affordance: &str,
    my_behaviour: Option<&str>,
    target_behaviour: Option<&str>,
    target_look: bool,
) -> bool {
    let Some(target) = target.upgrade() else {
        registry.clear(seeker.id);
        return false;
    };
    let mut target = target.lock().expect("agent mutex poisoned");

    let seeker_x = seeker.local(crate::agent::vars::slot::X);
    let seeker_y = seeker.local(crate::agent::vars::slot::Y);
    target.set_local(crate::agent::vars::slot::X, seeker_x);
    target.set_local(crate::agent::vars::slot::Y, seeker_y);

    if target_look {
        let seeker_right = seeker.local(crate::agent::vars::slot::LookingRight) != 0.0;
        let target_right = target.local(crate::agent::vars::slot::LookingRight) != 0.0;
        if seeker_right == target_right {
            target.set_local(crate::agent::vars::slot::LookingRight, (!target_right) as i32 as f32);
        }
    }

    if let Some(name) = my_behaviour {
        if let Some(b) = seeker.prototype.behaviour_by_name(name) {
            seeker.set_behaviour(b);
        }
    }
    if let Some(name) = target_behaviour {
        if let Some(b) = target.prototype.behaviour_by_name(name) {
            target.set_behaviour(b);
        }
    }

    seeker.current_affordance = None;
    target.current_affordance = None;
    registry.clear(seeker.id);
    registry.clear(target_id);
    let _ = affordance;
    true
}

/// Hit-test helper shared by the Pointer Arbiter's hotspot dispatch and the
/// IPC selection path; lives here rather than on `Hotspot` itself since it
/// needs the same button-compatibility filter as drag/throw dispatch.
pub fn hotspot_button_matches(expected: HotspotButton, pressed: crate::environment::pointer::PressedButton) -> bool {
    matches!(
        (expected, pressed),
        (HotspotButton::Left, crate::environment::pointer::PressedButton::Left)
            | (HotspotButton::Right, crate::environment::pointer::PressedButton::Right)
            | (HotspotButton::Middle, crate::environment::pointer::PressedButton::Middle)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::SpawnParams;
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

    fn spawn(id: u32, x: i32, y: i32) -> Arc<Mutex<Agent>> {
        Arc::new(Mutex::new(Agent::spawn(
            id,
            bare_prototype(),
            id,
            SpawnParams {
                initial_behaviour: None,
                vx: 0.0,
                vy: 0.0,
                x,
                y,
                gravity: 1.0,
                drag_x: 0.9,
                drag_y: 0.9,
                looking_right: true,
            },
        )))
    }

    #[test]
    fn find_target_excludes_the_seeker_and_matches_case_insensitively() {
        let registry = Registry::new(4);
        let a = spawn(1, 0, 0);
        let b = spawn(2, 100, 0);
        registry.announce(1, 1, Arc::downgrade(&a), Some("Poke".into()));
        registry.announce(2, 2, Arc::downgrade(&b), Some("poke".into()));

        let found = registry.find_target(1, "POKE");
        assert_eq!(found.map(|(id, _)| id), Some(2));
    }

    #[test]
    fn interact_copies_position_and_clears_advertisements() {
        let registry = Registry::new(4);
        let a = spawn(1, 0, 0);
        let b = spawn(2, 300, 300);
        registry.announce(1, 1, Arc::downgrade(&a), Some("poke".into()));
        registry.announce(2, 2, Arc::downgrade(&b), Some("poke".into()));

        let (target_id, handle) = registry.find_target(1, "poke").unwrap();
        let mut seeker = a.lock().unwrap();
        seeker.current_affordance = Some("poke".into());
        let ok = interact(&registry, &mut seeker, target_id, &handle, "poke", None, None, false);
        assert!(ok);
        assert!(seeker.current_affordance.is_none());
        drop(seeker);

        let target = b.lock().unwrap();
        assert_eq!(target.local(crate::agent::vars::slot::X), 0.0);
        assert!(!registry.is_advertising(2, "poke"));
    }
}
