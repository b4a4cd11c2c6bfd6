// SPDX-License-Identifier: GPL-3.0-or-later

//! Prototypes: the immutable, reference-counted character
//! package a Prototype Store publishes and agents are spawned from.
//!
//! A published [`Prototype`] never mutates in place; reload replaces it
//! wholesale (see [`crate::prototype::store`]).

pub mod load;
pub mod store;
pub mod version;

use crate::environment::BorderMask;
use crate::expr::Program;
use std::sync::Arc;

/// One of the 128 recognised local-variable slots an action can seed or a
/// prototype can declare as used. Slots 0-23 have fixed semantics, see
/// `crate::agent::vars`.
pub const MAX_LOCAL_VARIABLES: usize = 128;
pub const MAX_ACTION_CONTENT: usize = 64;
pub const MAX_BEHAVIOUR_REFS: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalVarKind {
    Int,
    Float,
}

/// A named local variable a prototype's actions may read, write, or seed
/// with a backing expression.
#[derive(Debug, Clone)]
pub struct LocalVarDef {
    pub name: String,
    pub kind: LocalVarKind,
    pub id: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotShape {
    Ellipse,
    Rectangle,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotCursor {
    Pointer,
    Hand,
    Crosshair,
    Move,
    Text,
    Wait,
    Help,
    Progress,
    Deny,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HotspotButton {
    Left,
    Middle,
    Right,
}

#[derive(Debug, Clone)]
pub struct Hotspot {
    pub shape: HotspotShape,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Name of the behaviour this hotspot latches on click.
    pub behaviour: String,
    pub cursor: HotspotCursor,
    pub button: HotspotButton,
}

impl Hotspot {
    pub fn contains(&self, x: i32, y: i32) -> bool {
        match self.shape {
            HotspotShape::Rectangle => {
                x >= self.x && x < self.x + self.width && y >= self.y && y < self.y + self.height
            }
            HotspotShape::Ellipse => {
                let rx = self.width as f32 / 2.0;
                let ry = self.height as f32 / 2.0;
                if rx <= 0.0 || ry <= 0.0 {
                    return false;
                }
                let cx = self.x as f32 + rx;
                let cy = self.y as f32 + ry;
                let dx = (x as f32 - cx) / rx;
                let dy = (y as f32 - cy) / ry;
                dx * dx + dy * dy <= 1.0
            }
        }
    }
}

/// Opaque handle into the Sprite Atlas. Decoding sprite pixels (PNG/atlas
/// format) is out of scope for this crate; this is the seam a real atlas
/// loader would populate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpriteId(pub u32);

/// A left/right-mirrored sprite pair as referenced by a [`Pose`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpritePair {
    pub left: SpriteId,
    pub right: Option<SpriteId>,
}

#[derive(Debug, Clone, Copy)]
pub struct Pose {
    pub sprite: SpritePair,
    pub anchor_x: i32,
    pub anchor_y: i32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    /// Frame duration in ticks; default is one 1/40s frame at the nominal
    /// ~25Hz tick rate.
    pub duration: u32,
}

#[derive(Debug, Clone)]
pub struct Animation {
    pub condition: Option<Arc<Program>>,
    pub frames: Vec<Pose>,
    pub hotspots: Vec<Hotspot>,
}

/// The sprite atlas backing a prototype. Real pixel data lives behind
/// [`SpriteId`]; this crate only tracks id allocation and input masks.
#[derive(Debug, Clone, Default)]
pub struct SpriteAtlas {
    pub sprite_count: u32,
}

impl SpriteAtlas {
    pub fn allocate(&mut self) -> SpriteId {
        let id = SpriteId(self.sprite_count);
        self.sprite_count += 1;
        id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionKind {
    Stay,
    Move,
    Animate,
    Embedded(EmbeddedKind),
    Sequence,
    Select,
}

/// The ~15 built-in embedded action kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddedKind {
    Fall,
    Jump,
    Walk,
    Drag,
    DragResist,
    Clone,
    Transform,
    Dispose,
    ScanMove,
    ScanJump,
    Interact,
    WalkWithWindow,
    ThrowWindow,
}

/// An action's content entry: either a terminal animation frame-set or a
/// reference to a nested action.
#[derive(Debug, Clone)]
pub enum ActionContent {
    Animation(Animation),
    ActionRef(ActionRef),
}

/// A reference from one action's content (or a behaviour) to another
/// action, carrying per-use overrides.
///
/// Holds the target by name rather than `Arc<Action>`: actions may reference
/// one another out of declaration order or cyclically (a looping sequence
/// referencing an ancestor), which a plain `Arc` graph can't express without
/// leaked placeholders. The interpreter resolves `action_name` against the
/// owning [`Prototype`] each time it steps into the reference.
#[derive(Debug, Clone)]
pub struct ActionRef {
    pub action_name: String,
    /// Local variable slots this reference seeds before entering the action.
    pub overwritten_locals: Vec<(u8, Arc<Program>)>,
    pub duration_limit: Option<Arc<Program>>,
    pub condition: Option<Arc<Program>>,
}

#[derive(Debug, Clone)]
pub struct Action {
    pub name: String,
    pub kind: ActionKind,
    pub content: Vec<ActionContent>,
    pub looping: bool,
    pub required_border: BorderMask,
    pub condition: Option<Arc<Program>>,
    pub target_behaviour: Option<String>,
    pub select_behaviour: Option<String>,
    pub born_behaviour: Option<String>,
    pub affordance: Option<String>,
    pub transform_target: Option<String>,
    pub born_mascot: Option<String>,
    pub behaviour: Option<String>,
    pub target_look: bool,
}

/// An entry in a behaviour's next-behaviour list: which behaviour to weight
/// in, how heavily, and under what (optional) gating condition.
///
/// Names its target rather than embedding `Arc<Behaviour>` for the same
/// reason as [`ActionRef`]: behaviour graphs commonly cycle (a patrol loop
/// referencing its own starting behaviour).
#[derive(Debug, Clone)]
pub struct NextBehaviourRef {
    pub behaviour_name: String,
    pub frequency: u64,
    pub condition: Option<Arc<Program>>,
}

#[derive(Debug, Clone)]
pub struct Behaviour {
    pub name: String,
    pub hidden: bool,
    pub is_condition: bool,
    pub action: Option<Arc<Action>>,
    pub condition: Option<Arc<Program>>,
    /// Additive (merge into current pool) vs replacing (reset pool) on select.
    pub add_behaviours: bool,
    pub next_behaviours: Vec<NextBehaviourRef>,
    pub frequency: u64,
}

/// A weighted entry in the root (or a behaviour's next-) pool.
#[derive(Debug, Clone)]
pub struct BehaviourRef {
    pub behaviour_name: String,
    pub frequency: u64,
    pub condition: Option<Arc<Program>>,
}

/// An immutable, reference-counted character package.
/// Once published to the [`store::Store`], never mutated in place; a reload
/// publishes a new `Prototype` under the same name.
#[derive(Debug)]
pub struct Prototype {
    pub id: u32,
    pub name: String,
    pub display_name: String,
    pub path: std::path::PathBuf,

    pub actions: Vec<Arc<Action>>,
    pub behaviours: Vec<Arc<Behaviour>>,
    pub local_variables: Vec<LocalVarDef>,
    pub expressions: Vec<Arc<Program>>,

    pub root_behaviours: Vec<BehaviourRef>,
    pub atlas: SpriteAtlas,

    pub drag_behaviour: Option<Arc<Behaviour>>,
    pub thrown_behaviour: Option<Arc<Behaviour>>,
    pub fall_behaviour: Option<Arc<Behaviour>>,
    pub dismiss_action: Option<Arc<Action>>,
}

impl Prototype {
    pub fn behaviour_by_name(&self, name: &str) -> Option<Arc<Behaviour>> {
        self.behaviours.iter().find(|b| b.name == name).cloned()
    }

    pub fn action_by_name(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.iter().find(|a| a.name == name).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rectangle_hotspot_hit_test_is_half_open() {
        let h = Hotspot {
            shape: HotspotShape::Rectangle,
            x: 10,
            y: 10,
            width: 20,
            height: 20,
            behaviour: "poke".into(),
            cursor: HotspotCursor::Pointer,
            button: HotspotButton::Left,
        };
        assert!(h.contains(10, 10));
        assert!(!h.contains(30, 30));
        assert!(h.contains(29, 29));
    }

    #[test]
    fn ellipse_hotspot_excludes_corners() {
        let h = Hotspot {
            shape: HotspotShape::Ellipse,
            x: 0,
            y: 0,
            width: 20,
            height: 20,
            behaviour: "poke".into(),
            cursor: HotspotCursor::Pointer,
            button: HotspotButton::Left,
        };
        assert!(h.contains(10, 10));
        assert!(!h.contains(0, 0));
    }

    #[test]
    fn atlas_allocates_increasing_ids() {
        let mut atlas = SpriteAtlas::default();
        let a = atlas.allocate();
        let b = atlas.allocate();
        assert_ne!(a, b);
    }
}
