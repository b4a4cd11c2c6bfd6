// SPDX-License-Identifier: GPL-3.0-or-later

//! Prototype loader: reads a package
//! directory's `manifest.json`, `programs.json`, `actions.json`, and
//! `behaviours.json` and assembles a [`Prototype`].
//!
//! Sprite pixel decoding (`assets/*.png`) is out of scope; this loader only
//! allocates [`SpriteId`]s for the sprite names a package declares.

use super::version::{check_version, Version};
use super::{
    Action, ActionContent, ActionKind, ActionRef, Animation, Behaviour, BehaviourRef,
    EmbeddedKind, Hotspot, HotspotButton, HotspotCursor, HotspotShape, LocalVarDef, LocalVarKind,
    NextBehaviourRef, Pose, Prototype, SpriteAtlas, SpriteId, SpritePair,
};
use crate::environment::BorderMask;
use crate::error::LoadError;
use crate::expr::Program;
use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

#[derive(Deserialize)]
struct ManifestFile {
    name: String,
    display_name: String,
    version: String,
    #[serde(default = "default_programs_path")]
    programs: String,
    #[serde(default = "default_actions_path")]
    actions: String,
    #[serde(default = "default_behaviours_path")]
    behaviours: String,
}

fn default_programs_path() -> String {
    "programs.json".to_string()
}
fn default_actions_path() -> String {
    "actions.json".to_string()
}
fn default_behaviours_path() -> String {
    "behaviours.json".to_string()
}

#[derive(Deserialize)]
struct ProgramFile {
    id: String,
    /// Hex-encoded bytecode, two characters per byte (see expressions.c's
    /// `expression_prototype_load_bytecode`).
    bytecode: String,
    #[serde(default)]
    locals: Vec<String>,
    #[serde(default)]
    globals: Vec<String>,
    #[serde(default)]
    functions: Vec<String>,
    #[serde(default)]
    evaluate_once: bool,
}

#[derive(Deserialize)]
struct HotspotFile {
    #[serde(default)]
    shape: String,
    x: i32,
    y: i32,
    width: i32,
    height: i32,
    behaviour: String,
    #[serde(default)]
    cursor: String,
    #[serde(default)]
    button: String,
}

#[derive(Deserialize)]
struct PoseFile {
    sprite_left: String,
    #[serde(default)]
    sprite_right: Option<String>,
    #[serde(default)]
    anchor_x: i32,
    #[serde(default)]
    anchor_y: i32,
    #[serde(default)]
    velocity_x: f32,
    #[serde(default)]
    velocity_y: f32,
    #[serde(default = "default_duration")]
    duration: u32,
}

fn default_duration() -> u32 {
    25
}

#[derive(Deserialize)]
struct AnimationFile {
    #[serde(default)]
    condition: Option<String>,
    frames: Vec<PoseFile>,
    #[serde(default)]
    hotspots: Vec<HotspotFile>,
}

#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
enum ContentFile {
    Animation(AnimationFile),
    ActionRef {
        action: String,
        #[serde(default)]
        overwritten_locals: HashMap<String, String>,
        #[serde(default)]
        duration_limit: Option<String>,
        #[serde(default)]
        condition: Option<String>,
    },
}

#[derive(Deserialize)]
struct ActionFile {
    name: String,
    kind: String,
    #[serde(default)]
    embedded: Option<String>,
    #[serde(default)]
    content: Vec<ContentFile>,
    #[serde(default)]
    looping: bool,
    #[serde(default)]
    required_border: Vec<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    target_behaviour: Option<String>,
    #[serde(default)]
    select_behaviour: Option<String>,
    #[serde(default)]
    born_behaviour: Option<String>,
    #[serde(default)]
    affordance: Option<String>,
    #[serde(default)]
    transform_target: Option<String>,
    #[serde(default)]
    born_mascot: Option<String>,
    #[serde(default)]
    behaviour: Option<String>,
    #[serde(default)]
    target_look: bool,
}

#[derive(Deserialize)]
struct NextBehaviourFile {
    name: String,
    #[serde(default = "default_frequency")]
    frequency: u64,
    #[serde(default)]
    condition: Option<String>,
}

fn default_frequency() -> u64 {
    100
}

#[derive(Deserialize)]
struct BehaviourFile {
    name: String,
    #[serde(default)]
    hidden: bool,
    #[serde(default)]
    is_condition: bool,
    #[serde(default)]
    action: Option<String>,
    #[serde(default)]
    condition: Option<String>,
    #[serde(default)]
    add_behaviours: bool,
    #[serde(default)]
    next_behaviours: Vec<NextBehaviourFile>,
    #[serde(default = "default_frequency")]
    frequency: u64,
}

#[derive(Deserialize)]
struct BehavioursFile {
    behaviours: Vec<BehaviourFile>,
    #[serde(default)]
    root: Vec<NextBehaviourFile>,
}

fn decode_hex_bytecode(s: &str) -> Result<Vec<u8>, LoadError> {
    let s = s.trim();
    if s.len() % 2 != 0 {
        return Err(LoadError::ProgramsInvalid("odd-length hex bytecode".into()));
    }
    (0..s.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&s[i..i + 2], 16)
                .map_err(|_| LoadError::ProgramsInvalid(format!("bad hex byte at offset {i}")))
        })
        .collect()
}

fn parse_border_mask(tags: &[String]) -> BorderMask {
    let mut mask = BorderMask::NONE;
    for tag in tags {
        mask = mask
            | match tag.as_str() {
                "floor" => BorderMask::FLOOR,
                "ceiling" => BorderMask::CEILING,
                "left" => BorderMask::LEFT,
                "right" => BorderMask::RIGHT,
                "wall" => BorderMask::WALL,
                "any" => BorderMask::ANY,
                _ => BorderMask::NONE,
            };
    }
    mask
}

fn parse_hotspot_shape(s: &str) -> HotspotShape {
    match s {
        "ellipse" => HotspotShape::Ellipse,
        _ => HotspotShape::Rectangle,
    }
}

fn parse_hotspot_cursor(s: &str) -> HotspotCursor {
    match s {
        "hand" => HotspotCursor::Hand,
        "crosshair" => HotspotCursor::Crosshair,
        "move" => HotspotCursor::Move,
        "text" => HotspotCursor::Text,
        "wait" => HotspotCursor::Wait,
        "help" => HotspotCursor::Help,
        "progress" => HotspotCursor::Progress,
        "deny" => HotspotCursor::Deny,
        _ => HotspotCursor::Pointer,
    }
}

fn parse_hotspot_button(s: &str) -> HotspotButton {
    match s {
        "middle" => HotspotButton::Middle,
        "right" => HotspotButton::Right,
        _ => HotspotButton::Left,
    }
}

fn parse_embedded_kind(s: &str) -> Result<EmbeddedKind, LoadError> {
    Ok(match s {
        "fall" => EmbeddedKind::Fall,
        "jump" => EmbeddedKind::Jump,
        "walk" => EmbeddedKind::Walk,
        "drag" => EmbeddedKind::Drag,
        "drag-resist" => EmbeddedKind::DragResist,
        "clone" => EmbeddedKind::Clone,
        "transform" => EmbeddedKind::Transform,
        "dispose" => EmbeddedKind::Dispose,
        "scan-move" => EmbeddedKind::ScanMove,
        "scan-jump" => EmbeddedKind::ScanJump,
        "interact" => EmbeddedKind::Interact,
        "walk-with-window" => EmbeddedKind::WalkWithWindow,
        "throw-window" => EmbeddedKind::ThrowWindow,
        other => return Err(LoadError::ActionsInvalid(format!("unknown embedded kind {other:?}"))),
    })
}

/// Loads a package directory into a fully linked [`Prototype`]. Does not
/// publish it to a [`super::store::Store`] — the caller decides whether
/// this is a fresh `add` or a `replace`.
pub fn load_from_dir(dir: &Path) -> Result<Prototype, LoadError> {
    let manifest_path = dir.join("manifest.json");
    let manifest_text = fs::read_to_string(&manifest_path).map_err(|_| LoadError::ManifestMissing)?;
    let manifest: ManifestFile = serde_json::from_str(&manifest_text)
        .map_err(|e| LoadError::ManifestInvalid(e.to_string()))?;

    let version = Version::parse(&manifest.version)?;
    check_version(version)?;

    let programs_path = dir.join(&manifest.programs);
    let programs_text =
        fs::read_to_string(&programs_path).map_err(|_| LoadError::ProgramsMissing)?;
    let program_files: Vec<ProgramFile> =
        serde_json::from_str(&programs_text).map_err(|e| LoadError::ProgramsInvalid(e.to_string()))?;

    let mut programs_by_id: HashMap<String, Arc<Program>> = HashMap::new();
    let mut expressions = Vec::with_capacity(program_files.len());
    for (numeric_id, pf) in program_files.iter().enumerate() {
        let bytecode = decode_hex_bytecode(&pf.bytecode)?;
        let locals = pf
            .locals
            .iter()
            .map(|name| {
                crate::agent::vars::slot_for_name(name)
                    .ok_or_else(|| LoadError::ProgramsInvalid(format!("unknown local variable {name:?}")))
            })
            .collect::<Result<Vec<u8>, LoadError>>()?;
        let globals = pf
            .globals
            .iter()
            .map(|name| {
                crate::expr::HOST_TABLE
                    .global(name)
                    .ok_or_else(|| LoadError::ProgramsInvalid(format!("unknown global {name:?}")))
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        let functions = pf
            .functions
            .iter()
            .map(|name| {
                crate::expr::HOST_TABLE
                    .function(name)
                    .ok_or_else(|| LoadError::ProgramsInvalid(format!("unknown function {name:?}")))
            })
            .collect::<Result<Vec<_>, LoadError>>()?;
        let program = Arc::new(Program {
            id: numeric_id as u32,
            bytecode,
            locals,
            globals,
            functions,
            evaluate_once: pf.evaluate_once,
        });
        programs_by_id.insert(pf.id.clone(), program.clone());
        expressions.push(program);
    }
    let resolve_program = |id: &str| -> Result<Arc<Program>, LoadError> {
        programs_by_id
            .get(id)
            .cloned()
            .ok_or_else(|| LoadError::ProgramsInvalid(format!("unknown program id {id:?}")))
    };
    let resolve_program_opt = |id: &Option<String>| -> Result<Option<Arc<Program>>, LoadError> {
        id.as_deref().map(&resolve_program).transpose()
    };

    let actions_path = dir.join(&manifest.actions);
    let actions_text = fs::read_to_string(&actions_path).map_err(|_| LoadError::ActionsMissing)?;
    let action_files: Vec<ActionFile> =
        serde_json::from_str(&actions_text).map_err(|e| LoadError::ActionsInvalid(e.to_string()))?;

    let mut atlas = SpriteAtlas::default();
    let mut sprites: HashMap<String, SpriteId> = HashMap::new();
    let mut intern_sprite = |name: &str, sprites: &mut HashMap<String, SpriteId>, atlas: &mut SpriteAtlas| {
        *sprites
            .entry(name.to_string())
            .or_insert_with(|| atlas.allocate())
    };

    let action_names: std::collections::HashSet<&str> =
        action_files.iter().map(|af| af.name.as_str()).collect();

    let mut actions_list: Vec<Arc<Action>> = Vec::with_capacity(action_files.len());
    for af in &action_files {
        let kind = match af.kind.as_str() {
            "stay" => ActionKind::Stay,
            "move" => ActionKind::Move,
            "animate" => ActionKind::Animate,
            "sequence" => ActionKind::Sequence,
            "select" => ActionKind::Select,
            "embedded" => {
                let tag = af
                    .embedded
                    .as_deref()
                    .ok_or_else(|| LoadError::ActionsInvalid(format!("{} missing embedded kind", af.name)))?;
                ActionKind::Embedded(parse_embedded_kind(tag)?)
            }
            other => return Err(LoadError::ActionsInvalid(format!("unknown action kind {other:?}"))),
        };

        let mut content = Vec::with_capacity(af.content.len());
        for c in &af.content {
            match c {
                ContentFile::Animation(anim) => {
                    let condition = resolve_program_opt(&anim.condition)?;
                    let frames = anim
                        .frames
                        .iter()
                        .map(|p| Pose {
                            sprite: SpritePair {
                                left: intern_sprite(&p.sprite_left, &mut sprites, &mut atlas),
                                right: p
                                    .sprite_right
                                    .as_deref()
                                    .map(|n| intern_sprite(n, &mut sprites, &mut atlas)),
                            },
                            anchor_x: p.anchor_x,
                            anchor_y: p.anchor_y,
                            velocity_x: p.velocity_x,
                            velocity_y: p.velocity_y,
                            duration: p.duration,
                        })
                        .collect();
                    let hotspots = anim
                        .hotspots
                        .iter()
                        .map(|h| Hotspot {
                            shape: parse_hotspot_shape(&h.shape),
                            x: h.x,
                            y: h.y,
                            width: h.width,
                            height: h.height,
                            behaviour: h.behaviour.clone(),
                            cursor: parse_hotspot_cursor(&h.cursor),
                            button: parse_hotspot_button(&h.button),
                        })
                        .collect();
                    content.push(ActionContent::Animation(Animation {
                        condition,
                        frames,
                        hotspots,
                    }));
                }
                ContentFile::ActionRef {
                    action,
                    overwritten_locals,
                    duration_limit,
                    condition,
                } => {
                    if !action_names.contains(action.as_str()) {
                        return Err(LoadError::ActionsInvalid(format!(
                            "action {:?} references unknown action {action:?}",
                            af.name
                        )));
                    }
                    let mut overwritten = Vec::with_capacity(overwritten_locals.len());
                    for (slot, expr_id) in overwritten_locals {
                        let slot: u8 = slot
                            .parse()
                            .map_err(|_| LoadError::ActionsInvalid(format!("bad local slot {slot:?}")))?;
                        overwritten.push((slot, resolve_program(expr_id)?));
                    }
                    content.push(ActionContent::ActionRef(ActionRef {
                        action_name: action.clone(),
                        overwritten_locals: overwritten,
                        duration_limit: resolve_program_opt(duration_limit)?,
                        condition: resolve_program_opt(condition)?,
                    }));
                }
            }
        }

        actions_list.push(Arc::new(Action {
            name: af.name.clone(),
            kind,
            content,
            looping: af.looping,
            required_border: parse_border_mask(&af.required_border),
            condition: resolve_program_opt(&af.condition)?,
            target_behaviour: af.target_behaviour.clone(),
            select_behaviour: af.select_behaviour.clone(),
            born_behaviour: af.born_behaviour.clone(),
            affordance: af.affordance.clone(),
            transform_target: af.transform_target.clone(),
            born_mascot: af.born_mascot.clone(),
            behaviour: af.behaviour.clone(),
            target_look: af.target_look,
        }));
    }
    let action_by_name = |name: &str| -> Option<Arc<Action>> {
        actions_list.iter().find(|a| a.name == name).cloned()
    };

    let behaviours_path = dir.join(&manifest.behaviours);
    let behaviours_text =
        fs::read_to_string(&behaviours_path).map_err(|_| LoadError::BehavioursMissing)?;
    let behaviours_file: BehavioursFile = serde_json::from_str(&behaviours_text)
        .map_err(|e| LoadError::BehavioursInvalid(e.to_string()))?;

    let behaviour_names: std::collections::HashSet<&str> =
        behaviours_file.behaviours.iter().map(|bf| bf.name.as_str()).collect();
    let resolve_next_list = |list: &[NextBehaviourFile]| -> Result<Vec<NextBehaviourRef>, LoadError> {
        list.iter()
            .map(|n| {
                if !behaviour_names.contains(n.name.as_str()) {
                    return Err(LoadError::BehavioursInvalid(format!(
                        "unknown behaviour {:?}",
                        n.name
                    )));
                }
                Ok(NextBehaviourRef {
                    behaviour_name: n.name.clone(),
                    frequency: n.frequency,
                    condition: resolve_program_opt(&n.condition)?,
                })
            })
            .collect()
    };

    let mut behaviours_list: Vec<Arc<Behaviour>> = Vec::with_capacity(behaviours_file.behaviours.len());
    for bf in &behaviours_file.behaviours {
        let action = bf
            .action
            .as_deref()
            .map(|n| {
                action_by_name(n)
                    .ok_or_else(|| LoadError::BehavioursInvalid(format!("unknown action {n:?}")))
            })
            .transpose()?;
        behaviours_list.push(Arc::new(Behaviour {
            name: bf.name.clone(),
            hidden: bf.hidden,
            is_condition: bf.is_condition,
            action,
            condition: resolve_program_opt(&bf.condition)?,
            add_behaviours: bf.add_behaviours,
            next_behaviours: resolve_next_list(&bf.next_behaviours)?,
            frequency: bf.frequency,
        }));
    }
    let behaviour_by_name = |name: &str| -> Option<Arc<Behaviour>> {
        behaviours_list.iter().find(|b| b.name == name).cloned()
    };

    let root_behaviours = behaviours_file
        .root
        .iter()
        .map(|n| {
            if !behaviour_names.contains(n.name.as_str()) {
                return Err(LoadError::BehavioursInvalid(format!(
                    "unknown root behaviour {:?}",
                    n.name
                )));
            }
            Ok(BehaviourRef {
                behaviour_name: n.name.clone(),
                frequency: n.frequency,
                condition: resolve_program_opt(&n.condition)?,
            })
        })
        .collect::<Result<Vec<_>, LoadError>>()?;

    let local_variables = crate::agent::vars::FIXED_SLOTS
        .iter()
        .enumerate()
        .map(|(id, (name, kind))| LocalVarDef {
            name: (*name).to_string(),
            kind: *kind,
            id: id as u8,
        })
        .collect();

    Ok(Prototype {
        id: 0,
        name: manifest.name,
        display_name: manifest.display_name,
        path: dir.to_path_buf(),
        actions: actions_list,
        behaviours: behaviours_list,
        local_variables,
        expressions,
        root_behaviours,
        atlas,
        drag_behaviour: behaviour_by_name("drag"),
        thrown_behaviour: behaviour_by_name("thrown"),
        fall_behaviour: behaviour_by_name("fall"),
        dismiss_action: action_by_name("dismiss"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &Path, name: &str, content: &str) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        f.write_all(content.as_bytes()).unwrap();
    }

    #[test]
    fn loads_a_minimal_package() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "manifest.json",
            r#"{"name":"Penguin","display_name":"Penguin","version":"1.0.0"}"#,
        );
        write_file(dir.path(), "programs.json", "[]");
        write_file(
            dir.path(),
            "actions.json",
            r#"[{"name":"Stand","kind":"stay"}]"#,
        );
        write_file(
            dir.path(),
            "behaviours.json",
            r#"{"behaviours":[{"name":"Standing","action":"Stand"}],"root":[{"name":"Standing"}]}"#,
        );

        let proto = load_from_dir(dir.path()).unwrap();
        assert_eq!(proto.name, "Penguin");
        assert_eq!(proto.actions.len(), 1);
        assert_eq!(proto.root_behaviours.len(), 1);
    }

    #[test]
    fn rejects_missing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_from_dir(dir.path()).unwrap_err();
        assert_eq!(err, LoadError::ManifestMissing);
    }

    #[test]
    fn rejects_version_below_minimum() {
        let dir = tempfile::tempdir().unwrap();
        write_file(
            dir.path(),
            "manifest.json",
            r#"{"name":"Old","display_name":"Old","version":"0.1.0"}"#,
        );
        write_file(dir.path(), "programs.json", "[]");
        write_file(dir.path(), "actions.json", "[]");
        write_file(
            dir.path(),
            "behaviours.json",
            r#"{"behaviours":[],"root":[]}"#,
        );
        let err = load_from_dir(dir.path()).unwrap_err();
        matches!(err, LoadError::VersionTooOld { .. });
    }

    #[test]
    fn decodes_hex_bytecode() {
        assert_eq!(decode_hex_bytecode("00ff10").unwrap(), vec![0x00, 0xff, 0x10]);
        assert!(decode_hex_bytecode("0").is_err());
    }
}
