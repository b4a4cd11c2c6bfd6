// SPDX-License-Identifier: GPL-3.0-or-later

//! Runtime configuration surface.
//!
//! The on-disk format is line-oriented `key=value`, `#` comments,
//! whitespace-stripped, with booleans accepting true/yes/on/1 and
//! false/no/off/0. Every key is independently gettable/settable via IPC
//! opcode `0x17`, so [`Config`] exposes a string-keyed `get`/`set` pair in
//! addition to typed fields.

use crate::environment::pointer::PressedButton;
use crate::error::ConfigError;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// What an agent's attached foreground window should do when thrown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IeThrowPolicy {
    None,
    Stop,
    Bounce,
    Loop,
    Close,
    Minimize,
    KeepOffscreen,
}

impl Default for IeThrowPolicy {
    fn default() -> Self {
        IeThrowPolicy::Loop
    }
}

impl FromStr for IeThrowPolicy {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        Ok(match s {
            "none" => IeThrowPolicy::None,
            "stop" => IeThrowPolicy::Stop,
            "bounce" => IeThrowPolicy::Bounce,
            "loop" => IeThrowPolicy::Loop,
            "close" => IeThrowPolicy::Close,
            "minimize" => IeThrowPolicy::Minimize,
            "keep_offscreen" => IeThrowPolicy::KeepOffscreen,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for IeThrowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            IeThrowPolicy::None => "none",
            IeThrowPolicy::Stop => "stop",
            IeThrowPolicy::Bounce => "bounce",
            IeThrowPolicy::Loop => "loop",
            IeThrowPolicy::Close => "close",
            IeThrowPolicy::Minimize => "minimize",
            IeThrowPolicy::KeepOffscreen => "keep_offscreen",
        };
        f.write_str(s)
    }
}

/// Which compositor layer hosts agent surfaces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayLayer {
    Background,
    Bottom,
    Top,
    Overlay,
}

impl Default for OverlayLayer {
    fn default() -> Self {
        OverlayLayer::Overlay
    }
}

impl FromStr for OverlayLayer {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        Ok(match s {
            "background" => OverlayLayer::Background,
            "bottom" => OverlayLayer::Bottom,
            "top" => OverlayLayer::Top,
            "overlay" => OverlayLayer::Overlay,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for OverlayLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverlayLayer::Background => "background",
            OverlayLayer::Bottom => "bottom",
            OverlayLayer::Top => "top",
            OverlayLayer::Overlay => "overlay",
        };
        f.write_str(s)
    }
}

fn clampf(v: f32, lo: f32, hi: f32) -> f32 {
    v.max(lo).min(hi)
}

/// The live configuration surface.
#[derive(Debug, Clone)]
pub struct Config {
    pub breeding: bool,
    pub dragging: bool,
    pub ie_interactions: bool,
    pub ie_throwing: bool,
    pub cursor_data: bool,
    pub allow_dismiss_animations: bool,
    pub per_mascot_interactions: bool,
    pub mascot_limit: u32,
    pub ie_throw_policy: IeThrowPolicy,
    pub overlay_layer: OverlayLayer,
    pub interpolation_framerate: i32,
    pub mascot_opacity: f32,
    pub mascot_scale: f32,
    pub unified_outputs: bool,
    pub allow_dragging_multihead: bool,
    pub allow_throwing_multihead: bool,
    pub tablets_enabled: bool,

    /// `None` means "device-specific default" (on disk: unset/`-1`);
    /// resolved at read time by [`Config::get`] via [`POINTER_BUTTON_KEYS`].
    pub pointer_left_value: Option<PressedButton>,
    pub pointer_right_value: Option<PressedButton>,
    pub pointer_middle_value: Option<PressedButton>,
    pub on_tool_pen_value: Option<PressedButton>,
    pub on_tool_eraser_value: Option<PressedButton>,
    pub on_tool_brush_value: Option<PressedButton>,
    pub on_tool_pencil_value: Option<PressedButton>,
    pub on_tool_airbrush_value: Option<PressedButton>,
    pub on_tool_finger_value: Option<PressedButton>,
    pub on_tool_lens_value: Option<PressedButton>,
    pub on_tool_mouse_value: Option<PressedButton>,
    pub on_tool_button1_value: Option<PressedButton>,
    pub on_tool_button2_value: Option<PressedButton>,
    pub on_tool_button3_value: Option<PressedButton>,
}

/// Key name and device-specific default for every pointer/tool-button
/// remap key, in declaration order.
pub const POINTER_BUTTON_KEYS: &[(&str, PressedButton)] = &[
    ("pointer_left_value", PressedButton::Left),
    ("pointer_right_value", PressedButton::Right),
    ("pointer_middle_value", PressedButton::Middle),
    ("on_tool_pen_value", PressedButton::Left),
    ("on_tool_eraser_value", PressedButton::Left),
    ("on_tool_brush_value", PressedButton::Left),
    ("on_tool_pencil_value", PressedButton::Left),
    ("on_tool_airbrush_value", PressedButton::Left),
    ("on_tool_finger_value", PressedButton::Left),
    ("on_tool_lens_value", PressedButton::Left),
    ("on_tool_mouse_value", PressedButton::Left),
    ("on_tool_button1_value", PressedButton::Right),
    ("on_tool_button2_value", PressedButton::Right),
    ("on_tool_button3_value", PressedButton::Right),
];

impl Default for Config {
    fn default() -> Self {
        Config {
            breeding: true,
            dragging: true,
            ie_interactions: false,
            ie_throwing: false,
            cursor_data: true,
            allow_dismiss_animations: true,
            per_mascot_interactions: true,
            mascot_limit: 512,
            ie_throw_policy: IeThrowPolicy::default(),
            overlay_layer: OverlayLayer::default(),
            interpolation_framerate: 0,
            mascot_opacity: 1.0,
            mascot_scale: 1.0,
            unified_outputs: false,
            allow_dragging_multihead: true,
            allow_throwing_multihead: false,
            tablets_enabled: true,
            pointer_left_value: None,
            pointer_right_value: None,
            pointer_middle_value: None,
            on_tool_pen_value: None,
            on_tool_eraser_value: None,
            on_tool_brush_value: None,
            on_tool_pencil_value: None,
            on_tool_airbrush_value: None,
            on_tool_finger_value: None,
            on_tool_lens_value: None,
            on_tool_mouse_value: None,
            on_tool_button1_value: None,
            on_tool_button2_value: None,
            on_tool_button3_value: None,
        }
    }
}

fn pointer_button_default(key: &str) -> Option<PressedButton> {
    POINTER_BUTTON_KEYS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, default)| *default)
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Some(true),
        "false" | "no" | "off" | "0" => Some(false),
        _ => None,
    }
}

impl Config {
    /// Parse the line-oriented `key=value` configuration file format.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let mut config = Config::default();
        for raw_line in contents.lines() {
            let line = raw_line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            config.set(key.trim(), value.trim())?;
        }
        Ok(config)
    }

    /// Load and parse the configuration file at `path`; missing files fall back to defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(_) => Ok(Config::default()),
        }
    }

    /// Get a key's current value as a display string, for IPC opcode `0x17` reads.
    pub fn get(&self, key: &str) -> Option<String> {
        Some(match key {
            "breeding" => self.breeding.to_string(),
            "dragging" => self.dragging.to_string(),
            "ie_interactions" => self.ie_interactions.to_string(),
            "ie_throwing" => self.ie_throwing.to_string(),
            "cursor_data" => self.cursor_data.to_string(),
            "allow_dismiss_animations" => self.allow_dismiss_animations.to_string(),
            "per_mascot_interactions" => self.per_mascot_interactions.to_string(),
            "mascot_limit" => self.mascot_limit.to_string(),
            "ie_throw_policy" => self.ie_throw_policy.to_string(),
            "overlay_layer" => self.overlay_layer.to_string(),
            "interpolation_framerate" => self.interpolation_framerate.to_string(),
            "mascot_opacity" => self.mascot_opacity.to_string(),
            "mascot_scale" => self.mascot_scale.to_string(),
            "unified_outputs" => self.unified_outputs.to_string(),
            "allow_dragging_multihead" => self.allow_dragging_multihead.to_string(),
            "allow_throwing_multihead" => self.allow_throwing_multihead.to_string(),
            "tablets_enabled" => self.tablets_enabled.to_string(),
            "pointer_left_value" => self.pointer_button_display(self.pointer_left_value, key),
            "pointer_right_value" => self.pointer_button_display(self.pointer_right_value, key),
            "pointer_middle_value" => self.pointer_button_display(self.pointer_middle_value, key),
            "on_tool_pen_value" => self.pointer_button_display(self.on_tool_pen_value, key),
            "on_tool_eraser_value" => self.pointer_button_display(self.on_tool_eraser_value, key),
            "on_tool_brush_value" => self.pointer_button_display(self.on_tool_brush_value, key),
            "on_tool_pencil_value" => self.pointer_button_display(self.on_tool_pencil_value, key),
            "on_tool_airbrush_value" => self.pointer_button_display(self.on_tool_airbrush_value, key),
            "on_tool_finger_value" => self.pointer_button_display(self.on_tool_finger_value, key),
            "on_tool_lens_value" => self.pointer_button_display(self.on_tool_lens_value, key),
            "on_tool_mouse_value" => self.pointer_button_display(self.on_tool_mouse_value, key),
            "on_tool_button1_value" => self.pointer_button_display(self.on_tool_button1_value, key),
            "on_tool_button2_value" => self.pointer_button_display(self.on_tool_button2_value, key),
            "on_tool_button3_value" => self.pointer_button_display(self.on_tool_button3_value, key),
            _ => return None,
        })
    }

    fn pointer_button_display(&self, value: Option<PressedButton>, key: &str) -> String {
        value
            .or_else(|| pointer_button_default(key))
            .map(|b| b.as_ordinal().to_string())
            .unwrap_or_default()
    }

    /// Set a key from its string wire/file representation, applying documented clamps.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        macro_rules! bool_key {
            ($field:ident) => {{
                self.$field = parse_bool(value).ok_or_else(|| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }};
        }

        // `-1` restores the device-specific default; anything past the
        // third button (ordinal 2) is rejected, mirroring the clamp on
        // the original `pointer_*`/`on_tool_*` setters.
        macro_rules! pointer_key {
            ($field:ident) => {{
                let ordinal: i32 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                self.$field = if ordinal == -1 {
                    None
                } else {
                    Some(PressedButton::from_ordinal(ordinal).ok_or_else(|| {
                        ConfigError::InvalidValue {
                            key: key.to_string(),
                            value: value.to_string(),
                        }
                    })?)
                };
            }};
        }

        match key {
            "breeding" => bool_key!(breeding),
            "dragging" => bool_key!(dragging),
            "ie_interactions" => bool_key!(ie_interactions),
            "ie_throwing" => bool_key!(ie_throwing),
            "cursor_data" => bool_key!(cursor_data),
            "allow_dismiss_animations" => bool_key!(allow_dismiss_animations),
            "per_mascot_interactions" => bool_key!(per_mascot_interactions),
            "unified_outputs" => bool_key!(unified_outputs),
            "allow_dragging_multihead" => bool_key!(allow_dragging_multihead),
            "allow_throwing_multihead" => bool_key!(allow_throwing_multihead),
            "tablets_enabled" => bool_key!(tablets_enabled),
            "pointer_left_value" => pointer_key!(pointer_left_value),
            "pointer_right_value" => pointer_key!(pointer_right_value),
            "pointer_middle_value" => pointer_key!(pointer_middle_value),
            "on_tool_pen_value" => pointer_key!(on_tool_pen_value),
            "on_tool_eraser_value" => pointer_key!(on_tool_eraser_value),
            "on_tool_brush_value" => pointer_key!(on_tool_brush_value),
            "on_tool_pencil_value" => pointer_key!(on_tool_pencil_value),
            "on_tool_airbrush_value" => pointer_key!(on_tool_airbrush_value),
            "on_tool_finger_value" => pointer_key!(on_tool_finger_value),
            "on_tool_lens_value" => pointer_key!(on_tool_lens_value),
            "on_tool_mouse_value" => pointer_key!(on_tool_mouse_value),
            "on_tool_button1_value" => pointer_key!(on_tool_button1_value),
            "on_tool_button2_value" => pointer_key!(on_tool_button2_value),
            "on_tool_button3_value" => pointer_key!(on_tool_button3_value),
            "mascot_limit" => {
                self.mascot_limit = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "ie_throw_policy" => {
                self.ie_throw_policy = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "overlay_layer" => {
                self.overlay_layer = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
            }
            "interpolation_framerate" => {
                self.interpolation_framerate =
                    value.parse().map_err(|_| ConfigError::InvalidValue {
                        key: key.to_string(),
                        value: value.to_string(),
                    })?;
            }
            "mascot_opacity" => {
                let v: f32 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                self.mascot_opacity = clampf(v, 0.0, 1.0);
            }
            "mascot_scale" => {
                let v: f32 = value.parse().map_err(|_| ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: value.to_string(),
                })?;
                self.mascot_scale = clampf(v, 0.25, 2.0);
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comments_and_whitespace() {
        let cfg = Config::parse(
            "\n# a comment\n  breeding = false # inline comment\nmascot_limit=10\n",
        )
        .unwrap();
        assert!(!cfg.breeding);
        assert_eq!(cfg.mascot_limit, 10);
    }

    #[test]
    fn clamps_opacity_and_scale() {
        let mut cfg = Config::default();
        cfg.set("mascot_opacity", "5.0").unwrap();
        assert_eq!(cfg.mascot_opacity, 1.0);
        cfg.set("mascot_scale", "0.0").unwrap();
        assert_eq!(cfg.mascot_scale, 0.25);
    }

    #[test]
    fn rejects_unknown_key() {
        let mut cfg = Config::default();
        assert!(matches!(
            cfg.set("not_a_key", "1"),
            Err(ConfigError::UnknownKey(_))
        ));
    }

    #[test]
    fn boolean_synonyms() {
        let cfg = Config::parse("dragging=off\nbreeding=yes\n").unwrap();
        assert!(!cfg.dragging);
        assert!(cfg.breeding);
    }

    #[test]
    fn pointer_button_keys_resolve_device_specific_default_until_set() {
        let cfg = Config::default();
        assert_eq!(cfg.get("pointer_left_value").unwrap(), "0");
        assert_eq!(cfg.get("pointer_right_value").unwrap(), "1");
        assert_eq!(cfg.get("pointer_middle_value").unwrap(), "2");
        assert_eq!(cfg.get("on_tool_button1_value").unwrap(), "1");
    }

    #[test]
    fn pointer_button_keys_accept_an_explicit_ordinal_and_reject_past_middle() {
        let mut cfg = Config::default();
        cfg.set("on_tool_pen_value", "2").unwrap();
        assert_eq!(cfg.get("on_tool_pen_value").unwrap(), "2");
        assert!(cfg.set("on_tool_pen_value", "3").is_err());
    }

    #[test]
    fn pointer_button_key_minus_one_restores_the_default() {
        let mut cfg = Config::default();
        cfg.set("pointer_left_value", "1").unwrap();
        cfg.set("pointer_left_value", "-1").unwrap();
        assert_eq!(cfg.get("pointer_left_value").unwrap(), "0");
    }
}
