// SPDX-License-Identifier: GPL-3.0-or-later

//! Pointer Arbiter: a single process-wide pointer record, shared
//! across mouse/pen/touch devices, that tracks capture and hands drag
//! start/end transitions to agents.
//!
//! The record is writer-single (the input layer) / reader-many (agents
//! during tick); consistency is achieved by sampling a snapshot once per
//! tick rather than locking per-read.

use super::SurfaceId;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Mouse,
    Pen,
    Eraser,
    Touch,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub left: bool,
    pub right: bool,
    pub middle: bool,
}

/// A tick-boundary snapshot of pointer state, handed to agents during a tick
/// so every agent observes the same pointer position for the whole tick.
#[derive(Debug, Clone, Copy)]
pub struct PointerSnapshot {
    pub x: i32,
    pub y: i32,
    pub device: DeviceType,
    pub buttons: ButtonState,
    pub grabbed_surface: Option<SurfaceId>,
}

/// Outcome of a drag release, handed to the agent's `drag_end`.
#[derive(Debug, Clone, Copy)]
pub struct ReleaseDelta {
    pub dx: i32,
    pub dy: i32,
    pub ticks: u64,
    pub out_of_bounds: bool,
}

struct DragState {
    surface: SurfaceId,
    press_x: i32,
    press_y: i32,
    press_tick: u64,
    last_x: i32,
    last_y: i32,
    idle_since: u64,
}

/// The single process-wide pointer record. Only the input layer mutates it;
/// agents read it through [`PointerArbiter::snapshot`].
pub struct PointerArbiter {
    x: i32,
    y: i32,
    device: DeviceType,
    buttons: ButtonState,
    drag: Option<DragState>,
    selection_mode: bool,
}

/// A drag is considered "idle" (eligible for probabilistic exit) once this
/// many ticks pass with no motion past [`IDLE_MOTION_THRESHOLD`].
pub const IDLE_TICK_WINDOW: u64 = 250;
pub const IDLE_MOTION_THRESHOLD: i32 = 5;

impl Default for PointerArbiter {
    fn default() -> Self {
        PointerArbiter {
            x: 0,
            y: 0,
            device: DeviceType::Mouse,
            buttons: ButtonState::default(),
            drag: None,
            selection_mode: false,
        }
    }
}

impl PointerArbiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a raw input motion event. Does not itself drive drag state;
    /// callers invoke `drag_start`/`drag_end` from hit-testing logic.
    pub fn motion(&mut self, x: i32, y: i32, device: DeviceType, tick: u64) {
        self.x = x;
        self.y = y;
        self.device = device;
        if let Some(drag) = &mut self.drag {
            if (x - drag.last_x).abs() >= IDLE_MOTION_THRESHOLD
                || (y - drag.last_y).abs() >= IDLE_MOTION_THRESHOLD
            {
                drag.idle_since = tick;
            }
            drag.last_x = x;
            drag.last_y = y;
        }
    }

    pub fn press(&mut self, button: PressedButton, device: DeviceType) {
        self.device = device;
        match button {
            PressedButton::Left => self.buttons.left = true,
            PressedButton::Right => self.buttons.right = true,
            PressedButton::Middle => self.buttons.middle = true,
        }
    }

    pub fn release(&mut self, button: PressedButton) {
        match button {
            PressedButton::Left => self.buttons.left = false,
            PressedButton::Right => self.buttons.right = false,
            PressedButton::Middle => self.buttons.middle = false,
        }
    }

    pub fn is_grabbing(&self) -> bool {
        self.drag.is_some()
    }

    pub fn grabbed_surface(&self) -> Option<SurfaceId> {
        self.drag.as_ref().map(|d| d.surface)
    }

    /// Begin capturing `surface` for dragging. No-op (returns `false`) if
    /// already grabbing something.
    pub fn drag_start(&mut self, surface: SurfaceId, tick: u64) -> bool {
        if self.drag.is_some() {
            return false;
        }
        self.drag = Some(DragState {
            surface,
            press_x: self.x,
            press_y: self.y,
            press_tick: tick,
            last_x: self.x,
            last_y: self.y,
            idle_since: tick,
        });
        true
    }

    /// Whether the active drag has been idle (no motion ≥5px) long enough to
    /// become eligible for probabilistic release.
    pub fn is_idle(&self, tick: u64) -> bool {
        match &self.drag {
            Some(d) => tick.saturating_sub(d.idle_since) >= IDLE_TICK_WINDOW,
            None => false,
        }
    }

    /// Release the current drag, tagging it thrown or dropped. Returns
    /// `None` if nothing was being dragged.
    pub fn drag_end(
        &mut self,
        tick: u64,
        workarea_contains: impl Fn(i32, i32) -> bool,
    ) -> Option<ReleaseDelta> {
        let drag = self.drag.take()?;
        Some(ReleaseDelta {
            dx: self.x - drag.press_x,
            dy: self.y - drag.press_y,
            ticks: tick.saturating_sub(drag.press_tick).max(1),
            out_of_bounds: !workarea_contains(self.x, self.y),
        })
    }

    pub fn set_selection_mode(&mut self, enabled: bool) {
        self.selection_mode = enabled;
    }

    pub fn selection_mode(&self) -> bool {
        self.selection_mode
    }

    /// Take a consistent snapshot for one tick's worth of agent reads.
    pub fn snapshot(&self) -> PointerSnapshot {
        PointerSnapshot {
            x: self.x,
            y: self.y,
            device: self.device,
            buttons: self.buttons,
            grabbed_surface: self.drag.as_ref().map(|d| d.surface),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressedButton {
    Left,
    Right,
    Middle,
}

impl PressedButton {
    /// Decodes the `0/1/2` ordinal a `pointer_*_value`/`on_tool_*_value`
    /// configuration key is stored as. `None` for anything past the third
    /// button.
    pub fn from_ordinal(value: i32) -> Option<Self> {
        match value {
            0 => Some(PressedButton::Left),
            1 => Some(PressedButton::Right),
            2 => Some(PressedButton::Middle),
            _ => None,
        }
    }

    pub fn as_ordinal(self) -> i32 {
        match self {
            PressedButton::Left => 0,
            PressedButton::Right => 1,
            PressedButton::Middle => 2,
        }
    }
}

impl FromStr for PressedButton {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, ()> {
        Ok(match s {
            "left" => PressedButton::Left,
            "right" => PressedButton::Right,
            "middle" => PressedButton::Middle,
            _ => return Err(()),
        })
    }
}

impl fmt::Display for PressedButton {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PressedButton::Left => "left",
            PressedButton::Right => "right",
            PressedButton::Middle => "middle",
        };
        f.write_str(s)
    }
}

/// A stylus/tablet tool or auxiliary button identifier that can be remapped
/// to a virtual pointer button through the `on_tool_*` configuration keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Pen,
    Eraser,
    Brush,
    Pencil,
    Airbrush,
    Finger,
    Lens,
    Mouse,
    Button1,
    Button2,
    Button3,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn drag_start_refuses_second_capture() {
        let mut p = PointerArbiter::new();
        assert!(p.drag_start(1, 0));
        assert!(!p.drag_start(2, 0));
        assert_eq!(p.grabbed_surface(), Some(1));
    }

    #[test]
    fn drag_end_computes_delta_and_clears_capture() {
        let mut p = PointerArbiter::new();
        p.drag_start(1, 0);
        p.motion(600, 400, DeviceType::Mouse, 5);
        let delta = p.drag_end(5, |_, _| true).unwrap();
        assert_eq!((delta.dx, delta.dy), (600, 400));
        assert!(!delta.out_of_bounds);
        assert!(!p.is_grabbing());
    }

    #[test]
    fn idle_window_requires_250_stalled_ticks() {
        let mut p = PointerArbiter::new();
        p.drag_start(1, 0);
        assert!(!p.is_idle(100));
        assert!(p.is_idle(250));
    }

    #[test]
    fn motion_past_threshold_resets_idle_clock() {
        let mut p = PointerArbiter::new();
        p.drag_start(1, 0);
        p.motion(10, 0, DeviceType::Mouse, 200);
        assert!(!p.is_idle(400));
        assert!(p.is_idle(451));
    }
}
