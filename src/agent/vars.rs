// SPDX-License-Identifier: GPL-3.0-or-later

//! The fixed local-variable catalogue: slots 0-23 of an agent's
//! 128-slot local-variable table have fixed runtime semantics; slots 24-127
//! are free for a prototype's own named variables.

use crate::prototype::LocalVarKind;

pub const MAX_LOCALS: usize = 128;
pub const FIXED_SLOT_COUNT: usize = 24;

macro_rules! fixed_slots {
    ($($id:expr => $name:ident, $kind:ident;)*) => {
        pub mod slot {
            $(pub const $name: u8 = $id;)*
        }

        pub const FIXED_SLOTS: [(&str, LocalVarKind); FIXED_SLOT_COUNT] = [
            $((stringify!($name), LocalVarKind::$kind),)*
        ];
    };
}

fixed_slots! {
    0  => X, Int;
    1  => Y, Int;
    2  => TargetX, Int;
    3  => TargetY, Int;
    4  => Gravity, Float;
    5  => LookingRight, Int;
    6  => AirDragX, Float;
    7  => AirDragY, Float;
    8  => VelocityX, Float;
    9  => VelocityY, Float;
    10 => BornX, Int;
    11 => BornY, Int;
    12 => InitialVelX, Float;
    13 => InitialVelY, Float;
    14 => VelocityParam, Float;
    15 => FootX, Int;
    16 => FootDX, Int;
    17 => ModX, Int;
    18 => ModY, Int;
    19 => Gap, Int;
    20 => BornInterval, Int;
    21 => BornCount, Int;
    22 => IEOffsetX, Int;
    23 => IEOffsetY, Int;
}

/// Resolve a fixed-slot name (e.g. `"VelocityX"`) to its slot index.
/// Package-defined (non-fixed) variable names are resolved by the loader
/// against the prototype's own local-variable table instead.
pub fn slot_for_name(name: &str) -> Option<u8> {
    FIXED_SLOTS
        .iter()
        .position(|(n, _)| *n == name)
        .map(|i| i as u8)
}

pub fn name_for_slot(slot: u8) -> Option<&'static str> {
    FIXED_SLOTS.get(slot as usize).map(|(n, _)| *n)
}

/// Default value for `VelocityParam` when a package never seeds it
/// (`original_source/src/actions/jump.c`).
pub const DEFAULT_VELOCITY_PARAM: f32 = 20.0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_constants_match_the_fixed_catalogue_order() {
        assert_eq!(slot::X, 0);
        assert_eq!(slot::VelocityY, 9);
        assert_eq!(slot::IEOffsetY, 23);
    }

    #[test]
    fn name_lookup_round_trips() {
        assert_eq!(slot_for_name("Gravity"), Some(slot::Gravity));
        assert_eq!(name_for_slot(slot::Gravity), Some("Gravity"));
        assert_eq!(slot_for_name("NoSuchVar"), None);
    }
}
