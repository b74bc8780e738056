//! The twelve physical controller buttons.
//!
//! `Button` is the canonical identity used by the registry and the engine.
//! Mapping to Linux input codes lives in `platform::linux::keycodes`.

use std::fmt;

/// A digital button on the handheld's front panel or shoulders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    /// X on the silkscreen.
    North,
    /// B on the silkscreen.
    South,
    /// Y on the silkscreen.
    West,
    /// A on the silkscreen.
    East,
    Start,
    Select,
    L1,
    R1,
}

impl Button {
    /// Every button, in the order events are emitted within a frame.
    pub const ALL: [Button; 12] = [
        Button::DpadUp,
        Button::DpadDown,
        Button::DpadLeft,
        Button::DpadRight,
        Button::North,
        Button::South,
        Button::West,
        Button::East,
        Button::Start,
        Button::Select,
        Button::L1,
        Button::R1,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Button::DpadUp => "up",
            Button::DpadDown => "down",
            Button::DpadLeft => "left",
            Button::DpadRight => "right",
            Button::North => "x",
            Button::South => "b",
            Button::East => "a",
            Button::West => "y",
            Button::Start => "start",
            Button::Select => "select",
            Button::L1 => "l1",
            Button::R1 => "r1",
        }
    }

    /// Position in `ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Button {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One synthesized button transition, waiting for the frame's sync marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonEvent {
    pub button: Button,
    pub pressed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn all_lists_each_button_once() {
        let unique: HashSet<Button> = Button::ALL.iter().copied().collect();
        assert_eq!(unique.len(), Button::ALL.len());
    }

    #[test]
    fn index_matches_position_in_all() {
        for (i, button) in Button::ALL.iter().enumerate() {
            assert_eq!(button.index(), i);
        }
    }

    #[test]
    fn names_are_unique() {
        let names: HashSet<&str> = Button::ALL.iter().map(|b| b.name()).collect();
        assert_eq!(names.len(), 12);
    }
}
