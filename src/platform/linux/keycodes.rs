//! Button to Linux input code mapping.
//!
//! Codes come from the gamepad block of `linux/input-event-codes.h`, so the
//! virtual device is recognised as a joystick with a standard layout.

use evdev::Key;

use crate::buttons::Button;

/// Returns the evdev key the virtual controller reports for `button`.
pub fn button_to_key(button: Button) -> Key {
    match button {
        Button::DpadUp => Key::BTN_DPAD_UP,
        Button::DpadDown => Key::BTN_DPAD_DOWN,
        Button::DpadLeft => Key::BTN_DPAD_LEFT,
        Button::DpadRight => Key::BTN_DPAD_RIGHT,
        Button::North => Key::BTN_NORTH,
        Button::South => Key::BTN_SOUTH,
        Button::East => Key::BTN_EAST,
        Button::West => Key::BTN_WEST,
        Button::Start => Key::BTN_START,
        Button::Select => Key::BTN_SELECT,
        Button::L1 => Key::BTN_TL,
        Button::R1 => Key::BTN_TR,
    }
}
