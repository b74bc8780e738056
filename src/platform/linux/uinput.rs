//! Virtual game controller via /dev/uinput.
//!
//! `UinputPad` implements `VirtualPad`. Button events are buffered and
//! written as one batch when `write_sync` is called; evdev terminates each
//! batch with a single `SYN_REPORT`, so consumers see one atomic report per
//! loop iteration.
//!
//! Required permissions: write access to /dev/uinput (root, or a udev rule
//! granting the `input` group access).

use evdev::uinput::{VirtualDevice, VirtualDeviceBuilder};
use evdev::{
    AbsInfo, AbsoluteAxisType, AttributeSet, BusType, EventType, InputEvent, InputId, Key,
    UinputAbsSetup,
};

use super::keycodes::button_to_key;
use crate::buttons::Button;
use crate::platform::{PlatformError, VirtualPad};

pub const DEVICE_NAME: &str = "Gamegirl Controller";

/// Bus, vendor, product, version reported to the input stack.
const DEVICE_ID: (BusType, u16, u16, u16) = (BusType::BUS_USB, 1, 1, 1);

/// Range of the two declared absolute axes. The board has no analog stick;
/// the axes exist so front-ends classify the device as a joystick.
const AXIS_MIN: i32 = 0;
const AXIS_MAX: i32 = 4;

pub struct UinputPad {
    device: VirtualDevice,
    pending: Vec<InputEvent>,
}

impl UinputPad {
    /// Creates the uinput device with the twelve button codes and the two
    /// unused axes. The device disappears when the pad is dropped.
    pub fn register() -> Result<Self, PlatformError> {
        let mut keys = AttributeSet::<Key>::new();
        for button in Button::ALL {
            keys.insert(button_to_key(button));
        }

        let axis = |code| UinputAbsSetup::new(code, AbsInfo::new(0, AXIS_MIN, AXIS_MAX, 0, 0, 0));
        let (bus, vendor, product, version) = DEVICE_ID;

        let device = VirtualDeviceBuilder::new()?
            .name(DEVICE_NAME)
            .input_id(InputId::new(bus, vendor, product, version))
            .with_keys(&keys)?
            .with_absolute_axis(&axis(AbsoluteAxisType::ABS_X))?
            .with_absolute_axis(&axis(AbsoluteAxisType::ABS_Y))?
            .build()?;

        log::info!(
            "uinput: registered {DEVICE_NAME:?} with {} buttons",
            Button::ALL.len()
        );
        Ok(Self {
            device,
            pending: Vec::with_capacity(Button::ALL.len()),
        })
    }
}

impl VirtualPad for UinputPad {
    fn write_event(&mut self, button: Button, pressed: bool) -> Result<(), PlatformError> {
        self.pending.push(key_event(button, pressed));
        Ok(())
    }

    fn write_sync(&mut self) -> Result<(), PlatformError> {
        // `emit` appends the SYN_REPORT, including for an empty batch.
        let result = self.device.emit(&self.pending);
        self.pending.clear();
        result.map_err(PlatformError::from)
    }
}

fn key_event(button: Button, pressed: bool) -> InputEvent {
    InputEvent::new(EventType::KEY, button_to_key(button).code(), i32::from(pressed))
}
