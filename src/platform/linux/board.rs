//! Board line access: SoC GPIO for low indices, the expander above
//! `EXPANDER_BASE`.

use std::collections::HashMap;

use rppal::gpio::{self, Bias, Gpio, IoPin};

use super::mcp23s17::{Mcp23s17, SpiTransport};
use crate::platform::{Direction, LineAddress, LineIo, LineLocation, Level, PlatformError, Pull};

pub struct BoardLines<T> {
    expander: Mcp23s17<T>,
    gpio: Gpio,
    /// SoC pins claimed so far. Held for the process lifetime so their
    /// configuration is not reset on drop.
    soc_pins: HashMap<u8, IoPin>,
}

impl<T: SpiTransport> BoardLines<T> {
    pub fn new(expander: Mcp23s17<T>) -> Result<Self, PlatformError> {
        let gpio = Gpio::new().map_err(|e| PlatformError::Gpio(e.to_string()))?;
        Ok(Self {
            expander,
            gpio,
            soc_pins: HashMap::new(),
        })
    }

    fn soc_pin(&mut self, line: LineAddress, bcm: u8) -> Result<&mut IoPin, PlatformError> {
        if !self.soc_pins.contains_key(&bcm) {
            let mut pin = self
                .gpio
                .get(bcm)
                .map_err(|e| PlatformError::Gpio(format!("line {line}: {e}")))?
                .into_io(gpio::Mode::Input);
            pin.set_reset_on_drop(false);
            self.soc_pins.insert(bcm, pin);
        }
        self.soc_pins
            .get_mut(&bcm)
            .ok_or(PlatformError::UnknownLine(line))
    }
}

impl<T: SpiTransport> LineIo for BoardLines<T> {
    fn configure(
        &mut self,
        line: LineAddress,
        direction: Direction,
        pull: Pull,
    ) -> Result<(), PlatformError> {
        match line.location()? {
            LineLocation::Expander(pin) => {
                self.expander.set_direction(pin, direction)?;
                self.expander.set_pull(pin, pull)
            }
            LineLocation::Soc(bcm) => {
                let pin = self.soc_pin(line, bcm)?;
                pin.set_mode(match direction {
                    Direction::Input => gpio::Mode::Input,
                    Direction::Output => gpio::Mode::Output,
                });
                pin.set_bias(bias_for(pull));
                Ok(())
            }
        }
    }

    fn read(&mut self, line: LineAddress) -> Result<Level, PlatformError> {
        match line.location()? {
            LineLocation::Expander(pin) => self.expander.read_pin(pin),
            LineLocation::Soc(bcm) => {
                let level = self.soc_pin(line, bcm)?.read();
                Ok(Level::from_bool(level == gpio::Level::High))
            }
        }
    }

    fn write(&mut self, line: LineAddress, level: Level) -> Result<(), PlatformError> {
        match line.location()? {
            LineLocation::Expander(pin) => self.expander.write_pin(pin, level),
            LineLocation::Soc(bcm) => {
                self.soc_pin(line, bcm)?.write(match level {
                    Level::Low => gpio::Level::Low,
                    Level::High => gpio::Level::High,
                });
                Ok(())
            }
        }
    }
}

fn bias_for(pull: Pull) -> Bias {
    match pull {
        Pull::None => Bias::Off,
        Pull::Up => Bias::PullUp,
    }
}
