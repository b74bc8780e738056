//! Linux platform backend.
//!
//! Lines: Raspberry Pi SoC GPIO plus an MCP23S17 expander on SPI, both via
//! `rppal`, behind `BoardLines`.
//! Controller: a uinput virtual device via `evdev`, behind `UinputPad`.

mod board;
mod keycodes;
mod mcp23s17;
mod uinput;

use rppal::spi::{Bus, Mode, SlaveSelect, Spi};

use board::BoardLines;
use mcp23s17::Mcp23s17;
use uinput::UinputPad;

use crate::config::ExpanderConfig;
use crate::platform::{LineIo, PlatformError, VirtualPad};

// ---------------------------------------------------------------------------
// Factory: board lines
// ---------------------------------------------------------------------------

/// Opens the expander's SPI bus and the SoC GPIO controller.
///
/// Requires access to /dev/spidev* and /dev/gpiomem.
pub fn create_line_io(config: &ExpanderConfig) -> Result<Box<dyn LineIo>, PlatformError> {
    let spi = Spi::new(
        spi_bus(config.spi_bus)?,
        slave_select(config.chip_select)?,
        config.clock_hz,
        Mode::Mode0,
    )
    .map_err(|e| PlatformError::Bus(e.to_string()))?;
    log::debug!(
        "expander: spi{}.{} at {} Hz",
        config.spi_bus,
        config.chip_select,
        config.clock_hz
    );

    let expander = Mcp23s17::new(spi, config.hardware_address)?;
    BoardLines::new(expander).map(|b| Box::new(b) as Box<dyn LineIo>)
}

// ---------------------------------------------------------------------------
// Factory: virtual controller
// ---------------------------------------------------------------------------

/// Registers the uinput controller.
pub fn create_virtual_pad() -> Result<Box<dyn VirtualPad>, PlatformError> {
    UinputPad::register().map(|p| Box::new(p) as Box<dyn VirtualPad>)
}

fn spi_bus(n: u8) -> Result<Bus, PlatformError> {
    match n {
        0 => Ok(Bus::Spi0),
        1 => Ok(Bus::Spi1),
        2 => Ok(Bus::Spi2),
        3 => Ok(Bus::Spi3),
        4 => Ok(Bus::Spi4),
        5 => Ok(Bus::Spi5),
        6 => Ok(Bus::Spi6),
        _ => Err(PlatformError::Bus(format!("no SPI bus {n}"))),
    }
}

fn slave_select(n: u8) -> Result<SlaveSelect, PlatformError> {
    match n {
        0 => Ok(SlaveSelect::Ss0),
        1 => Ok(SlaveSelect::Ss1),
        2 => Ok(SlaveSelect::Ss2),
        _ => Err(PlatformError::Bus(format!("no SPI chip select {n}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spi_bus_maps_valid_numbers() {
        assert_eq!(spi_bus(0).unwrap(), Bus::Spi0);
        assert_eq!(spi_bus(6).unwrap(), Bus::Spi6);
        assert!(spi_bus(7).is_err());
    }

    #[test]
    fn chip_select_beyond_two_is_rejected() {
        assert_eq!(slave_select(1).unwrap(), SlaveSelect::Ss1);
        assert!(slave_select(3).is_err());
    }
}
