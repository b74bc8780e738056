//! Platform abstraction layer.
//!
//! Defines the three capabilities the engine consumes: `LineIo` (read and
//! configure digital lines), `VirtualPad` (write button events and sync
//! markers), and `ShutdownRequester`. The Linux backend in `linux` drives
//! real hardware; `fake` provides in-memory doubles for tests.

use std::fmt;

use thiserror::Error;

#[cfg(test)]
pub mod fake;
#[cfg(target_os = "linux")]
pub mod linux;
pub mod shutdown;

use crate::buttons::Button;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum PlatformError {
    /// SoC GPIO controller could not be opened or a pin is unavailable.
    #[error("gpio: {0}")]
    Gpio(String),
    /// Transfer on the SPI bus to the GPIO expander failed.
    #[error("spi bus: {0}")]
    Bus(String),
    /// The uinput device could not be created or written.
    #[error("virtual device: {0}")]
    Device(#[from] std::io::Error),
    /// Address does not correspond to any line this board exposes.
    #[error("line {0} is not wired on this board")]
    UnknownLine(LineAddress),
    #[error("shutdown request: {0}")]
    Shutdown(String),
}

// ---------------------------------------------------------------------------
// Line addressing
// ---------------------------------------------------------------------------

/// Lines at or above this index live on the GPIO expander.
pub const EXPANDER_BASE: u16 = 100;

/// Integer line index in the board's flat numbering.
///
/// Indices below `EXPANDER_BASE` are SoC GPIO numbers; indices from
/// `EXPANDER_BASE` upwards are expander pins offset by the base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineAddress(pub u16);

/// Where a `LineAddress` physically resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLocation {
    Soc(u8),
    Expander(u8),
}

impl LineAddress {
    pub fn location(self) -> Result<LineLocation, PlatformError> {
        match self.0 {
            n if n >= EXPANDER_BASE => u8::try_from(n - EXPANDER_BASE)
                .ok()
                .filter(|pin| *pin < 16)
                .map(LineLocation::Expander)
                .ok_or(PlatformError::UnknownLine(self)),
            n => u8::try_from(n)
                .map(LineLocation::Soc)
                .map_err(|_| PlatformError::UnknownLine(self)),
        }
    }
}

impl fmt::Display for LineAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Line configuration
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    pub fn from_bool(high: bool) -> Self {
        if high { Level::High } else { Level::Low }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pull {
    None,
    Up,
}

// ---------------------------------------------------------------------------
// Capabilities
// ---------------------------------------------------------------------------

/// Register-level access to the board's digital lines.
pub trait LineIo {
    fn configure(
        &mut self,
        line: LineAddress,
        direction: Direction,
        pull: Pull,
    ) -> Result<(), PlatformError>;

    /// Instantaneous logic level of `line`.
    fn read(&mut self, line: LineAddress) -> Result<Level, PlatformError>;

    fn write(&mut self, line: LineAddress, level: Level) -> Result<(), PlatformError>;
}

/// A registered virtual game controller.
///
/// Events written with `write_event` are not visible to consumers until
/// `write_sync` commits them as one report.
pub trait VirtualPad {
    fn write_event(&mut self, button: Button, pressed: bool) -> Result<(), PlatformError>;
    fn write_sync(&mut self) -> Result<(), PlatformError>;
}

/// Why the engine is asking the system to power off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    LowBattery,
    PowerSwitch,
}

impl fmt::Display for ShutdownReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownReason::LowBattery => f.write_str("critically low battery"),
            ShutdownReason::PowerSwitch => f.write_str("power switch toggled"),
        }
    }
}

/// Fire-and-forget system shutdown request.
pub trait ShutdownRequester {
    fn request(&mut self, reason: ShutdownReason) -> Result<(), PlatformError>;
}
