//! In-memory doubles for the platform capabilities.

use std::collections::HashMap;

use super::{
    Direction, LineAddress, Level, LineIo, PlatformError, Pull, ShutdownReason,
    ShutdownRequester, VirtualPad,
};
use crate::buttons::{Button, ButtonEvent};

/// A configure or write call, in the order `FakeLines` received it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineOp {
    Configure(LineAddress, Direction),
    Write(LineAddress, Level),
}

/// Line levels held in a map. Unset lines read high, like a pulled-up input.
#[derive(Default)]
pub struct FakeLines {
    pub levels: HashMap<LineAddress, Level>,
    pub configured: Vec<(LineAddress, Direction, Pull)>,
    pub writes: Vec<(LineAddress, Level)>,
    pub ops: Vec<LineOp>,
    /// Any operation touching this line fails with a bus error.
    pub broken: Option<LineAddress>,
}

impl FakeLines {
    pub fn set(&mut self, line: u16, level: Level) {
        self.levels.insert(LineAddress(line), level);
    }

    fn check(&self, line: LineAddress) -> Result<(), PlatformError> {
        if self.broken == Some(line) {
            Err(PlatformError::Bus(format!("line {line} unreachable")))
        } else {
            Ok(())
        }
    }
}

impl LineIo for FakeLines {
    fn configure(
        &mut self,
        line: LineAddress,
        direction: Direction,
        pull: Pull,
    ) -> Result<(), PlatformError> {
        self.check(line)?;
        self.configured.push((line, direction, pull));
        self.ops.push(LineOp::Configure(line, direction));
        Ok(())
    }

    fn read(&mut self, line: LineAddress) -> Result<Level, PlatformError> {
        self.check(line)?;
        Ok(self.levels.get(&line).copied().unwrap_or(Level::High))
    }

    fn write(&mut self, line: LineAddress, level: Level) -> Result<(), PlatformError> {
        self.check(line)?;
        self.levels.insert(line, level);
        self.writes.push((line, level));
        self.ops.push(LineOp::Write(line, level));
        Ok(())
    }
}

/// What a `RecordingPad` saw, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PadWrite {
    Button(ButtonEvent),
    Sync,
}

#[derive(Default)]
pub struct RecordingPad {
    pub writes: Vec<PadWrite>,
    pub fail_writes: bool,
}

impl RecordingPad {
    pub fn syncs(&self) -> usize {
        self.writes.iter().filter(|w| **w == PadWrite::Sync).count()
    }

    pub fn buttons(&self) -> Vec<ButtonEvent> {
        self.writes
            .iter()
            .filter_map(|w| match w {
                PadWrite::Button(ev) => Some(*ev),
                PadWrite::Sync => None,
            })
            .collect()
    }
}

impl VirtualPad for RecordingPad {
    fn write_event(&mut self, button: Button, pressed: bool) -> Result<(), PlatformError> {
        if self.fail_writes {
            return Err(PlatformError::Device(std::io::Error::other("device gone")));
        }
        self.writes.push(PadWrite::Button(ButtonEvent { button, pressed }));
        Ok(())
    }

    fn write_sync(&mut self) -> Result<(), PlatformError> {
        if self.fail_writes {
            return Err(PlatformError::Device(std::io::Error::other("device gone")));
        }
        self.writes.push(PadWrite::Sync);
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingShutdown {
    pub requests: Vec<ShutdownReason>,
    pub fail: bool,
}

impl ShutdownRequester for RecordingShutdown {
    fn request(&mut self, reason: ShutdownReason) -> Result<(), PlatformError> {
        self.requests.push(reason);
        if self.fail {
            Err(PlatformError::Shutdown("transport down".into()))
        } else {
            Ok(())
        }
    }
}
