//! Input line registry.
//!
//! Binds each monitored physical line to its role and holds the current and
//! previous samples the engine compares. All inputs are active-low: the line
//! is pulled up and a closed switch pulls it to ground.
//!
//! Board wiring (MCP23S17 pins are numbered from `EXPANDER_BASE`):
//!
//! ```text
//!  100 low-battery alert    108 amplifier enable (out)
//!  101 LCD chip select (out) 109 B (south)
//!  102 Wi-Fi enable (out)   110 A (east)
//!  103 left                 111 X (north)
//!  104 up                   112 Y (west)
//!  105 right                113 start
//!  106 down                 114 select
//!  107 L1                   115 R1
//!   25 power switch (SoC GPIO)
//! ```

use crate::buttons::Button;
use crate::platform::{Direction, LineAddress, Level, LineIo, PlatformError, Pull};

/// What a monitored input line means to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRole {
    Button(Button),
    PowerSwitch,
    LowBattery,
}

/// Static description of one monitored input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineSpec {
    pub name: &'static str,
    pub address: LineAddress,
    pub role: LineRole,
}

const fn line(name: &'static str, address: u16, role: LineRole) -> LineSpec {
    LineSpec {
        name,
        address: LineAddress(address),
        role,
    }
}

/// Button lines, indexed by `Button::index`.
pub const BUTTON_LINES: [LineSpec; 12] = [
    line("up", 104, LineRole::Button(Button::DpadUp)),
    line("down", 106, LineRole::Button(Button::DpadDown)),
    line("left", 103, LineRole::Button(Button::DpadLeft)),
    line("right", 105, LineRole::Button(Button::DpadRight)),
    line("x", 111, LineRole::Button(Button::North)),
    line("b", 109, LineRole::Button(Button::South)),
    line("y", 112, LineRole::Button(Button::West)),
    line("a", 110, LineRole::Button(Button::East)),
    line("start", 113, LineRole::Button(Button::Start)),
    line("select", 114, LineRole::Button(Button::Select)),
    line("l1", 107, LineRole::Button(Button::L1)),
    line("r1", 115, LineRole::Button(Button::R1)),
];

pub const POWER_SWITCH_LINE: LineSpec = line("power-switch", 25, LineRole::PowerSwitch);
pub const LOW_BATTERY_LINE: LineSpec = line("low-battery", 100, LineRole::LowBattery);

// ---------------------------------------------------------------------------
// Auxiliary outputs
// ---------------------------------------------------------------------------

/// Board feature lines driven by this process. All start high.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuxOutput {
    /// High keeps the LCD off the shared SPI bus.
    LcdChipSelect,
    WifiEnable,
    AmpEnable,
}

impl AuxOutput {
    pub const ALL: [AuxOutput; 3] = [
        AuxOutput::LcdChipSelect,
        AuxOutput::WifiEnable,
        AuxOutput::AmpEnable,
    ];

    pub fn address(self) -> LineAddress {
        match self {
            AuxOutput::LcdChipSelect => LineAddress(101),
            AuxOutput::WifiEnable => LineAddress(102),
            AuxOutput::AmpEnable => LineAddress(108),
        }
    }
}

// ---------------------------------------------------------------------------
// Sampled state
// ---------------------------------------------------------------------------

/// One monitored line and its last two samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputLine {
    pub spec: LineSpec,
    pub current: Level,
    pub previous: Level,
}

impl InputLine {
    fn new(spec: LineSpec) -> Self {
        // Released until the first sample says otherwise.
        Self {
            spec,
            current: Level::High,
            previous: Level::High,
        }
    }

    /// Active-low: the switch is closed when the line reads low.
    pub fn is_active(&self) -> bool {
        self.current == Level::Low
    }

    pub fn changed(&self) -> bool {
        self.current != self.previous
    }
}

/// Every monitored input: 12 buttons, the power switch and the battery alert.
#[derive(Debug, Clone)]
pub struct LineRegistry {
    buttons: Vec<InputLine>,
    power_switch: InputLine,
    low_battery: InputLine,
}

impl Default for LineRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LineRegistry {
    pub fn new() -> Self {
        Self {
            buttons: BUTTON_LINES.iter().copied().map(InputLine::new).collect(),
            power_switch: InputLine::new(POWER_SWITCH_LINE),
            low_battery: InputLine::new(LOW_BATTERY_LINE),
        }
    }

    pub fn button(&self, button: Button) -> &InputLine {
        &self.buttons[button.index()]
    }

    pub fn lines(&self) -> impl Iterator<Item = &InputLine> {
        self.buttons
            .iter()
            .chain([&self.power_switch, &self.low_battery])
    }

    fn lines_mut(&mut self) -> impl Iterator<Item = &mut InputLine> {
        self.buttons
            .iter_mut()
            .chain([&mut self.power_switch, &mut self.low_battery])
    }

    /// Sets every monitored line to a pulled-up input and drives the
    /// auxiliary outputs high. Any failure is returned as-is; the caller
    /// must not start sampling with a partially configured board.
    pub fn configure(&self, io: &mut dyn LineIo) -> Result<(), PlatformError> {
        for line in self.lines() {
            io.configure(line.spec.address, Direction::Input, Pull::Up)?;
            log::debug!(
                "registry: {} on line {} is input, pull-up",
                line.spec.name,
                line.spec.address
            );
        }

        // Latch high before switching direction so the enables never glitch low.
        for output in AuxOutput::ALL {
            io.write(output.address(), Level::High)?;
            io.configure(output.address(), Direction::Output, Pull::None)?;
            log::debug!("registry: {output:?} on line {} driven high", output.address());
        }

        log::info!(
            "registry: configured {} inputs and {} outputs",
            self.lines().count(),
            AuxOutput::ALL.len()
        );
        Ok(())
    }

    /// Moves every current sample into the previous slot.
    pub fn snapshot(&mut self) {
        for line in self.lines_mut() {
            line.previous = line.current;
        }
    }

    /// Reads the instantaneous level of every line into `current`.
    pub fn sample(&mut self, io: &mut dyn LineIo) -> Result<(), PlatformError> {
        for line in self.lines_mut() {
            line.current = io.read(line.spec.address)?;
        }
        Ok(())
    }
}
