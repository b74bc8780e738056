//! Event synthesis loop.
//!
//! Each iteration snapshots and samples every monitored line, turns each
//! button transition into one virtual-button event, resolves the select
//! combos, checks the critical lines, and closes the batch with exactly one
//! sync marker. Decisions are made in `tick`, side effects in `commit`, so
//! the whole loop can be driven against in-memory fakes.

use std::convert::Infallible;
use std::time::Duration;

use crate::buttons::{Button, ButtonEvent};
use crate::lines::{AuxOutput, LineRegistry, LineRole};
use crate::pacer::Pacer;
use crate::platform::{
    Level, LineIo, PlatformError, ShutdownReason, ShutdownRequester, VirtualPad,
};

/// Target loop rate.
pub const TICK_HZ: u32 = 120;

/// Nominal iteration period (1/120 s).
pub const TICK_PERIOD: Duration = Duration::from_micros(1_000_000 / TICK_HZ as u64);

/// A combo may fire once the cooldown has counted up to this value, roughly
/// one second after the previous toggle. The counter saturates here.
pub const COMBO_COOLDOWN_TICKS: u32 = 119;

/// While a critical line stays active the shutdown request is repeated at
/// most this often.
pub const SHUTDOWN_RETRIGGER_TICKS: u32 = 120;

// ---------------------------------------------------------------------------
// Toggle state
// ---------------------------------------------------------------------------

/// Board feature switched by a select combo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Feature {
    Wifi,
    Amp,
}

impl Feature {
    fn output(self) -> AuxOutput {
        match self {
            Feature::Wifi => AuxOutput::WifiEnable,
            Feature::Amp => AuxOutput::AmpEnable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleState {
    pub wifi_enabled: bool,
    pub amp_enabled: bool,
    pub cooldown: u32,
}

impl Default for ToggleState {
    /// Both features are powered at boot; the first combo is available
    /// after one cooldown period.
    fn default() -> Self {
        Self {
            wifi_enabled: true,
            amp_enabled: true,
            cooldown: 0,
        }
    }
}

impl ToggleState {
    pub fn ready(&self) -> bool {
        self.cooldown >= COMBO_COOLDOWN_TICKS
    }

    /// Flips `feature`, restarts the cooldown and returns the new state.
    fn toggle(&mut self, feature: Feature) -> bool {
        let flag = match feature {
            Feature::Wifi => &mut self.wifi_enabled,
            Feature::Amp => &mut self.amp_enabled,
        };
        *flag = !*flag;
        self.cooldown = 0;
        *flag
    }

    fn advance(&mut self) {
        if self.cooldown < COMBO_COOLDOWN_TICKS {
            self.cooldown += 1;
        }
    }
}

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// Everything one iteration decided, before it is written out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Frame {
    pub events: Vec<ButtonEvent>,
    /// Feature flipped by a combo and its new enabled state.
    pub toggled: Option<(Feature, bool)>,
    /// Critical condition observed this iteration. Low battery wins when
    /// both lines are active.
    pub critical: Option<ShutdownReason>,
    /// Whether this iteration issues the shutdown request.
    pub request_shutdown: bool,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    lines: LineRegistry,
    toggles: ToggleState,
    combos_enabled: bool,
    /// Iterations since the last shutdown request while a critical
    /// condition has persisted; `None` when no condition is active.
    since_shutdown: Option<u32>,
}

impl Engine {
    pub fn new(lines: LineRegistry, combos_enabled: bool) -> Self {
        Self {
            lines,
            toggles: ToggleState::default(),
            combos_enabled,
            since_shutdown: None,
        }
    }

    pub fn lines(&self) -> &LineRegistry {
        &self.lines
    }

    pub fn toggles(&self) -> &ToggleState {
        &self.toggles
    }

    /// Samples all lines and decides this iteration's events.
    pub fn tick(&mut self, io: &mut dyn LineIo) -> Result<Frame, PlatformError> {
        self.lines.snapshot();
        self.lines.sample(io)?;

        let mut frame = Frame::default();
        let mut low_battery = false;
        let mut power_switch = false;

        for line in self.lines.lines() {
            let button = match line.spec.role {
                LineRole::Button(button) => button,
                LineRole::LowBattery => {
                    low_battery = line.is_active();
                    continue;
                }
                LineRole::PowerSwitch => {
                    power_switch = line.is_active();
                    continue;
                }
            };
            if !line.changed() {
                continue;
            }

            if button == Button::Select {
                if let Some(feature) = self.select_combo() {
                    let enabled = self.toggles.toggle(feature);
                    frame.toggled = Some((feature, enabled));
                    continue;
                }
            }

            frame.events.push(ButtonEvent {
                button,
                pressed: line.is_active(),
            });
        }

        frame.critical = if low_battery {
            Some(ShutdownReason::LowBattery)
        } else if power_switch {
            Some(ShutdownReason::PowerSwitch)
        } else {
            None
        };

        frame.request_shutdown = match (frame.critical, self.since_shutdown) {
            (None, _) => {
                self.since_shutdown = None;
                false
            }
            (Some(_), None) => true,
            (Some(_), Some(n)) => n >= SHUTDOWN_RETRIGGER_TICKS,
        };
        if frame.request_shutdown {
            self.since_shutdown = Some(0);
        }

        Ok(frame)
    }

    /// Select+L1 flips Wi-Fi, Select+R1 flips the amplifier, both gated by
    /// the cooldown. L1 takes precedence when both shoulders are held.
    fn select_combo(&self) -> Option<Feature> {
        if !self.combos_enabled || !self.toggles.ready() {
            return None;
        }
        if self.lines.button(Button::L1).is_active() {
            Some(Feature::Wifi)
        } else if self.lines.button(Button::R1).is_active() {
            Some(Feature::Amp)
        } else {
            None
        }
    }

    /// Applies `frame`: drives toggled outputs, writes the events, requests
    /// shutdown if due, and closes the batch with one sync marker.
    ///
    /// Output and device write failures are returned. A failed shutdown
    /// request is only logged, the loop keeps sampling either way.
    pub fn commit(
        &self,
        frame: &Frame,
        io: &mut dyn LineIo,
        pad: &mut dyn VirtualPad,
        shutdown: &mut dyn ShutdownRequester,
    ) -> Result<(), PlatformError> {
        if let Some((feature, enabled)) = frame.toggled {
            io.write(feature.output().address(), Level::from_bool(enabled))?;
            log::info!(
                "engine: {feature:?} {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }

        for event in &frame.events {
            log::debug!(
                "engine: {} {}",
                event.button,
                if event.pressed { "pressed" } else { "released" }
            );
            pad.write_event(event.button, event.pressed)?;
        }

        if let (true, Some(reason)) = (frame.request_shutdown, frame.critical) {
            log::warn!("engine: {reason}, shutting down now");
            if let Err(e) = shutdown.request(reason) {
                log::warn!("engine: {e}");
            }
        }

        pad.write_sync()
    }

    /// End-of-iteration bookkeeping, after the pacing delay.
    pub fn advance(&mut self) {
        self.toggles.advance();
        if let Some(n) = self.since_shutdown.as_mut() {
            *n = n.saturating_add(1);
        }
    }

    /// One full iteration without the pacing delay.
    pub fn step(
        &mut self,
        io: &mut dyn LineIo,
        pad: &mut dyn VirtualPad,
        shutdown: &mut dyn ShutdownRequester,
    ) -> Result<Frame, PlatformError> {
        let frame = self.tick(io)?;
        self.commit(&frame, io, pad, shutdown)?;
        Ok(frame)
    }

    /// Runs until a line read or device write fails.
    pub fn run(
        &mut self,
        io: &mut dyn LineIo,
        pad: &mut dyn VirtualPad,
        shutdown: &mut dyn ShutdownRequester,
        pacer: &mut Pacer,
    ) -> Result<Infallible, PlatformError> {
        log::info!(
            "engine: sampling {} lines every {:.2}ms",
            self.lines().lines().count(),
            pacer.period().as_secs_f64() * 1000.0
        );
        loop {
            self.step(io, pad, shutdown)?;
            pacer.wait();
            self.advance();
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
