//! Deployment configuration.
//!
//! Line assignments, cadence and thresholds are compile-time constants. The
//! TOML file only covers what differs between installations: which SPI bus
//! the expander is on, how shutdown is requested, and whether the select
//! combos are wired up on this board revision.
//!
//! ```toml
//! [expander]
//! spi_bus = 0
//! chip_select = 0
//!
//! [shutdown]
//! method = "udp"
//! address = "127.0.0.1:55355"
//! payload = "SHUTDOWN"
//!
//! [combos]
//! enabled = true
//! ```

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "GAMEGIRL_JOYPAD_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "/etc/gamegirl-joypad.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub expander: ExpanderConfig,
    pub shutdown: ShutdownConfig,
    pub combos: ComboConfig,
}

/// SPI wiring of the MCP23S17.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExpanderConfig {
    pub spi_bus: u8,
    pub chip_select: u8,
    /// A2..A0 strap of the expander, used in the SPI opcode.
    pub hardware_address: u8,
    pub clock_hz: u32,
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            spi_bus: 0,
            chip_select: 0,
            hardware_address: 0,
            clock_hz: 4_000_000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "method", rename_all = "lowercase")]
pub enum ShutdownConfig {
    /// Network command to the front-end, e.g. RetroArch's command port.
    Udp { address: String, payload: String },
    Command {
        program: String,
        #[serde(default)]
        args: Vec<String>,
    },
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        ShutdownConfig::Udp {
            address: "127.0.0.1:55355".into(),
            payload: "SHUTDOWN".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ComboConfig {
    /// Select+L1 toggles Wi-Fi and Select+R1 toggles the amplifier.
    /// Off for board revisions without the enable lines.
    pub enabled: bool,
}

impl Default for ComboConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Config {
    /// Path from `$GAMEGIRL_JOYPAD_CONFIG`, falling back to the system default.
    pub fn default_path() -> PathBuf {
        std::env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
    }

    /// Loads `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let config = Self::parse(&text).map_err(|source| ConfigError::Parse {
                    path: path.to_owned(),
                    source,
                })?;
                log::info!("config: loaded {}", path.display());
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::info!("config: {} not found, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }
}
