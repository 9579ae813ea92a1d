//! Configuration management
//!
//! Config file is `config.toml` next to the executable, falling back to
//! `config/default.toml`. Every section is optional; missing keys take the
//! defaults from `crate::constants`.

use crate::codec::display::Revision;
use crate::constants::{
    DEFAULT_BAUD_RATE, DEFAULT_HOLESHOT_HEADER, DEFAULT_LAP_HEADER, DEFAULT_POSITION_HEADER,
    DEFAULT_PREVIOUS_LAP_HEADER, DEFAULT_TIME_FORMAT, DEVICE_SIGNATURE,
    DISCOVERY_READ_TIMEOUT_MS, DISCOVERY_SETTLE_DELAY_MS, DISPATCH_IO_TIMEOUT_MS,
};
use crate::discovery::DiscoverySettings;
use crate::error::{OsdError, Result};
use crate::race::{PilotId, Seat, WinCondition};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

// =============================================================================
// Application Configuration
// =============================================================================

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub display: DisplayConfig,
    pub race: RaceConfig,
    pub pilots: Vec<PilotConfig>,
}

// =============================================================================
// Serial
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Serial port name (empty = discover by IDENTIFY probe)
    pub port: String,

    pub baud_rate: u32,

    /// Read timeout per probed port
    pub discovery_timeout_ms: u64,

    /// Wait after opening a probed port (the bridge resets on open)
    pub settle_delay_ms: u64,

    /// Expected IDENTIFY answer
    pub signature: String,

    /// I/O timeout of the dispatch connection
    pub write_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            discovery_timeout_ms: DISCOVERY_READ_TIMEOUT_MS,
            settle_delay_ms: DISCOVERY_SETTLE_DELAY_MS,
            signature: DEVICE_SIGNATURE.to_string(),
            write_timeout_ms: DISPATCH_IO_TIMEOUT_MS,
        }
    }
}

// =============================================================================
// Display
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    /// Firmware field layout: "standard" (15/15/20) or "terminated" (16/16/21)
    pub revision: Revision,
    pub lap_header: String,
    pub holeshot_header: String,
    pub previous_lap_header: String,
    /// Prefix of the rank number in split lines
    pub position_header: String,
    /// `{m}` minutes, `{s}` seconds, `{d}` milliseconds
    pub time_format: String,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            revision: Revision::Standard,
            lap_header: DEFAULT_LAP_HEADER.to_string(),
            holeshot_header: DEFAULT_HOLESHOT_HEADER.to_string(),
            previous_lap_header: DEFAULT_PREVIOUS_LAP_HEADER.to_string(),
            position_header: DEFAULT_POSITION_HEADER.to_string(),
            time_format: DEFAULT_TIME_FORMAT.to_string(),
        }
    }
}

// =============================================================================
// Race / Pilots (standalone host)
// =============================================================================

/// Overrides applied to loaded results
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    pub win_condition: Option<WinCondition>,
    pub consecutives_base: Option<u32>,
    /// Rounds already run for the heat (shown as "Round N+1" on heat set)
    pub completed_rounds: u32,
}

/// One seated pilot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotConfig {
    pub id: PilotId,
    pub seat: Seat,
    pub callsign: String,
    /// Receiver address, hex
    pub osd_address: String,
}

// =============================================================================
// Derived settings
// =============================================================================

impl Config {
    /// Check values that would make the bridge unusable
    pub fn validate(&self) -> Result<()> {
        if self.serial.baud_rate == 0 {
            return Err(OsdError::ConfigValidation {
                field: "serial.baud_rate",
                reason: "must be greater than 0".into(),
            });
        }
        if self.serial.signature.is_empty() || !self.serial.signature.is_ascii() {
            return Err(OsdError::ConfigValidation {
                field: "serial.signature",
                reason: "must be non-empty ASCII".into(),
            });
        }
        if self.serial.write_timeout_ms == 0 {
            return Err(OsdError::ConfigValidation {
                field: "serial.write_timeout_ms",
                reason: "must be greater than 0".into(),
            });
        }
        if self.race.consecutives_base == Some(0) {
            return Err(OsdError::ConfigValidation {
                field: "race.consecutives_base",
                reason: "must be greater than 0".into(),
            });
        }
        for (i, pilot) in self.pilots.iter().enumerate() {
            if self.pilots[..i].iter().any(|p| p.seat == pilot.seat) {
                return Err(OsdError::ConfigValidation {
                    field: "pilots.seat",
                    reason: format!("seat {} assigned twice", pilot.seat),
                });
            }
        }
        Ok(())
    }

    pub fn discovery_settings(&self) -> DiscoverySettings {
        DiscoverySettings {
            read_timeout: Duration::from_millis(self.serial.discovery_timeout_ms),
            settle_delay: Duration::from_millis(self.serial.settle_delay_ms),
            signature: self.serial.signature.clone(),
        }
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.serial.write_timeout_ms)
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Get the directory holding the config
///
/// Searches in order:
/// 1. Next to executable (production deployment)
/// 2. Up from target/release or target/debug (dev builds)
fn find_project_root() -> Result<PathBuf> {
    let exe = std::env::current_exe().map_err(|e| OsdError::Io {
        path: PathBuf::from("executable"),
        source: e,
    })?;
    let exe_dir = exe.parent().ok_or_else(|| OsdError::ConfigValidation {
        field: "exe_path",
        reason: "no parent directory".into(),
    })?;

    if exe_dir.join("config.toml").exists() || exe_dir.join("config").exists() {
        return Ok(exe_dir.to_path_buf());
    }

    // exe_dir = .../target/release, we want the project root
    if let Some(target_dir) = exe_dir.parent() {
        if target_dir.file_name().is_some_and(|n| n == "target") {
            if let Some(project_root) = target_dir.parent() {
                if project_root.join("config").exists() {
                    return Ok(project_root.to_path_buf());
                }
            }
        }
    }

    Ok(exe_dir.to_path_buf())
}

/// Get the config file path
///
/// Looks for config.toml, falls back to config/default.toml
pub fn config_path() -> Result<PathBuf> {
    let root = find_project_root()?;

    let user_config = root.join("config.toml");
    if user_config.exists() {
        return Ok(user_config);
    }

    let default_config = root.join("config").join("default.toml");
    if default_config.exists() {
        return Ok(default_config);
    }

    Ok(user_config)
}

/// Parse TOML text
pub fn parse(content: &str, path: &Path) -> Result<Config> {
    toml::from_str(content).map_err(|e| OsdError::ConfigParse {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Load and validate a config file, failing on any problem
pub fn load_strict(path: &Path) -> Result<Config> {
    let content = fs::read_to_string(path).map_err(|e| OsdError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config = parse(&content, path)?;
    config.validate()?;
    Ok(config)
}

/// Load config, using defaults when the file is missing or invalid
///
/// `None` looks up the default location.
pub fn load(path: Option<&Path>) -> Config {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match config_path() {
            Ok(p) => p,
            Err(e) => {
                warn!("Failed to determine config path: {}, using defaults", e);
                return Config::default();
            }
        },
    };

    if !path.exists() {
        return Config::default();
    }

    match load_strict(&path) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}, using defaults", e);
            Config::default()
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
