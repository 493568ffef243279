//! Configuration management for Helios
//!
//! This module handles loading, validation, and management of the application
//! configuration from YAML files.

use crate::error::{HeliosError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod defaults;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Charging station UDP endpoint
    pub keba: KebaConfig,

    /// Control law constants and limits
    pub controls: ControlsConfig,

    /// Device-side failsafe configured at startup
    pub failsafe: FailsafeConfig,

    /// Downstream energy metering sink
    pub metering: MeteringConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Charging station connection parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KebaConfig {
    /// Hostname or IP address of the charging station
    pub host: String,

    /// UDP port the station listens on (7090 on KEBA P20/P30)
    pub port: u16,

    /// Local UDP port to bind; the station answers to this port
    pub listen_port: u16,

    /// Request report 2 and report 3 before every control tick
    pub poll_reports: bool,
}

/// Control law constants and safety limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlsConfig {
    /// Base floor for optimized charging (mA)
    pub min_charge_current_ma: u32,

    /// Ceiling for every dispatched current (mA)
    pub max_charge_current_ma: u32,

    /// Current commanded when an EV is plugged in and locked (mA)
    pub plug_in_current_ma: u32,

    /// Floor while the input flag requests boost charging (mA)
    pub boost_min_current_ma: u32,

    /// Floor in fixed charging mode (mA)
    pub fixed_min_current_ma: u32,

    /// Power subtracted from the surplus before conversion (W)
    pub charge_offset_w: i64,

    /// Added on top of the floor when the station reports a ready/not-ready
    /// state, seeding the accumulator for the next session (mA)
    pub ready_seed_offset_ma: u32,

    /// Minimum delay before every outbound datagram (ms)
    pub send_pacing_ms: u64,

    /// Control tick interval (ms)
    pub tick_interval_ms: u64,
}

/// Failsafe parameters pushed to the station at startup
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailsafeConfig {
    /// Send the failsafe command at startup
    pub enabled: bool,

    /// Communication timeout before the station falls back (s)
    pub timeout_s: u32,

    /// Fallback current (mA)
    pub current_ma: u32,

    /// Persist the setting in the station's EEPROM
    pub persist: bool,
}

/// Volkszaehler metering sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeteringConfig {
    /// Whether values are forwarded to the metering middleware
    pub enabled: bool,

    /// Middleware base URL, e.g. `http://host/middleware.php`
    pub base_url: String,

    /// Channel receiving the dispatched controller current
    pub controller_current_channel: String,

    /// Channel receiving the boost indicator ("0" or "100")
    pub input_channel: String,

    /// HTTP request timeout (ms)
    pub timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    pub level: String,

    /// Optional console override level
    pub console_level: Option<String>,

    /// Optional file override level
    pub file_level: Option<String>,

    /// Path to log file (its directory receives the rotated files)
    pub file: String,

    /// Number of rotated files to keep
    pub backup_count: u32,

    /// Whether to log to console
    pub console_output: bool,

    /// Whether to use JSON format
    pub json_format: bool,
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from the default locations, falling back to defaults
    pub fn load() -> Result<Self> {
        let default_paths = [
            "helios_config.yaml",
            "/data/helios_config.yaml",
            "/etc/helios/config.yaml",
        ];

        for path in &default_paths {
            if Path::new(path).exists() {
                return Self::from_file(path);
            }
        }

        Ok(Config::default())
    }

    /// Load from an explicit path when given, otherwise from the default locations
    pub fn load_with_override<P: AsRef<Path>>(path: Option<P>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Self::load(),
        }
    }

    /// Save configuration to a YAML file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.keba.host.trim().is_empty() {
            return Err(HeliosError::validation("keba.host", "Host cannot be empty"));
        }

        if self.keba.port == 0 {
            return Err(HeliosError::validation(
                "keba.port",
                "Port must be greater than 0",
            ));
        }

        if self.keba.listen_port == 0 {
            return Err(HeliosError::validation(
                "keba.listen_port",
                "Port must be greater than 0",
            ));
        }

        if self.controls.max_charge_current_ma == 0 {
            return Err(HeliosError::validation(
                "controls.max_charge_current_ma",
                "Must be positive",
            ));
        }

        if self.controls.min_charge_current_ma > self.controls.max_charge_current_ma {
            return Err(HeliosError::validation(
                "controls.min_charge_current_ma",
                "Must not exceed max_charge_current_ma",
            ));
        }

        let floors = [
            ("controls.plug_in_current_ma", self.controls.plug_in_current_ma),
            ("controls.boost_min_current_ma", self.controls.boost_min_current_ma),
            ("controls.fixed_min_current_ma", self.controls.fixed_min_current_ma),
        ];
        for (field, floor) in floors {
            if floor > self.controls.max_charge_current_ma {
                return Err(HeliosError::validation(
                    field,
                    "Must not exceed max_charge_current_ma",
                ));
            }
        }

        if self.controls.tick_interval_ms == 0 {
            return Err(HeliosError::validation(
                "controls.tick_interval_ms",
                "Must be greater than 0",
            ));
        }

        if self.metering.enabled
            && (self.metering.controller_current_channel.trim().is_empty()
                || self.metering.input_channel.trim().is_empty())
        {
            return Err(HeliosError::validation(
                "metering",
                "Channel ids are required when metering is enabled",
            ));
        }

        crate::logging::parse_log_level(&self.logging.level)
            .map_err(|_| HeliosError::validation("logging.level", "Unknown log level"))?;

        Ok(())
    }
}
