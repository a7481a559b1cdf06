//! # Schedule Configuration
//!
//! Configuration for delivery-date rules, the materialization horizon, order
//! numbering and the database location.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HEARTH_TIMEZONE=Asia/Kolkata                                       │
//! │     HEARTH_HORIZON_DAYS=14                                             │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/hearth/hearth.toml (Linux)                               │
//! │     ~/Library/Application Support/in.hearth.hearth/hearth.toml (macOS) │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     Asia/Kolkata, cutoff 04:00, 10-day horizon, first order 101        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # hearth.toml
//! [delivery]
//! timezone = "Asia/Kolkata"
//! cutoff_hour = 4
//!
//! [materializer]
//! horizon_days = 10
//!
//! [sequence]
//! counter_key = "order_counter"
//! floor = 101
//!
//! [database]
//! path = "/var/lib/hearth/hearth.db"
//! ```

use hearth_core::delivery::{parse_zone, DeliveryDateResolver};
use hearth_core::{
    DEFAULT_CUTOFF_HOUR, DEFAULT_HORIZON_DAYS, DEFAULT_TIMEZONE, ORDER_COUNTER_KEY,
    ORDER_SEQUENCE_FLOOR,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::error::{ScheduleError, ScheduleResult};

// =============================================================================
// Delivery Settings
// =============================================================================

/// Delivery-date boundary settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliverySettings {
    /// IANA name of the reference zone. Every date boundary is judged here.
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Local hour at and after which orders roll to the next day.
    #[serde(default = "default_cutoff_hour")]
    pub cutoff_hour: u32,
}

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.name().to_string()
}

fn default_cutoff_hour() -> u32 {
    DEFAULT_CUTOFF_HOUR
}

impl Default for DeliverySettings {
    fn default() -> Self {
        DeliverySettings {
            timezone: default_timezone(),
            cutoff_hour: default_cutoff_hour(),
        }
    }
}

// =============================================================================
// Materializer Settings
// =============================================================================

/// Horizon settings for standing order materialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaterializerSettings {
    /// Number of future days (starting tomorrow) kept materialized.
    #[serde(default = "default_horizon_days")]
    pub horizon_days: u32,
}

fn default_horizon_days() -> u32 {
    DEFAULT_HORIZON_DAYS
}

impl Default for MaterializerSettings {
    fn default() -> Self {
        MaterializerSettings {
            horizon_days: default_horizon_days(),
        }
    }
}

// =============================================================================
// Sequence Settings
// =============================================================================

/// Order number settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceSettings {
    /// Counter row used for order numbers.
    #[serde(default = "default_counter_key")]
    pub counter_key: String,

    /// The first number ever issued.
    #[serde(default = "default_floor")]
    pub floor: i64,
}

fn default_counter_key() -> String {
    ORDER_COUNTER_KEY.to_string()
}

fn default_floor() -> i64 {
    ORDER_SEQUENCE_FLOOR
}

impl Default for SequenceSettings {
    fn default() -> Self {
        SequenceSettings {
            counter_key: default_counter_key(),
            floor: default_floor(),
        }
    }
}

// =============================================================================
// Database Settings
// =============================================================================

/// Where the SQLite file lives.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// Explicit path. `None` means the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete scheduling configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleConfig {
    #[serde(default)]
    pub delivery: DeliverySettings,

    #[serde(default)]
    pub materializer: MaterializerSettings,

    #[serde(default)]
    pub sequence: SequenceSettings,

    #[serde(default)]
    pub database: DatabaseSettings,
}

impl ScheduleConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (hearth.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ScheduleResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading schedule config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Saves configuration to file.
    pub fn save(&self, config_path: Option<PathBuf>) -> ScheduleResult<()> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or_else(|| ScheduleError::ConfigSaveFailed("No config path available".into()))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents)?;

        info!(?path, "Schedule config saved");
        Ok(())
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ScheduleResult<()> {
        parse_zone(&self.delivery.timezone)
            .map_err(|e| ScheduleError::InvalidConfig(e.to_string()))?;

        if self.delivery.cutoff_hour > 23 {
            return Err(ScheduleError::InvalidConfig(format!(
                "cutoff_hour must be between 0 and 23, got {}",
                self.delivery.cutoff_hour
            )));
        }

        if self.materializer.horizon_days == 0 {
            return Err(ScheduleError::InvalidConfig(
                "horizon_days must be greater than 0".into(),
            ));
        }

        if self.sequence.counter_key.trim().is_empty() {
            return Err(ScheduleError::InvalidConfig(
                "counter_key must not be empty".into(),
            ));
        }

        if self.sequence.floor < 1 {
            return Err(ScheduleError::InvalidConfig(format!(
                "sequence floor must be at least 1, got {}",
                self.sequence.floor
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup.
    ///
    /// Unparseable numeric values are logged and ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(zone) = lookup("HEARTH_TIMEZONE") {
            debug!(timezone = %zone, "Overriding timezone from environment");
            self.delivery.timezone = zone;
        }

        if let Some(hour) = lookup("HEARTH_CUTOFF_HOUR") {
            match hour.parse::<u32>() {
                Ok(h) => self.delivery.cutoff_hour = h,
                Err(_) => warn!(value = %hour, "Ignoring non-numeric HEARTH_CUTOFF_HOUR"),
            }
        }

        if let Some(days) = lookup("HEARTH_HORIZON_DAYS") {
            match days.parse::<u32>() {
                Ok(d) => {
                    debug!(horizon_days = d, "Overriding horizon from environment");
                    self.materializer.horizon_days = d;
                }
                Err(_) => warn!(value = %days, "Ignoring non-numeric HEARTH_HORIZON_DAYS"),
            }
        }

        if let Some(key) = lookup("HEARTH_COUNTER_KEY") {
            self.sequence.counter_key = key;
        }

        if let Some(floor) = lookup("HEARTH_SEQUENCE_FLOOR") {
            match floor.parse::<i64>() {
                Ok(f) => self.sequence.floor = f,
                Err(_) => warn!(value = %floor, "Ignoring non-numeric HEARTH_SEQUENCE_FLOOR"),
            }
        }

        if let Some(path) = lookup("HEARTH_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("in", "hearth", "hearth")
            .map(|dirs| dirs.config_dir().join("hearth.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Builds the delivery-date resolver these settings describe.
    pub fn resolver(&self) -> ScheduleResult<DeliveryDateResolver> {
        Ok(DeliveryDateResolver::from_zone_name(
            self.delivery.cutoff_hour,
            &self.delivery.timezone,
        )?)
    }

    pub fn horizon_days(&self) -> u32 {
        self.materializer.horizon_days
    }

    /// Database file path: explicit setting, else the platform data dir.
    pub fn database_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(|| {
            directories::ProjectDirs::from("in", "hearth", "hearth")
                .map(|dirs| dirs.data_dir().join("hearth.db"))
                .unwrap_or_else(|| PathBuf::from("hearth.db"))
        })
    }
}
