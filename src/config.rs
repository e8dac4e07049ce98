//! # Configuration
//!
//! Loads and validates the TOML configuration that tunes the gesture engine.
//!
//! ## Why This Module Exists
//! Every threshold the interpretation pipeline depends on (debounce length, scroll
//! cooldown, momentum decay, pixel gates, output ranges) lives here as a named,
//! overridable value instead of a literal buried in the classifier or the physics.
//! Tests build configs in code; the binary reads them from disk.
//!
//! ## File Location
//! `dirs::config_dir()/ghosttouch/config.toml`, unless `GHOSTTOUCH_CONFIG` points
//! somewhere else. The default file is written with default values on first start,
//! so there is always something on disk for the user to edit.
//!
//! ## Error Handling Strategy
//! File I/O and parsing use `color_eyre` for context. Semantic validation returns
//! the typed [`ConfigError`] so callers can tell a bad value from a missing file.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{debug, info, warn, Level};

const CONFIG_DIR: &str = "ghosttouch";
const CONFIG_FILE: &str = "config.toml";
const CONFIG_ENV: &str = "GHOSTTOUCH_CONFIG";

/// Validation failures for configuration values.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid range for {name}: [{min}, {max}]")]
    InvalidRange {
        name: &'static str,
        min: f32,
        max: f32,
    },

    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: &'static str, reason: String },
}

/// How scroll momentum decays once the scroll gesture is released.
#[derive(Deserialize, Serialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DecayMode {
    /// `momentum *= momentum_decay` on every decay tick.
    #[default]
    Fixed,
    /// Faster samples glide longer: the factor is derived from the last sampled
    /// speed and kept in the controller state until the next sample.
    SpeedScaled,
}

/// Tuning for the per-frame interpretation pipeline.
///
/// Distances are in pixels of the camera frame, durations in milliseconds and the
/// volume range in decibels as reported by typical audio endpoints.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct GestureConfig {
    /// Consecutive identical candidate ticks needed to commit a mode change
    pub stability_threshold: u32,
    /// Minimum time between two scroll speed samples
    pub scroll_cooldown_ms: u64,
    /// Per-tick momentum multiplier while no scroll gesture is held
    pub momentum_decay: f32,
    pub decay_mode: DecayMode,
    /// Thumb-index distance a single pointing finger needs to count as ScrollUp
    pub proximity_threshold_px: f32,
    /// Thumb-index distance a pinch needs to count as VolumePinch
    pub min_volume_gesture_length_px: f32,
    /// Pinch distances mapped onto the volume range
    pub hand_distance_range_px: (f32, f32),
    /// Fallback volume range, used when the audio device does not report one
    pub volume_range_db: (f32, f32),
    pub scroll_speed_range: (f32, f32),
    /// Index-middle distances mapped onto the scroll speed range
    pub scroll_distance_range_px: (f32, f32),
    pub distance_history_capacity: usize,
    pub adaptive_speed_cap: f32,
    pub adaptive_speed_step: f32,
    /// Scroll actions closer together than this keep accelerating
    pub adaptive_window_ms: u64,
    /// Weight of the raw distance against the history mean
    pub volume_smoothing_weight: f32,
    /// Momentum below this magnitude snaps to zero
    pub momentum_stop_threshold: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            stability_threshold: 5,
            scroll_cooldown_ms: 25,
            momentum_decay: 0.92,
            decay_mode: DecayMode::Fixed,
            proximity_threshold_px: 80.0,
            min_volume_gesture_length_px: 40.0,
            hand_distance_range_px: (50.0, 200.0),
            volume_range_db: (-63.5, 0.0),
            scroll_speed_range: (1.0, 30.0),
            scroll_distance_range_px: (30.0, 200.0),
            distance_history_capacity: 10,
            adaptive_speed_cap: 1.5,
            adaptive_speed_step: 1.01,
            adaptive_window_ms: 500,
            volume_smoothing_weight: 0.7,
            momentum_stop_threshold: 0.5,
        }
    }
}

impl GestureConfig {
    /// Checks every value the pipeline relies on being sane.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.stability_threshold == 0 {
            return Err(ConfigError::InvalidValue {
                name: "stability_threshold",
                reason: "must be at least 1".to_string(),
            });
        }
        if !(self.momentum_decay > 0.0 && self.momentum_decay < 1.0) {
            return Err(ConfigError::InvalidValue {
                name: "momentum_decay",
                reason: format!("{} is outside (0, 1)", self.momentum_decay),
            });
        }
        if self.distance_history_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                name: "distance_history_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.adaptive_speed_cap < 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "adaptive_speed_cap",
                reason: format!("{} is below 1.0", self.adaptive_speed_cap),
            });
        }
        if self.adaptive_speed_step < 1.0 {
            return Err(ConfigError::InvalidValue {
                name: "adaptive_speed_step",
                reason: format!("{} is below 1.0", self.adaptive_speed_step),
            });
        }
        if !(0.0..=1.0).contains(&self.volume_smoothing_weight) {
            return Err(ConfigError::InvalidValue {
                name: "volume_smoothing_weight",
                reason: format!("{} is outside [0, 1]", self.volume_smoothing_weight),
            });
        }
        if self.momentum_stop_threshold < 0.0 {
            return Err(ConfigError::InvalidValue {
                name: "momentum_stop_threshold",
                reason: "must not be negative".to_string(),
            });
        }

        check_range("hand_distance_range_px", self.hand_distance_range_px)?;
        check_range("volume_range_db", self.volume_range_db)?;
        check_range("scroll_speed_range", self.scroll_speed_range)?;
        check_range("scroll_distance_range_px", self.scroll_distance_range_px)?;
        Ok(())
    }
}

fn check_range(name: &'static str, (min, max): (f32, f32)) -> Result<(), ConfigError> {
    if min.is_finite() && max.is_finite() && min < max {
        Ok(())
    } else {
        Err(ConfigError::InvalidRange { name, min, max })
    }
}

/// Where pose records come from.
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SourceConfig {
    /// JSON-lines file; stdin when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub channel_capacity: usize,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            path: None,
            channel_capacity: 64,
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn max_level(&self) -> Level {
        Level::from_str(&self.level).unwrap_or_else(|_| {
            eprintln!("Unknown log level '{}', falling back to info", self.level);
            Level::INFO
        })
    }
}

/// Complete contents of `config.toml`.
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub gesture: GestureConfig,
    pub source: SourceConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// `<config dir>/ghosttouch/config.toml`
    pub fn default_path() -> Result<PathBuf> {
        let mut path = dirs::config_dir().ok_or_else(|| eyre!("No config directory available"))?;
        path.push(CONFIG_DIR);
        path.push(CONFIG_FILE);
        Ok(path)
    }

    /// Resolves the config path from the environment and loads it.
    ///
    /// An explicit `GHOSTTOUCH_CONFIG` must exist; the default location is created
    /// with defaults when missing.
    pub async fn load_from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => {
                let path = PathBuf::from(path);
                debug!("Using config from {}: {}", CONFIG_ENV, path.display());
                Self::load(&path).await
            }
            None => {
                let path = Self::default_path()?;
                Self::ensure_default(&path).await?;
                Self::load(&path).await
            }
        }
    }

    /// Writes a default config file if none exists at `path`.
    pub async fn ensure_default(path: &Path) -> Result<()> {
        if tokio::fs::try_exists(path)
            .await
            .map_err(|e| eyre!("Failed to check if config file exists: {}", e))?
        {
            return Ok(());
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| eyre!("Failed to create config directory: {}", e))?;
        }

        let content = toml::to_string_pretty(&AppConfig::default())
            .map_err(|e| eyre!("Failed to serialize default config: {}", e))?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| eyre!("Failed to write default config file: {}", e))?;

        info!("Created default config at {}", path.display());
        Ok(())
    }

    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;
        let config = Self::from_toml_str(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: AppConfig =
            toml::from_str(content).map_err(|e| eyre!("Failed to parse config: {}", e))?;
        if config.source.channel_capacity == 0 {
            warn!("source.channel_capacity of 0 is not allowed, using default");
            return Ok(Self {
                source: SourceConfig {
                    channel_capacity: SourceConfig::default().channel_capacity,
                    ..config.source
                },
                ..config
            });
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GestureConfig::default();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.stability_threshold, 5);
        assert_eq!(config.volume_range_db, (-63.5, 0.0));
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            [gesture]
            stability_threshold = 3
            decay_mode = "speed_scaled"
            hand_distance_range_px = [40.0, 180.0]

            [logging]
            level = "debug"
            "#,
        )
        .unwrap();

        assert_eq!(config.gesture.stability_threshold, 3);
        assert_eq!(config.gesture.decay_mode, DecayMode::SpeedScaled);
        assert_eq!(config.gesture.hand_distance_range_px, (40.0, 180.0));
        assert_eq!(config.gesture.momentum_decay, 0.92);
        assert_eq!(config.source, SourceConfig::default());
        assert_eq!(config.logging.max_level(), Level::DEBUG);
    }

    #[test]
    fn test_inverted_range_rejected() {
        let config = GestureConfig {
            hand_distance_range_px: (200.0, 50.0),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidRange {
                name: "hand_distance_range_px",
                ..
            })
        ));
    }

    #[test]
    fn test_decay_outside_unit_interval_rejected() {
        let config = GestureConfig {
            momentum_decay: 1.0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                name: "momentum_decay",
                ..
            })
        ));
    }

    #[test]
    fn test_zero_channel_capacity_replaced() {
        let config = AppConfig::from_toml_str("[source]\nchannel_capacity = 0\n").unwrap();
        assert_eq!(config.source.channel_capacity, 64);
    }

    #[tokio::test]
    async fn test_ensure_default_writes_loadable_file() {
        let mut path = std::env::temp_dir();
        path.push(format!("ghosttouch-test-{}", std::process::id()));
        path.push(CONFIG_FILE);
        let _ = tokio::fs::remove_file(&path).await;

        AppConfig::ensure_default(&path).await.unwrap();
        let loaded = AppConfig::load(&path).await.unwrap();
        assert_eq!(loaded, AppConfig::default());

        if let Some(parent) = path.parent() {
            let _ = tokio::fs::remove_dir_all(parent).await;
        }
    }
}
