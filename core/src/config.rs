//! Stage configuration, loadable from JSON.

use log::warn;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::monitor::TriggerConfig;

/// Settings for a [`Stage`](crate::stage::Stage). Every field has a default, so a partial (or
/// empty) JSON object is a valid configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    /// Panel width in pixels.
    pub width: u16,
    /// Panel height in pixels.
    pub height: u16,
    /// Time without triggers before the stage switches to idle.
    pub idle_threshold_ms: u32,
    /// Optional trigger debounce window.
    pub debounce_ms: Option<u32>,
    /// Restart the clip chain from its first clip when a trigger arrives while already active.
    pub restart_on_trigger: bool,
    pub look: LookConfig,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            width: 240,
            height: 240,
            idle_threshold_ms: 3000,
            debounce_ms: None,
            restart_on_trigger: false,
            look: LookConfig::default(),
        }
    }
}

/// Timing of the idle look-around scene.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookConfig {
    /// Lower bound of the random pause between glances.
    pub look_min_ms: u32,
    /// Upper bound (exclusive) of the random pause between glances.
    pub look_max_ms: u32,
    /// How long the pupils take to glide to a new target.
    pub look_move_ms: u32,
}

impl Default for LookConfig {
    fn default() -> Self {
        Self {
            look_min_ms: 2000,
            look_max_ms: 4000,
            look_move_ms: 500,
        }
    }
}

impl LookConfig {
    /// Rejects an empty pause range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.look_min_ms >= self.look_max_ms {
            return Err(ConfigError::invalid(
                "look.look_min_ms",
                "must be less than look.look_max_ms",
            ));
        }
        Ok(())
    }
}

impl StageConfig {
    /// Parses and validates a JSON configuration.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 {
            return Err(ConfigError::invalid("width", "must be non-zero"));
        }
        if self.height == 0 {
            return Err(ConfigError::invalid("height", "must be non-zero"));
        }
        if self.idle_threshold_ms == 0 {
            return Err(ConfigError::invalid(
                "idle_threshold_ms",
                "must be non-zero",
            ));
        }
        self.look.validate()?;
        match self.debounce_ms {
            Some(0) => warn!("debounce_ms is 0; triggers will not be debounced"),
            Some(debounce) if debounce >= self.idle_threshold_ms => {
                return Err(ConfigError::invalid(
                    "debounce_ms",
                    "must be less than idle_threshold_ms",
                ));
            }
            _ => {}
        }
        if self.look.look_move_ms >= self.look.look_min_ms {
            warn!(
                "look_move_ms ({}) is not shorter than look_min_ms ({}); glances may be cut short",
                self.look.look_move_ms, self.look.look_min_ms
            );
        }
        Ok(())
    }

    /// The monitor settings carried by this configuration.
    pub fn trigger_config(&self) -> TriggerConfig {
        TriggerConfig {
            idle_threshold_ms: self.idle_threshold_ms,
            debounce_ms: self.debounce_ms.filter(|&debounce| debounce > 0),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse configuration")]
    Parse(#[from] serde_json::Error),
    #[error("invalid value for `{field}`: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },
}

impl ConfigError {
    fn invalid(field: &'static str, reason: &'static str) -> Self {
        ConfigError::Invalid { field, reason }
    }
}
