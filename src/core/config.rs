//! Configuration for tile loading and compositing
//!
//! Defaults reproduce the fixed behaviour of the pipeline: a one second
//! per-attempt timeout, five attempts per image and a 400ms fade-in.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{
    core::constants::{FADE_IN_DURATION, LOAD_TIMEOUT, MAX_LOAD_ATTEMPTS},
    MapError, Result,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileLoadingConfig {
    /// Per-attempt timeout before an image load is restarted
    pub load_timeout_ms: u64,
    /// Attempts per image before it resolves with no image
    pub max_attempts: u32,
    /// Whether newly loaded tiles fade in
    pub fade_in: bool,
    /// Fade-in duration from the tile's current opacity to 1.0
    pub fade_in_ms: u64,
}

impl Default for TileLoadingConfig {
    fn default() -> Self {
        Self {
            load_timeout_ms: LOAD_TIMEOUT.as_millis() as u64,
            max_attempts: MAX_LOAD_ATTEMPTS,
            fade_in: true,
            fade_in_ms: FADE_IN_DURATION.as_millis() as u64,
        }
    }
}

impl TileLoadingConfig {
    /// Tiles are drawn fully opaque as soon as they load
    pub fn no_fade() -> Self {
        Self {
            fade_in: false,
            ..Self::default()
        }
    }

    pub fn for_testing() -> Self {
        Self {
            load_timeout_ms: 50,
            max_attempts: MAX_LOAD_ATTEMPTS,
            fade_in: false,
            fade_in_ms: FADE_IN_DURATION.as_millis() as u64,
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(MapError::Config("max_attempts must be at least 1".to_string()));
        }
        if self.load_timeout_ms == 0 {
            return Err(MapError::Config("load_timeout_ms must be positive".to_string()));
        }
        Ok(())
    }

    pub fn load_timeout(&self) -> Duration {
        Duration::from_millis(self.load_timeout_ms)
    }

    pub fn fade_in_duration(&self) -> Duration {
        Duration::from_millis(self.fade_in_ms)
    }
}
