//! Player configuration

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// MIME type checked for native segmented playback
pub const NATIVE_HLS_MIME: &str = "application/vnd.apple.mpegurl";

/// Options forwarded to the adaptive engine on construction
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run transmuxing off the main thread when the runtime allows it
    pub enable_worker: bool,
    /// Prefer low-latency playlist handling for live streams
    pub low_latency_mode: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enable_worker: true,
            low_latency_mode: true,
        }
    }
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Offset used by skip forward/backward (seconds)
    pub skip_interval_secs: f64,
    /// In-place recovery attempts allowed per engine binding
    pub max_recovery_attempts: u32,
    /// Publish one snapshot per drained signal batch instead of one per signal
    pub coalesce_time_updates: bool,
    /// MIME type for the element's native segmented capability check
    pub native_segmented_mime: String,
    /// Volume applied to the element when the controller is created
    pub initial_volume: f64,
    /// Initial value of the controls-visible flag
    pub controls_visible: bool,
    /// Adaptive engine options
    pub engine: EngineConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            skip_interval_secs: 10.0,
            max_recovery_attempts: 3,
            coalesce_time_updates: true,
            native_segmented_mime: NATIVE_HLS_MIME.to_string(),
            initial_volume: 1.0,
            controls_visible: true,
            engine: EngineConfig::default(),
        }
    }
}

impl PlayerConfig {
    /// Parse and validate a JSON configuration
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: PlayerConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !self.skip_interval_secs.is_finite() || self.skip_interval_secs <= 0.0 {
            return Err(Error::InvalidConfig(format!(
                "skip_interval_secs must be positive, got {}",
                self.skip_interval_secs
            )));
        }
        if self.max_recovery_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_recovery_attempts must be at least 1".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.initial_volume) {
            return Err(Error::InvalidConfig(format!(
                "initial_volume must be within [0, 1], got {}",
                self.initial_volume
            )));
        }
        if self.native_segmented_mime.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "native_segmented_mime must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.skip_interval_secs, 10.0);
        assert_eq!(config.max_recovery_attempts, 3);
        assert_eq!(config.native_segmented_mime, NATIVE_HLS_MIME);
        assert!(config.engine.enable_worker);
        assert!(config.engine.low_latency_mode);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = PlayerConfig::from_json_str(
            r#"{ "skip_interval_secs": 5.0, "engine": { "low_latency_mode": false } }"#,
        )
        .unwrap();
        assert_eq!(config.skip_interval_secs, 5.0);
        assert_eq!(config.max_recovery_attempts, 3);
        assert!(config.engine.enable_worker);
        assert!(!config.engine.low_latency_mode);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = PlayerConfig::from_json_str(r#"{ "max_recovery_attempts": 0 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = PlayerConfig::from_json_str(r#"{ "skip_interval_secs": -1 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = PlayerConfig::from_json_str(r#"{ "initial_volume": 1.5 }"#).unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");

        let err = PlayerConfig::from_json_str("{ not json").unwrap_err();
        assert_eq!(err.error_code(), "JSON");
    }
}
