//! VAD configuration types

use serde::{Deserialize, Serialize};

/// Default mean absolute amplitude a frame must reach to count as speech
pub const DEFAULT_VAD_THRESHOLD: f32 = 500.0;

/// Default number of sub-threshold frames still forwarded after speech
pub const DEFAULT_HANGOVER_FRAMES: u32 = 15;

/// Configuration for the energy-based voice activity detector
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VADConfig {
    /// Mean absolute sample amplitude at or above which a frame is speech.
    /// A threshold of 0 disables filtering.
    pub threshold: f32,

    /// Frames of silence forwarded after the last speech frame so that
    /// trailing syllables and short pauses reach the upstream model
    pub hangover_frames: u32,
}

impl Default for VADConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_VAD_THRESHOLD,
            hangover_frames: DEFAULT_HANGOVER_FRAMES,
        }
    }
}

impl VADConfig {
    pub fn new(threshold: f32, hangover_frames: u32) -> Self {
        Self {
            threshold,
            hangover_frames,
        }
    }

    /// Configuration that forwards every frame
    pub fn disabled() -> Self {
        Self {
            threshold: 0.0,
            ..Default::default()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0.0
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if !self.threshold.is_finite() || self.threshold < 0.0 {
            return Err(format!(
                "VAD threshold must be a non-negative number, got {}",
                self.threshold
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VADConfig::default();
        assert_eq!(config.threshold, 500.0);
        assert_eq!(config.hangover_frames, 15);
        assert!(config.is_enabled());
    }

    #[test]
    fn test_disabled_config() {
        let config = VADConfig::disabled();
        assert!(!config.is_enabled());
        assert_eq!(config.hangover_frames, DEFAULT_HANGOVER_FRAMES);
    }

    #[test]
    fn test_validate_threshold() {
        assert!(VADConfig::new(0.0, 0).validate().is_ok());
        assert!(VADConfig::new(1200.0, 5).validate().is_ok());
        assert!(VADConfig::new(-1.0, 5).validate().is_err());
        assert!(VADConfig::new(f32::NAN, 5).validate().is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: VADConfig = serde_json::from_str(r#"{"threshold": 300}"#).unwrap();
        assert_eq!(config.threshold, 300.0);
        assert_eq!(config.hangover_frames, DEFAULT_HANGOVER_FRAMES);
    }
}
