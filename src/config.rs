// Practice configuration
// Loaded from RON; every field has a default

use crate::error::{PracticeError, PracticeResult};
use crate::practice::evaluator::DEFAULT_TOLERANCE_MS;
use crate::practice::wait_mode::{DEFAULT_LOOKAHEAD_MS, DEFAULT_TRIGGER_MS};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PracticeConfig {
    /// Tempo used until the first `SetTempo`
    pub initial_bpm: f64,
    /// Match window either side of a note start
    pub tolerance_ms: f64,
    /// How far ahead wait mode searches for the next group
    pub wait_lookahead_ms: f64,
    /// How early before a group wait mode freezes the clock
    pub wait_trigger_ms: f64,
    /// Pre-roll beats before beat 0 on `start()`
    pub count_in_beats: f64,
    /// Start with wait-for-input mode enabled
    pub wait_mode: bool,
}

impl Default for PracticeConfig {
    fn default() -> Self {
        Self {
            initial_bpm: 120.0,
            tolerance_ms: DEFAULT_TOLERANCE_MS,
            wait_lookahead_ms: DEFAULT_LOOKAHEAD_MS,
            wait_trigger_ms: DEFAULT_TRIGGER_MS,
            count_in_beats: 0.0,
            wait_mode: false,
        }
    }
}

impl PracticeConfig {
    /// Parse and validate RON text
    pub fn from_ron_str(text: &str) -> PracticeResult<Self> {
        let config: Self = ron::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a RON file
    pub fn load(path: impl AsRef<Path>) -> PracticeResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn validate(&self) -> PracticeResult<()> {
        if !self.initial_bpm.is_finite() || self.initial_bpm <= 0.0 {
            return Err(PracticeError::InvalidTempo(self.initial_bpm));
        }
        if !(self.tolerance_ms >= 0.0) {
            return Err(PracticeError::InvalidConfig(format!(
                "tolerance_ms must be >= 0, got {}",
                self.tolerance_ms
            )));
        }
        if !(self.wait_trigger_ms >= 0.0 && self.wait_lookahead_ms >= self.wait_trigger_ms) {
            return Err(PracticeError::InvalidConfig(format!(
                "need wait_lookahead_ms ({}) >= wait_trigger_ms ({}) >= 0",
                self.wait_lookahead_ms, self.wait_trigger_ms
            )));
        }
        if !(self.count_in_beats >= 0.0) {
            return Err(PracticeError::InvalidConfig(format!(
                "count_in_beats must be >= 0, got {}",
                self.count_in_beats
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PracticeConfig::default();
        assert_eq!(config.initial_bpm, 120.0);
        assert_eq!(config.tolerance_ms, 200.0);
        assert_eq!(config.wait_lookahead_ms, 100.0);
        assert_eq!(config.wait_trigger_ms, 50.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_ron() {
        let config = PracticeConfig::from_ron_str("(initial_bpm: 90.0, tolerance_ms: 100.0)").unwrap();
        assert_eq!(config.initial_bpm, 90.0);
        assert_eq!(config.tolerance_ms, 100.0);
        assert_eq!(config.wait_trigger_ms, 50.0);
        assert!(!config.wait_mode);
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            PracticeConfig::from_ron_str("(initial_bpm: 0.0)"),
            Err(PracticeError::InvalidTempo(_))
        ));
        assert!(matches!(
            PracticeConfig::from_ron_str("(tolerance_ms: -1.0)"),
            Err(PracticeError::InvalidConfig(_))
        ));
        assert!(matches!(
            PracticeConfig::from_ron_str("(wait_lookahead_ms: 10.0, wait_trigger_ms: 50.0)"),
            Err(PracticeError::InvalidConfig(_))
        ));
        assert!(matches!(
            PracticeConfig::from_ron_str("(initial_bpm: \"fast\")"),
            Err(PracticeError::Config(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("practice.ron");
        std::fs::write(&path, "(wait_mode: true, count_in_beats: 4.0)").unwrap();

        let config = PracticeConfig::load(&path).unwrap();
        assert!(config.wait_mode);
        assert_eq!(config.count_in_beats, 4.0);

        assert!(matches!(
            PracticeConfig::load(dir.path().join("missing.ron")),
            Err(PracticeError::Io(_))
        ));
    }
}
