//! Screening run configuration.

use thiserror::Error;

use crate::batch::FailureMode;

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Sampling temperature the prompt wording was calibrated against.
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Trials evaluated per batch run unless configured otherwise.
pub const DEFAULT_MAX_RECORDS: usize = 10;

/// Accepted sampling temperature range of the completion service.
pub const TEMPERATURE_RANGE: std::ops::RangeInclusive<f32> = 0.0..=2.0;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigurationError {
    #[error("missing API credential (set OPENAI_API_KEY)")]
    MissingCredential,

    #[error("model identifier must not be empty")]
    EmptyModel,

    #[error("temperature {0} outside accepted range 0.0..=2.0")]
    Temperature(f32),

    #[error("max_records must be at least 1")]
    ZeroMaxRecords,
}

/// Settings for one batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct ScreeningConfig {
    pub model: String,
    pub temperature: f32,
    /// How many records from the front of the list are evaluated.
    pub max_records: usize,
    pub failure_mode: FailureMode,
}

impl Default for ScreeningConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: DEFAULT_TEMPERATURE,
            max_records: DEFAULT_MAX_RECORDS,
            failure_mode: FailureMode::Halt,
        }
    }
}

impl ScreeningConfig {
    /// Check the settings before any record is processed.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.model.trim().is_empty() {
            return Err(ConfigurationError::EmptyModel);
        }
        if !TEMPERATURE_RANGE.contains(&self.temperature) {
            return Err(ConfigurationError::Temperature(self.temperature));
        }
        if self.max_records == 0 {
            return Err(ConfigurationError::ZeroMaxRecords);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = ScreeningConfig::default();
        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.temperature, 0.2);
        assert_eq!(config.max_records, 10);
        assert_eq!(config.failure_mode, FailureMode::Halt);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn temperature_bounds_inclusive() {
        for t in [0.0, 2.0] {
            let config = ScreeningConfig {
                temperature: t,
                ..Default::default()
            };
            assert!(config.validate().is_ok());
        }
        for t in [-0.1, 2.01, f32::NAN] {
            let config = ScreeningConfig {
                temperature: t,
                ..Default::default()
            };
            assert!(matches!(
                config.validate(),
                Err(ConfigurationError::Temperature(_))
            ));
        }
    }

    #[test]
    fn blank_model_rejected() {
        let config = ScreeningConfig {
            model: "  ".into(),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigurationError::EmptyModel));
    }

    #[test]
    fn zero_max_records_rejected() {
        let config = ScreeningConfig {
            max_records: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigurationError::ZeroMaxRecords));
    }
}
