// src/config/validation.rs
//
// Range checks shared by every configuration type

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{field} = {value} is out of range (expected {expected})")]
    OutOfRange {
        field: &'static str,
        value: f64,
        expected: &'static str,
    },

    #[error("max_gap_seconds ({max}) must not be less than min_gap_seconds ({min})")]
    GapOrder { min: f64, max: f64 },

    #[error("band limits out of order: min_freq_hz {min} must be below max_freq_hz {max}")]
    BandOrder { min: f64, max: f64 },

    #[error("filter order {0} must be even and between 2 and 12")]
    FilterOrder(usize),

    #[error("unknown profile '{0}'")]
    UnknownProfile(String),

    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// `0 < value <= 1`
pub(crate) fn unit_open_closed(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value <= 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "0 < x <= 1",
        })
    }
}

/// `0 < value < 1`
pub(crate) fn unit_open(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 && value < 1.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "0 < x < 1",
        })
    }
}

/// `0 <= value <= 1`
pub(crate) fn unit_closed(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "0 <= x <= 1",
        })
    }
}

/// `value > 0`
pub(crate) fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "x > 0",
        })
    }
}

/// `value >= 0`
pub(crate) fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange {
            field,
            value,
            expected: "x >= 0",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds() {
        assert!(unit_open_closed("t", 1.0).is_ok());
        assert!(unit_open_closed("t", 0.0).is_err());
        assert!(unit_open("t", 1.0).is_err());
        assert!(unit_closed("t", 0.0).is_ok());
        assert!(positive("t", 0.0).is_err());
        assert!(non_negative("t", 0.0).is_ok());
        assert!(non_negative("t", f64::NAN).is_err());
        assert!(positive("t", f64::INFINITY).is_err());
    }

    #[test]
    fn test_error_message_names_field() {
        let err = unit_open_closed("correlation_threshold", 1.5).unwrap_err();
        assert!(err.to_string().contains("correlation_threshold"));
    }
}
