//! Three-tier Web Vitals rating.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Rating {
    Good,
    NeedsImprovement,
    Poor,
}

impl Rating {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Good => "GOOD",
            Self::NeedsImprovement => "NEEDS_IMPROVEMENT",
            Self::Poor => "POOR",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boundaries between rating tiers. `good` must be below `poor`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Thresholds {
    pub good: f64,
    pub poor: f64,
}

impl Thresholds {
    /// Build validated thresholds; `key` names them in the error.
    pub fn new(key: &str, good: f64, poor: f64) -> Result<Self, ConfigError> {
        let thresholds = Self { good, poor };
        thresholds.validate(key)?;
        Ok(thresholds)
    }

    pub fn validate(&self, key: &str) -> Result<(), ConfigError> {
        if !self.good.is_finite() || !self.poor.is_finite() {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!("thresholds must be finite (good={}, poor={})", self.good, self.poor),
            });
        }
        if self.good >= self.poor {
            return Err(ConfigError::InvalidValue {
                key: key.to_string(),
                message: format!(
                    "good threshold ({}) must be below poor threshold ({})",
                    self.good, self.poor
                ),
            });
        }
        Ok(())
    }

    pub fn rate(&self, value: f64) -> Rating {
        rate(value, self.good, self.poor)
    }
}

/// Rate `value` against `good` and `poor`.
///
/// A value equal to a threshold belongs to the tier above it.
pub fn rate(value: f64, good: f64, poor: f64) -> Rating {
    if value < good {
        Rating::Good
    } else if value < poor {
        Rating::NeedsImprovement
    } else {
        Rating::Poor
    }
}
