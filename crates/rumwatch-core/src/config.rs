//! TOML-based monitoring configuration.
//!
//! Holds the tunables of the core:
//! - Rating thresholds per Web Vital
//! - The long-task blocking threshold
//! - The page origin used to tell first-party from third-party URLs
//!
//! Every field has a default, so an empty file is a valid configuration.
//!
//! ```toml
//! page_origin = "https://shop.example.com"
//!
//! [thresholds.lcp]
//! good = 2000.0
//! poor = 3500.0
//!
//! [long_task]
//! blocking_threshold_ms = 50.0
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::classify::Thresholds;
use crate::error::ConfigError;
use crate::report::{WebVital, DEFAULT_LONG_TASK_THRESHOLD_MS};

/// Rating thresholds for each Web Vital.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdsConfig {
    #[serde(default = "default_lcp")]
    pub lcp: Thresholds,
    #[serde(default = "default_fcp")]
    pub fcp: Thresholds,
    #[serde(default = "default_fid")]
    pub fid: Thresholds,
    #[serde(default = "default_inp")]
    pub inp: Thresholds,
    #[serde(default = "default_cls")]
    pub cls: Thresholds,
}

/// Long-task configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LongTaskConfig {
    /// Task time beyond this many milliseconds counts as blocking.
    #[serde(default = "default_blocking_threshold_ms")]
    pub blocking_threshold_ms: f64,
}

/// Core configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RumConfig {
    #[serde(default)]
    pub thresholds: ThresholdsConfig,
    #[serde(default)]
    pub long_task: LongTaskConfig,
    /// Origin of the monitored page, e.g. `https://shop.example.com`.
    #[serde(default)]
    pub page_origin: Option<String>,
}

// Default functions
fn default_lcp() -> Thresholds {
    WebVital::Lcp.default_thresholds()
}
fn default_fcp() -> Thresholds {
    WebVital::Fcp.default_thresholds()
}
fn default_fid() -> Thresholds {
    WebVital::Fid.default_thresholds()
}
fn default_inp() -> Thresholds {
    WebVital::Inp.default_thresholds()
}
fn default_cls() -> Thresholds {
    WebVital::Cls.default_thresholds()
}
fn default_blocking_threshold_ms() -> f64 {
    DEFAULT_LONG_TASK_THRESHOLD_MS
}

impl Default for ThresholdsConfig {
    fn default() -> Self {
        Self {
            lcp: default_lcp(),
            fcp: default_fcp(),
            fid: default_fid(),
            inp: default_inp(),
            cls: default_cls(),
        }
    }
}

impl Default for LongTaskConfig {
    fn default() -> Self {
        Self {
            blocking_threshold_ms: default_blocking_threshold_ms(),
        }
    }
}

impl RumConfig {
    /// Parse and validate a TOML document.
    ///
    /// # Errors
    ///
    /// Returns an error if the document is not valid TOML for this schema or
    /// if any value fails [`RumConfig::validate`].
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: RumConfig = toml::from_str(content)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load from a file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let cfg = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(cfg)
    }

    /// Load from a file, falling back to defaults when it is missing or
    /// invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Using default configuration: {}", e);
            Self::default()
        })
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for vital in WebVital::ALL {
            let key = format!("thresholds.{}", vital.name().to_ascii_lowercase());
            self.thresholds_for(vital).validate(&key)?;
        }

        let blocking = self.long_task.blocking_threshold_ms;
        if !blocking.is_finite() || blocking < 0.0 {
            return Err(ConfigError::InvalidValue {
                key: "long_task.blocking_threshold_ms".into(),
                message: format!("must be a non-negative number, got {blocking}"),
            });
        }

        if let Some(origin) = &self.page_origin {
            url::Url::parse(origin).map_err(|e| ConfigError::InvalidValue {
                key: "page_origin".into(),
                message: format!("'{origin}' is not a URL: {e}"),
            })?;
        }
        Ok(())
    }

    pub fn thresholds_for(&self, vital: WebVital) -> Thresholds {
        match vital {
            WebVital::Lcp => self.thresholds.lcp,
            WebVital::Fcp => self.thresholds.fcp,
            WebVital::Fid => self.thresholds.fid,
            WebVital::Inp => self.thresholds.inp,
            WebVital::Cls => self.thresholds.cls,
        }
    }

    pub fn page_origin(&self) -> Option<&str> {
        self.page_origin.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_roundtrip() {
        let cfg = RumConfig::default();
        let toml_str = cfg.to_toml_string().unwrap();
        let parsed = RumConfig::from_toml_str(&toml_str).unwrap();
        assert_eq!(parsed, cfg);
        assert_eq!(parsed.thresholds.lcp.good, 2500.0);
        assert_eq!(parsed.long_task.blocking_threshold_ms, 50.0);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let cfg = RumConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, RumConfig::default());
        assert_eq!(cfg.thresholds_for(WebVital::Cls).poor, 0.25);
    }

    #[test]
    fn test_partial_override() {
        let cfg = RumConfig::from_toml_str(
            r#"
page_origin = "https://shop.example.com"

[thresholds.lcp]
good = 2000.0
poor = 3500.0
"#,
        )
        .unwrap();
        assert_eq!(cfg.thresholds_for(WebVital::Lcp).good, 2000.0);
        assert_eq!(cfg.thresholds_for(WebVital::Fid).good, 100.0);
        assert_eq!(cfg.page_origin(), Some("https://shop.example.com"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let err = RumConfig::from_toml_str(
            r#"
[thresholds.inp]
good = 500.0
poor = 200.0
"#,
        )
        .unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "thresholds.inp"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_bad_origin_and_blocking_threshold_rejected() {
        assert!(RumConfig::from_toml_str("page_origin = \"not a url\"").is_err());
        assert!(RumConfig::from_toml_str("[long_task]\nblocking_threshold_ms = -1.0").is_err());
    }

    #[test]
    fn test_malformed_toml_is_parse_error() {
        let err = RumConfig::from_toml_str("[thresholds.lcp\ngood = 1").unwrap_err();
        assert!(matches!(err, ConfigError::ParseFailed(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[thresholds.cls]\ngood = 0.05\npoor = 0.2").unwrap();

        let cfg = RumConfig::load(file.path()).unwrap();
        assert_eq!(cfg.thresholds_for(WebVital::Cls).good, 0.05);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");

        let err = RumConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::LoadFailed { .. }));
        assert_eq!(RumConfig::load_or_default(&path), RumConfig::default());
    }
}
