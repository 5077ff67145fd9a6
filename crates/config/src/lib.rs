//! Configuration loading and validation for Parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides for scalar settings. Every field has a default, so
//! a missing file yields a fully usable config.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Viewport and glyph settings
    #[serde(default)]
    pub view: ViewConfig,

    /// Censorship settings
    #[serde(default)]
    pub censor: CensorConfig,

    /// Feed retry settings
    #[serde(default)]
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewConfig {
    /// Fixed viewport height the projector pads to
    #[serde(default = "default_viewport_height")]
    pub viewport_height: i32,

    /// Placeholder glyph for filler lines
    #[serde(default = "default_filler_glyph")]
    pub filler_glyph: String,

    /// Trailing marker for pinned messages
    #[serde(default = "default_pin_glyph")]
    pub pin_glyph: char,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            viewport_height: default_viewport_height(),
            filler_glyph: default_filler_glyph(),
            pin_glyph: default_pin_glyph(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CensorConfig {
    /// Whether to censor message bodies at all
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Run the robust (obfuscation-resistant) pass after the whole-word pass
    #[serde(default = "default_true")]
    pub robust: bool,
}

impl Default for CensorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            robust: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Transient-failure retry attempts per bind step
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    /// Backoff between retries, in milliseconds
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            retry_attempts: default_retry_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
        }
    }
}

fn default_viewport_height() -> i32 {
    20
}
fn default_filler_glyph() -> String {
    ".".into()
}
fn default_pin_glyph() -> char {
    '\u{2022}' // '•'
}
fn default_true() -> bool {
    true
}
fn default_retry_attempts() -> u32 {
    3
}
fn default_retry_backoff_ms() -> u64 {
    500
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            view: ViewConfig::default(),
            censor: CensorConfig::default(),
            feed: FeedConfig::default(),
        }
    }
}

impl AppConfig {
    /// The default config file path: `~/.parley/config.toml`.
    pub fn default_path() -> PathBuf {
        std::env::var_os("HOME")
            .map(PathBuf::from)
            .unwrap_or_default()
            .join(".parley")
            .join("config.toml")
    }

    /// Load from the default path, falling back to defaults if the file
    /// does not exist, then apply env overrides and validate.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load and parse a specific file (no env overrides, no validation).
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&raw)?)
    }

    /// Scalar overrides from the environment:
    /// `PARLEY_VIEWPORT_HEIGHT`, `PARLEY_CENSOR_ENABLED`, `PARLEY_RETRY_ATTEMPTS`.
    pub fn apply_env_overrides(&mut self) {
        if let Some(height) = env_parse::<i32>("PARLEY_VIEWPORT_HEIGHT") {
            self.view.viewport_height = height;
        }
        if let Some(enabled) = env_parse::<bool>("PARLEY_CENSOR_ENABLED") {
            self.censor.enabled = enabled;
        }
        if let Some(attempts) = env_parse::<u32>("PARLEY_RETRY_ATTEMPTS") {
            self.feed.retry_attempts = attempts;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.viewport_height < 0 {
            return Err(ConfigError::Invalid(format!(
                "view.viewport_height must be >= 0, got {}",
                self.view.viewport_height
            )));
        }
        if self.view.filler_glyph.is_empty() {
            return Err(ConfigError::Invalid(
                "view.filler_glyph must not be empty".into(),
            ));
        }
        if self.feed.retry_attempts == 0 {
            return Err(ConfigError::Invalid(
                "feed.retry_attempts must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn env_parse<T: std::str::FromStr>(var: &str) -> Option<T> {
    std::env::var(var).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_are_valid() {
        let config = AppConfig::default();
        config.validate().unwrap();
        assert_eq!(config.view.viewport_height, 20);
        assert_eq!(config.view.filler_glyph, ".");
        assert_eq!(config.view.pin_glyph, '\u{2022}');
        assert!(config.censor.enabled);
        assert_eq!(config.feed.retry_attempts, 3);
    }

    #[test]
    fn empty_file_yields_defaults() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.view.viewport_height, 20);
        assert!(config.censor.robust);
    }

    #[test]
    fn partial_file_overrides_only_named_fields() {
        let config: AppConfig = toml::from_str(
            r#"
            [view]
            viewport_height = 12

            [censor]
            robust = false
            "#,
        )
        .unwrap();
        assert_eq!(config.view.viewport_height, 12);
        assert_eq!(config.view.filler_glyph, ".");
        assert!(config.censor.enabled);
        assert!(!config.censor.robust);
    }

    #[test]
    fn load_from_reads_a_real_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[feed]\nretry_attempts = 7").unwrap();
        let config = AppConfig::load_from(file.path()).unwrap();
        assert_eq!(config.feed.retry_attempts, 7);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let mut config = AppConfig::default();
        config.view.viewport_height = -1;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.feed.retry_attempts = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.view.filler_glyph.clear();
        assert!(config.validate().is_err());
    }
}
