//! # Session Configuration
//!
//! Loaded once when a session is created and never changed afterwards.
//!
//! ```toml
//! gravity = { x = 0.0, y = -10.0, z = 0.0 }
//! tolerance = 0.001
//! step = 0.016666668
//! capacity = 256
//! ```
//!
//! Every key is optional; missing keys take the defaults.

use std::path::{Path, PathBuf};

use physbridge_core::ControllerMessage;
use physbridge_shared::{Vec3, DEFAULT_CAPACITY, DEFAULT_GRAVITY, DEFAULT_STEP, DEFAULT_TOLERANCE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The TOML did not parse into a configuration.
    #[error("invalid session config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value is out of range.
    #[error("invalid session config value: {0}")]
    Invalid(&'static str),
}

/// Parameters of one simulation session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Gravity vector
    pub gravity: Vec3,
    /// Solver tolerance
    pub tolerance: f32,
    /// Fixed step duration in seconds
    pub step: f32,
    /// Initial body slots in each transform buffer
    pub capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            gravity: DEFAULT_GRAVITY,
            tolerance: DEFAULT_TOLERANCE,
            step: DEFAULT_STEP,
            capacity: DEFAULT_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Configuration with the given parameters and default capacity.
    #[must_use]
    pub fn new(gravity: Vec3, tolerance: f32, step: f32) -> Self {
        Self {
            gravity,
            tolerance,
            step,
            ..Self::default()
        }
    }

    /// Sets the initial buffer capacity.
    #[must_use]
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Parse`] for malformed TOML or unknown keys,
    /// [`ConfigError::Invalid`] for out-of-range values.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Io`] if the file cannot be read, otherwise as
    /// [`from_toml_str`](Self::from_toml_str).
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml_str(&source)?;
        tracing::debug!(path = %path.display(), ?config, "session config loaded");
        Ok(config)
    }

    /// Checks value ranges.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.gravity.is_finite() {
            return Err(ConfigError::Invalid("gravity must be finite"));
        }
        if !self.tolerance.is_finite() || self.tolerance < 0.0 {
            return Err(ConfigError::Invalid("tolerance must be >= 0"));
        }
        if !self.step.is_finite() || self.step <= 0.0 {
            return Err(ConfigError::Invalid("step must be > 0"));
        }
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be > 0"));
        }
        Ok(())
    }

    /// The `init` message for these parameters.
    #[must_use]
    pub fn init_message(&self) -> ControllerMessage {
        ControllerMessage::Init {
            gravity: self.gravity,
            tolerance: self.tolerance,
            step: self.step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SessionConfig::default();
        assert_eq!(config.gravity, Vec3::new(0.0, -9.81, 0.0));
        assert_eq!(config.capacity, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SessionConfig::from_toml_str(
            r"
            gravity = { x = 0.0, y = -10.0, z = 0.0 }
            capacity = 16
            ",
        )
        .unwrap();

        assert_eq!(config.gravity, Vec3::new(0.0, -10.0, 0.0));
        assert_eq!(config.capacity, 16);
        assert_eq!(config.tolerance, DEFAULT_TOLERANCE);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SessionConfig::from_toml_str("step = 0.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("tolerance = -1.0"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            SessionConfig::from_toml_str("capacity = 0"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_rejects_unknown_keys() {
        assert!(matches!(
            SessionConfig::from_toml_str("gravty = { x = 0.0, y = 0.0, z = 0.0 }"),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let err = SessionConfig::load("/nonexistent/physbridge.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn test_init_message() {
        let config = SessionConfig::new(Vec3::ZERO, 0.01, 0.02);
        match config.init_message() {
            ControllerMessage::Init { tolerance, step, .. } => {
                assert_eq!(tolerance, 0.01);
                assert_eq!(step, 0.02);
            }
            other => panic!("expected init, got {}", other.op()),
        }
    }
}
