//! Runtime configuration for the identity core.
//!
//! Every field has a default, so a partial JSON document (or none at all) is a
//! valid configuration. The slot ceiling is not configurable; see
//! [`crate::constants::MAX_ACCOUNT_SLOTS`].

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::Result;

/// Default Argon2 memory cost in KiB (19 MiB)
pub const DEFAULT_ARGON2_M_COST: u32 = 19 * 1024;
/// Default Argon2 time cost (iterations)
pub const DEFAULT_ARGON2_T_COST: u32 = 2;
/// Default Argon2 parallelism
pub const DEFAULT_ARGON2_P_COST: u32 = 1;
/// Longest device fingerprint, in hex characters
pub const MAX_FINGERPRINT_LENGTH: usize = 16;

/// Errors raised while loading configuration.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid JSON for [`Config`].
    #[error("Invalid configuration")]
    Parse {
        #[source]
        source: serde_json::Error,
    },

    /// A value is outside its allowed range.
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<ConfigError> for crate::Error {
    fn from(err: ConfigError) -> Self {
        crate::Error::Config(err)
    }
}

/// Argon2id cost parameters for password-based key derivation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct KdfParams {
    /// Memory cost in KiB
    pub m_cost: u32,
    /// Iterations
    pub t_cost: u32,
    /// Parallelism
    pub p_cost: u32,
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            m_cost: DEFAULT_ARGON2_M_COST,
            t_cost: DEFAULT_ARGON2_T_COST,
            p_cost: DEFAULT_ARGON2_P_COST,
        }
    }
}

/// Identity core configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    /// Consecutive failures that trigger a lockout.
    pub max_failed_attempts: u32,
    /// Length of a lockout window in milliseconds.
    pub lockout_duration_ms: u64,
    /// Key derivation costs used for slot storage and transfer payloads.
    pub kdf: KdfParams,
    /// Upper bound on the audio fingerprint probe.
    pub audio_probe_timeout_ms: u64,
    /// Number of hex characters kept from the fingerprint digest.
    pub fingerprint_length: usize,
    /// Age after which a transfer payload is considered stale by the UI.
    pub transfer_freshness_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_failed_attempts: 3,
            lockout_duration_ms: 5 * 60 * 1000,
            kdf: KdfParams::default(),
            audio_probe_timeout_ms: 1000,
            fingerprint_length: 16,
            transfer_freshness_ms: 24 * 60 * 60 * 1000,
        }
    }
}

impl Config {
    /// Defaults with cheap key derivation, for tests.
    pub fn for_testing() -> Self {
        Self {
            kdf: KdfParams {
                m_cost: 64,
                t_cost: 1,
                p_cost: 1,
            },
            audio_probe_timeout_ms: 50,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse { source })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file.
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ConfigError::Read {
                path: path.display().to_string(),
                source,
            })?;
        let config = Self::from_json_str(&json)?;
        tracing::debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<()> {
        if self.max_failed_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_failed_attempts",
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if !(4..=MAX_FINGERPRINT_LENGTH).contains(&self.fingerprint_length) {
            return Err(ConfigError::InvalidValue {
                field: "fingerprint_length",
                reason: format!(
                    "{} is outside 4..={MAX_FINGERPRINT_LENGTH}",
                    self.fingerprint_length
                ),
            }
            .into());
        }
        if self.kdf.t_cost == 0 || self.kdf.p_cost == 0 {
            return Err(ConfigError::InvalidValue {
                field: "kdf",
                reason: "time and parallelism costs must be non-zero".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The audio probe timeout as a [`Duration`].
    pub fn audio_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.audio_probe_timeout_ms)
    }
}
