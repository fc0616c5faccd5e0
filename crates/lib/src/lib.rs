//!
//! Sadhana: the device-bound identity core of a mantra practice tracker.
//! This library keeps up to three password-protected accounts per device, each
//! with its own isolated application data, entirely in local storage.
//!
//! ## Core Concepts
//!
//! * **Device id (`device_id::DeviceIdStore`)**: A best-effort identifier derived from
//!   environment signals (`fingerprint::FingerprintGenerator`) and copied into every
//!   available storage location so that it survives partial clears.
//! * **Slots (`account::Slot`)**: The three fixed account positions of a device. Each
//!   occupied slot holds one password-sealed account record (`account::DeviceAccountManager`).
//! * **Lockout (`lockout::LockoutTracker`)**: Three consecutive wrong passwords lock a slot
//!   for five minutes.
//! * **Sessions (`session::SessionCoordinator`)**: The per-tab context. Every tab starts
//!   logged out; logins and logouts are broadcast to sibling tabs over the
//!   `events::SessionEventBus`.
//! * **Account-scoped data (`data::AccountDataManager`)**: Application data namespaced by
//!   account id and replicated across storage backends (`storage::Replicated`).
//!
//! This is device recognition and casual at-rest confidentiality, not a
//! security boundary against someone with full access to the device's storage.

pub mod account;
pub mod clock;
pub mod config;
pub mod constants;
pub mod crypto;
pub mod data;
pub mod device_id;
pub mod events;
pub mod fingerprint;
pub mod lockout;
pub mod session;
pub mod storage;

pub use clock::{Clock, SystemClock};
#[cfg(any(test, feature = "testing"))]
pub use clock::FixedClock;
pub use config::Config;
/// Re-export the coordinator, the usual entry point.
pub use session::SessionCoordinator;

/// Result type used throughout the Sadhana library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Sadhana library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured storage errors from the storage module
    #[error(transparent)]
    Storage(storage::StorageError),

    /// Structured encryption errors from the crypto module
    #[error(transparent)]
    Crypto(crypto::CryptoError),

    /// Structured slot and login errors from the account module
    #[error(transparent)]
    Account(account::AccountError),

    /// Structured errors from the account-scoped data module
    #[error(transparent)]
    Data(data::DataError),

    /// Structured probe errors from the fingerprint module
    #[error(transparent)]
    Fingerprint(fingerprint::FingerprintError),

    /// Structured configuration errors
    #[error(transparent)]
    Config(config::ConfigError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Storage(_) => "storage",
            Error::Crypto(_) => "crypto",
            Error::Account(_) => "account",
            Error::Data(_) => "data",
            Error::Fingerprint(_) => "fingerprint",
            Error::Config(_) => "config",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// Check if this error indicates a resource was not found.
    pub fn is_not_found(&self) -> bool {
        match self {
            Error::Account(account_err) => account_err.is_not_found(),
            _ => false,
        }
    }

    /// Check if this error is authentication-related.
    pub fn is_authentication_error(&self) -> bool {
        match self {
            Error::Account(account_err) => account_err.is_authentication_error(),
            _ => false,
        }
    }

    /// Check if this error is storage-related.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// Check if every redundant storage backend failed.
    pub fn is_storage_unavailable(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_unavailable(),
            _ => false,
        }
    }

    /// Check if this error indicates a data integrity issue.
    pub fn is_integrity_error(&self) -> bool {
        match self {
            Error::Storage(storage_err) => storage_err.is_integrity_error(),
            _ => false,
        }
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        match self {
            Error::Io(_) => true,
            Error::Storage(storage_err) => storage_err.is_io_error(),
            _ => false,
        }
    }

    /// Check if this error was caused by invalid caller input.
    pub fn is_validation_error(&self) -> bool {
        match self {
            Error::Account(account_err) => account_err.is_validation_error(),
            Error::Data(data_err) => data_err.is_validation_error(),
            Error::Config(_) => true,
            _ => false,
        }
    }

    /// Check if this error came from loading configuration.
    pub fn is_config_error(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Check if this error is crypto-related.
    pub fn is_crypto_error(&self) -> bool {
        matches!(self, Error::Crypto(_))
    }

    /// Check if every account slot on the device is taken.
    pub fn is_device_full(&self) -> bool {
        matches!(self, Error::Account(account::AccountError::DeviceFull))
    }

    /// Check if this error is a rejected password.
    pub fn is_invalid_credentials(&self) -> bool {
        matches!(
            self,
            Error::Account(account::AccountError::InvalidCredentials { .. })
        )
    }

    /// Check if the slot is locked after repeated failures.
    pub fn is_account_locked(&self) -> bool {
        matches!(
            self,
            Error::Account(account::AccountError::AccountLocked { .. })
        )
    }

    /// Check if a transfer payload could not be used.
    pub fn is_invalid_payload(&self) -> bool {
        matches!(
            self,
            Error::Account(account::AccountError::InvalidPayload { .. })
        )
    }

    /// Check if a data call had no account to act for.
    pub fn is_no_account_context(&self) -> bool {
        matches!(self, Error::Data(data::DataError::NoAccountContext))
    }
}
