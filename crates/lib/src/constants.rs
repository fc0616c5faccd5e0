//! Constants used throughout the sadhana library.
//!
//! This module provides central definitions for storage keys, key prefixes and
//! other fixed values that make up the persisted state layout.

/// Number of account slots available on a single device.
pub const MAX_ACCOUNT_SLOTS: u8 = 3;

/// Key holding the current-session pointer in the shared store.
pub const SESSION_POINTER_KEY: &str = "current_session";

/// Prefix for account-scoped data keys (`account_<accountId>_<dataKey>`).
pub const ACCOUNT_DATA_PREFIX: &str = "account_";

/// Prefix for keys in the per-tab working area.
pub const WORKING_PREFIX: &str = "working_";

/// Prefix for failed-attempt counters (`attempts_<slot>`).
pub const ATTEMPTS_PREFIX: &str = "attempts_";

/// Prefix for lockout expiry records (`lockout_<slot>`).
pub const LOCKOUT_PREFIX: &str = "lockout_";

/// Device id key in the session-scoped store.
pub const SESSION_DEVICE_KEY: &str = "device_fingerprint";

/// Device id key in the embedded document store.
pub const DOCUMENT_DEVICE_KEY: &str = "device_id";

/// Device id key in the primary persistent store.
pub const LOCAL_DEVICE_KEY: &str = "device_fingerprint";

/// Backup keys in the primary persistent store that also carry the device id.
pub const DECOY_DEVICE_KEYS: &[&str] = &["_dfp_backup", "sys_cache_id"];

/// Device id key used in every miscellaneous fallback location.
pub const FALLBACK_DEVICE_KEY: &str = "device_id";

/// Version tag of the QR transfer envelope.
pub const TRANSFER_VERSION: &str = "1.0";

/// Prefix mixed into the device-derived transfer key.
pub const TRANSFER_KEY_PREFIX: &str = "transfer:";

/// Separator used when joining fingerprint components before hashing.
pub const FINGERPRINT_SEPARATOR: &str = "|";

/// Storage key for an account slot record under a device id.
pub fn slot_key(device_id: &str, slot: u8) -> String {
    format!("device_{device_id}_slot_{slot}")
}

/// Storage key prefix covering every datum of one account.
pub fn account_prefix(account_id: &str) -> String {
    format!("{ACCOUNT_DATA_PREFIX}{account_id}_")
}
