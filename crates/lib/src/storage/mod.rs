//! Storage backends for the identity core
//!
//! Every place the core persists state (device id copies, account slots,
//! lockout records, the session pointer, account-scoped data) goes through the
//! [`KeyValueStore`] capability. Backends are ranked and combined rather than
//! special-cased:
//!
//! * [`MemoryStore`] - a map behind a lock; models session-scoped and in-page locations.
//! * [`JsonFileStore`] - a JSON map persisted to disk; models the primary persistent
//!   store and the embedded document store.
//! * [`Replicated`] - a ranked list of stores with fan-out writes and ordered reads.
//! * [`DeviceStorage`] - the set of backends available to one browser profile.

mod device_storage;
pub mod errors;
mod file;
mod memory;
mod replicated;

use std::fmt::Debug;

use async_trait::async_trait;

use crate::Result;

pub use device_storage::DeviceStorage;
pub use errors::StorageError;
pub use file::JsonFileStore;
pub use memory::MemoryStore;
pub use replicated::Replicated;

/// A string key-value store.
///
/// All operations are asynchronous because the backends they model (IndexedDB
/// transactions, file writes) are suspension points.
#[async_trait]
pub trait KeyValueStore: Send + Sync + Debug {
    /// Human-readable backend name, used in logs and errors.
    fn name(&self) -> &str;

    /// Read a value. A missing key is `Ok(None)`, not an error.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value, replacing any previous one.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Delete a value. Deleting a missing key succeeds.
    async fn delete(&self, key: &str) -> Result<()>;

    /// List every key starting with `prefix`, in sorted order.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>>;
}
