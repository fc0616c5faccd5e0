//! Account-scoped application data
//!
//! Feature code (counters, streaks, preferences) stores values through an
//! [`AccountDataManager`]. Every value is written under
//! `account_<accountId>_<key>` to each durable backend, so data of different
//! accounts never shares a key.
//!
//! The active account additionally has a *working area*: un-namespaced copies
//! of its values in the per-tab session store (`working_<key>`), cheap to
//! update while the user is counting. Switching accounts is a two-phase
//! operation. The working area is first flushed into the previous account's
//! namespace and cleared, then hydrated from the next account's namespace.
//! Nothing written while one account was active can therefore show up in the
//! working area of another.

pub mod errors;

use std::sync::Arc;

use serde::{Serialize, de::DeserializeOwned};
use tokio::sync::RwLock;

pub use errors::DataError;

use crate::{
    Result,
    constants::{WORKING_PREFIX, account_prefix},
    events::{BusEvent, BusMessage, SessionEventBus, TabId},
    storage::{DeviceStorage, KeyValueStore, Replicated},
};

/// Namespaced key of `key` for `account_id`.
pub fn account_key(account_id: &str, key: &str) -> String {
    format!("{}{key}", account_prefix(account_id))
}

fn working_key(key: &str) -> String {
    format!("{WORKING_PREFIX}{key}")
}

/// Account ids become the middle of `account_<id>_<key>`, so an id holding
/// the separator would share a prefix with another account's keys.
fn validate_account_id(account_id: &str) -> Result<()> {
    let reason = if account_id.is_empty() {
        "account id must not be empty"
    } else if account_id.contains('_') {
        "account id must not contain '_'"
    } else {
        return Ok(());
    };
    Err(DataError::InvalidAccountId {
        account_id: account_id.to_string(),
        reason,
    }
    .into())
}

fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(DataError::InvalidKey {
            key: key.to_string(),
            reason: "key must not be empty",
        }
        .into());
    }
    Ok(())
}

/// Reads and writes data on behalf of accounts.
#[derive(Debug)]
pub struct AccountDataManager {
    working: Arc<dyn KeyValueStore>,
    durable: Replicated,
    active: RwLock<Option<String>>,
    bus: SessionEventBus,
    tab: TabId,
}

impl AccountDataManager {
    pub fn new(storage: &DeviceStorage, bus: SessionEventBus, tab: TabId) -> Self {
        Self {
            working: storage.session().clone(),
            durable: storage.durable("account-data"),
            active: RwLock::new(None),
            bus,
            tab,
        }
    }

    /// The account whose data is in the working area.
    pub async fn active_account_id(&self) -> Option<String> {
        self.active.read().await.clone()
    }

    async fn resolve(&self, account_id: Option<&str>) -> Result<String> {
        match account_id {
            Some(id) => {
                validate_account_id(id)?;
                Ok(id.to_string())
            }
            None => self
                .active_account_id()
                .await
                .ok_or_else(|| DataError::NoAccountContext.into()),
        }
    }

    async fn is_active(&self, account_id: &str) -> bool {
        self.active.read().await.as_deref() == Some(account_id)
    }

    /// Store `value` under `key` for `account_id`, or for the active account.
    ///
    /// Writes go to every durable backend; a write to the active account is
    /// mirrored into the working area as well.
    pub async fn store_account_data(
        &self,
        key: &str,
        value: &str,
        account_id: Option<&str>,
    ) -> Result<()> {
        validate_key(key)?;
        let account_id = self.resolve(account_id).await?;
        self.durable.set(&account_key(&account_id, key), value).await?;
        if self.is_active(&account_id).await {
            self.working.set(&working_key(key), value).await?;
        }
        tracing::debug!(%account_id, key, "Stored account data");
        Ok(())
    }

    /// Read `key` for `account_id`, or for the active account.
    ///
    /// For the active account the working area is consulted first, since it
    /// may hold values not yet flushed. Otherwise the durable backends are
    /// read most durable first.
    pub async fn get_account_data(
        &self,
        key: &str,
        account_id: Option<&str>,
    ) -> Result<Option<String>> {
        validate_key(key)?;
        let account_id = self.resolve(account_id).await?;
        if self.is_active(&account_id).await {
            match self.working.get(&working_key(key)).await {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => tracing::warn!(key, error = %e, "Working area unreadable"),
            }
        }
        self.durable.get(&account_key(&account_id, key)).await
    }

    /// [`store_account_data`](Self::store_account_data) for any serializable value.
    pub async fn store_account_json<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        account_id: Option<&str>,
    ) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store_account_data(key, &json, account_id).await
    }

    /// [`get_account_data`](Self::get_account_data), deserialized.
    pub async fn get_account_json<T: DeserializeOwned>(
        &self,
        key: &str,
        account_id: Option<&str>,
    ) -> Result<Option<T>> {
        match self.get_account_data(key, account_id).await? {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    /// Update the working area of the active account.
    ///
    /// The value reaches the account's namespace on the next flush.
    pub async fn set_working_value(&self, key: &str, value: &str) -> Result<()> {
        validate_key(key)?;
        if self.active.read().await.is_none() {
            return Err(DataError::NoAccountContext.into());
        }
        self.working.set(&working_key(key), value).await
    }

    /// Read the working area of the active account.
    pub async fn get_working_value(&self, key: &str) -> Result<Option<String>> {
        validate_key(key)?;
        if self.active.read().await.is_none() {
            return Err(DataError::NoAccountContext.into());
        }
        self.working.get(&working_key(key)).await
    }

    /// Working area contents as `(key, value)` pairs, prefix stripped.
    async fn working_entries(&self) -> Result<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for full_key in self.working.keys(WORKING_PREFIX).await? {
            let Some(key) = full_key.strip_prefix(WORKING_PREFIX) else {
                continue;
            };
            if let Some(value) = self.working.get(&full_key).await? {
                entries.push((key.to_string(), value));
            }
        }
        Ok(entries)
    }

    async fn flush_working(&self, account_id: &str) -> Result<usize> {
        let entries = self.working_entries().await?;
        for (key, value) in &entries {
            self.durable.set(&account_key(account_id, key), value).await?;
        }
        if !entries.is_empty() {
            tracing::debug!(%account_id, keys = entries.len(), "Flushed working area");
        }
        Ok(entries.len())
    }

    async fn clear_working(&self) -> Result<()> {
        for key in self.working.keys(WORKING_PREFIX).await? {
            self.working.delete(&key).await?;
        }
        Ok(())
    }

    async fn hydrate_working(&self, account_id: &str) -> Result<usize> {
        let prefix = account_prefix(account_id);
        let keys = self.durable.keys(&prefix).await?;
        let mut loaded = 0usize;
        for full_key in &keys {
            let Some(key) = full_key.strip_prefix(&prefix) else {
                continue;
            };
            if let Some(value) = self.durable.get(full_key).await? {
                self.working.set(&working_key(key), &value).await?;
                loaded += 1;
            }
        }
        tracing::debug!(%account_id, keys = loaded, "Hydrated working area");
        Ok(loaded)
    }

    /// Move the working area from the active account to `to`.
    ///
    /// The working area is flushed into the active account's namespace and
    /// emptied before `to` becomes active and its data is loaded. `from`, when
    /// given, must name the active account.
    pub async fn switch_account_context(&self, from: Option<&str>, to: &str) -> Result<()> {
        validate_account_id(to)?;
        let mut active = self.active.write().await;
        if let Some(from) = from {
            if active.as_deref() != Some(from) {
                return Err(DataError::ContextMismatch {
                    from: from.to_string(),
                    active: active.clone(),
                }
                .into());
            }
        }
        if let Some(previous) = active.as_deref() {
            self.flush_working(previous).await?;
        }
        self.clear_working().await?;
        let previous = active.replace(to.to_string());
        self.hydrate_working(to).await?;
        tracing::info!(from = ?previous, to, "Switched account data context");
        Ok(())
    }

    /// Flush and empty the working area and leave no account active.
    pub async fn release_context(&self) -> Result<()> {
        let mut active = self.active.write().await;
        if let Some(account_id) = active.as_deref() {
            self.flush_working(account_id).await?;
        }
        self.clear_working().await?;
        if let Some(account_id) = active.take() {
            tracing::debug!(%account_id, "Released account data context");
        }
        Ok(())
    }

    /// Delete every namespaced value of `account_id` from all backends.
    ///
    /// Returns the number of keys removed.
    pub async fn clear_account_data(&self, account_id: &str) -> Result<usize> {
        validate_account_id(account_id)?;
        let keys = self.durable.keys(&account_prefix(account_id)).await?;
        for key in &keys {
            self.durable.delete(key).await?;
        }
        if self.is_active(account_id).await {
            self.clear_working().await?;
        }
        tracing::info!(%account_id, keys = keys.len(), "Cleared account data");
        self.bus.publish(
            &self.tab,
            BusEvent::AccountDataCleared {
                account_id: account_id.to_string(),
            },
        );
        Ok(keys.len())
    }

    /// Apply a sibling tab's broadcast. Returns whether local state changed.
    ///
    /// When another tab cleared the account active here, the working area is
    /// dropped without flushing so the deleted data is not written back.
    pub async fn handle_event(&self, message: &BusMessage) -> Result<bool> {
        if message.origin == self.tab {
            return Ok(false);
        }
        let BusEvent::AccountDataCleared { account_id } = &message.event else {
            return Ok(false);
        };
        if !self.is_active(account_id).await {
            return Ok(false);
        }
        self.clear_working().await?;
        tracing::info!(%account_id, origin = %message.origin, "Account data cleared by sibling tab");
        Ok(true)
    }
}
