use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AccountError, EncryptedAccountRecord, NewAccount, Slot, SlotSummary, TransferBody,
    TransferEnvelope, UserAccount,
};
use crate::{
    Clock, Result,
    constants::slot_key,
    crypto::Cipher,
    lockout::{AttemptOutcome, LockoutTracker},
    storage::{DeviceStorage, KeyValueStore, Replicated},
};

/// What a slot currently holds.
enum StoredSlot {
    Empty,
    Record(EncryptedAccountRecord),
    /// Something is there but it is not a record we can parse. Treated as
    /// occupied so it is never silently overwritten.
    Unreadable,
}

/// The accounts stored on one device.
///
/// Slot records are sealed with the account password, so the manager never
/// holds plaintext between calls. Login-like operations ([`switch_to_account`]
/// and [`export_account_qr`]) are gated by the [`LockoutTracker`].
///
/// [`switch_to_account`]: DeviceAccountManager::switch_to_account
/// [`export_account_qr`]: DeviceAccountManager::export_account_qr
#[derive(Debug)]
pub struct DeviceAccountManager {
    device_id: RwLock<String>,
    slots: Replicated,
    cipher: Arc<dyn Cipher>,
    lockout: LockoutTracker,
    clock: Arc<dyn Clock>,
}

impl DeviceAccountManager {
    pub fn new(
        device_id: impl Into<String>,
        storage: &DeviceStorage,
        cipher: Arc<dyn Cipher>,
        lockout: LockoutTracker,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            device_id: RwLock::new(device_id.into()),
            slots: storage.durable("account-slots"),
            cipher,
            lockout,
            clock,
        }
    }

    /// The device id slot keys are namespaced under.
    pub async fn device_id(&self) -> String {
        self.device_id.read().await.clone()
    }

    /// Move to another device id namespace, e.g. after a sibling tab stored
    /// a new id. Slots written under the old id are not carried over.
    pub async fn set_device_id(&self, device_id: &str) {
        let mut current = self.device_id.write().await;
        if *current != device_id {
            tracing::info!(from = %current.as_str(), to = device_id, "Device id namespace changed");
            *current = device_id.to_string();
        }
    }

    async fn slot_key(&self, slot: Slot) -> String {
        slot_key(&self.device_id.read().await, slot.get())
    }

    pub fn lockout(&self) -> &LockoutTracker {
        &self.lockout
    }

    async fn load(&self, slot: Slot) -> Result<StoredSlot> {
        let key = self.slot_key(slot).await;
        let Some(raw) = self.slots.get(&key).await? else {
            return Ok(StoredSlot::Empty);
        };
        match serde_json::from_str(&raw) {
            Ok(record) => Ok(StoredSlot::Record(record)),
            Err(e) => {
                tracing::warn!(%slot, error = %e, "Unreadable account slot record");
                Ok(StoredSlot::Unreadable)
            }
        }
    }

    async fn write(&self, slot: Slot, record: &EncryptedAccountRecord) -> Result<()> {
        let key = self.slot_key(slot).await;
        self.slots.set(&key, &serde_json::to_string(record)?).await
    }

    async fn seal(&self, account: &UserAccount, password: &str) -> Result<EncryptedAccountRecord> {
        let plaintext = serde_json::to_vec(account)?;
        Ok(EncryptedAccountRecord {
            encrypted_data: self.cipher.encrypt_to_string(&plaintext, password)?,
            created_at: account.created_at,
            last_login: account.last_login,
            device_fingerprint: self.device_id().await,
        })
    }

    /// Decrypt a record. `None` covers wrong passwords and corrupted data alike.
    fn open(&self, record: &EncryptedAccountRecord, password: &str) -> Result<Option<UserAccount>> {
        let plaintext = match self.cipher.decrypt_from_str(&record.encrypted_data, password) {
            Ok(plaintext) => plaintext,
            Err(crate::Error::Crypto(e)) if e.is_decryption_error() => return Ok(None),
            Err(e) => return Err(e),
        };
        match serde_json::from_slice(&plaintext) {
            Ok(account) => Ok(Some(account)),
            Err(e) => {
                tracing::warn!(error = %e, "Decrypted account record is malformed");
                Ok(None)
            }
        }
    }

    async fn first_free_slot(&self) -> Result<Slot> {
        for slot in Slot::all() {
            if matches!(self.load(slot).await?, StoredSlot::Empty) {
                return Ok(slot);
            }
        }
        Err(AccountError::DeviceFull.into())
    }

    async fn ensure_unlocked(&self, slot: Slot) -> Result<()> {
        if self.lockout.check_lockout_status(slot).await? {
            let remaining_ms = self.lockout.get_remaining_lockout_time(slot).await?;
            return Err(AccountError::AccountLocked { remaining_ms }.into());
        }
        Ok(())
    }

    /// Count a failed password against `slot` and build the matching error.
    async fn reject(&self, slot: Slot) -> Result<crate::Error> {
        let err = match self.lockout.record_failed_attempt(slot).await? {
            AttemptOutcome::Remaining(attempts_remaining) => {
                AccountError::InvalidCredentials { attempts_remaining }
            }
            AttemptOutcome::LockedOut { until_ms } => AccountError::AccountLocked {
                remaining_ms: until_ms.saturating_sub(self.clock.now_millis()),
            },
        };
        Ok(err.into())
    }

    /// Unlock the account in `slot`, counting failures against the lockout.
    async fn authenticate(&self, slot: Slot, password: &str) -> Result<UserAccount> {
        self.ensure_unlocked(slot).await?;
        let record = match self.load(slot).await? {
            StoredSlot::Empty => return Err(AccountError::SlotEmpty { slot: slot.get() }.into()),
            StoredSlot::Record(record) => Some(record),
            StoredSlot::Unreadable => None,
        };
        let account = match record {
            Some(record) => self.open(&record, password)?,
            None => None,
        };
        match account {
            Some(account) => Ok(account),
            None => {
                tracing::info!(%slot, "Rejected password for account slot");
                Err(self.reject(slot).await?)
            }
        }
    }

    /// Create an account in the lowest free slot.
    pub async fn create_account_on_device(
        &self,
        new: NewAccount<'_>,
    ) -> Result<(UserAccount, Slot)> {
        let slot = self.first_free_slot().await?;
        let now = self.clock.now_utc();
        let account = UserAccount {
            id: Uuid::new_v4().to_string(),
            name: new.name.to_string(),
            date_of_birth: new.date_of_birth,
            created_at: now,
            last_login: now,
            symbol: new.symbol.map(str::to_string),
            slot,
            chanting_stats: BTreeMap::new(),
            device_fingerprint: Some(self.device_id().await),
        };

        let record = self.seal(&account, new.password).await?;
        self.write(slot, &record).await?;
        tracing::info!(%slot, account_id = %account.id, "Created account");
        Ok((account, slot))
    }

    /// Decrypt the account in `slot` with `password`.
    ///
    /// On success the attempt counter is cleared and `lastLogin` is refreshed
    /// in the stored record. Persisting the session pointer is left to the
    /// caller.
    pub async fn switch_to_account(&self, slot: Slot, password: &str) -> Result<UserAccount> {
        let mut account = self.authenticate(slot, password).await?;
        self.lockout.clear_attempts(slot).await?;

        account.last_login = self.clock.now_utc();
        account.slot = slot;
        let record = self.seal(&account, password).await?;
        self.write(slot, &record).await?;
        tracing::info!(%slot, account_id = %account.id, "Switched to account");
        Ok(account)
    }

    /// Store a transferred account in the lowest free slot.
    ///
    /// The slot is sealed with the secret carried in the payload or, when the
    /// exporter left it out, with `password`. The imported account gets a
    /// fresh id and the new slot number; its profile and statistics are kept.
    pub async fn import_account_to_device(
        &self,
        payload: &str,
        password: Option<&str>,
    ) -> Result<(UserAccount, Slot)> {
        let slot = self.first_free_slot().await?;
        let envelope = TransferEnvelope::decode(payload)?;
        let body = envelope.open(self.cipher.as_ref())?;

        let secret = match (body.secret.as_deref(), password) {
            (Some(secret), _) => secret,
            (None, Some(password)) => password,
            (None, None) => {
                return Err(AccountError::InvalidPayload {
                    reason: "payload carries no secret and no password was given".to_string(),
                }
                .into());
            }
        };

        let account = UserAccount {
            id: Uuid::new_v4().to_string(),
            last_login: self.clock.now_utc(),
            slot,
            device_fingerprint: Some(self.device_id().await),
            ..body.account
        };
        let record = self.seal(&account, secret).await?;
        self.write(slot, &record).await?;
        tracing::info!(
            %slot,
            account_id = %account.id,
            source_device = %envelope.device_fingerprint,
            "Imported account"
        );
        Ok((account, slot))
    }

    /// Build a QR transfer payload for the account in `slot`.
    ///
    /// `password` must be the slot's password; a wrong one counts against the
    /// lockout like a failed login. With `include_secret` the password travels
    /// in the payload so the importing device needs no extra input.
    pub async fn export_account_qr(
        &self,
        slot: Slot,
        password: &str,
        include_secret: bool,
    ) -> Result<String> {
        let account = self.authenticate(slot, password).await?;
        let body = TransferBody {
            account,
            secret: include_secret.then(|| password.to_string()),
        };
        let envelope = TransferEnvelope::seal(
            &body,
            &self.device_id().await,
            self.clock.now_utc(),
            self.cipher.as_ref(),
        )?;
        tracing::info!(%slot, include_secret, "Exported account");
        envelope.encode()
    }

    /// Empty `slot`. Removing an empty slot is a no-op.
    pub async fn remove_account_from_device(&self, slot: Slot) -> Result<()> {
        if matches!(self.load(slot).await?, StoredSlot::Empty) {
            tracing::info!(%slot, "Account slot already empty");
            return Ok(());
        }
        self.slots.delete(&self.slot_key(slot).await).await?;
        self.lockout.clear_attempts(slot).await?;
        tracing::info!(%slot, "Removed account from device");
        Ok(())
    }

    /// One summary per slot, in slot order.
    pub async fn get_device_accounts(&self) -> Result<Vec<SlotSummary>> {
        let mut summaries = Vec::new();
        for slot in Slot::all() {
            summaries.push(match self.load(slot).await? {
                StoredSlot::Empty => SlotSummary::empty(slot),
                StoredSlot::Record(record) => SlotSummary::occupied(slot, &record),
                StoredSlot::Unreadable => SlotSummary {
                    is_empty: false,
                    ..SlotSummary::empty(slot)
                },
            });
        }
        Ok(summaries)
    }

    pub async fn occupied_slot_count(&self) -> Result<usize> {
        Ok(self
            .get_device_accounts()
            .await?
            .iter()
            .filter(|s| !s.is_empty)
            .count())
    }

    pub async fn has_any_accounts(&self) -> Result<bool> {
        Ok(self.occupied_slot_count().await? > 0)
    }

    /// Empty slots, lowest first.
    pub async fn available_slots(&self) -> Result<Vec<Slot>> {
        Ok(self
            .get_device_accounts()
            .await?
            .into_iter()
            .filter(|s| s.is_empty)
            .map(|s| s.slot)
            .collect())
    }
}
