//! Session and authentication coordination
//!
//! A [`SessionCoordinator`] is the per-tab context object. It owns the
//! device-id store, the account manager, the lockout tracker and the data
//! manager, and holds the authenticated account (if any) in memory.
//!
//! Every coordinator starts unauthenticated. Occupied slots only decide
//! whether the UI shows an account picker or the creation flow; a password is
//! always required to log in. Login and logout are announced to sibling tabs
//! over the [`SessionEventBus`]. A sibling's logout of the same account ends
//! the session here too, while a sibling's login is only reported
//! ([`RemoteSessionChange::LoginObserved`]) and never adopted.

mod pointer;

use std::fmt;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use zeroize::Zeroizing;

pub use pointer::SessionPointer;

use crate::{
    Clock, Config, Result,
    account::{AccountError, DeviceAccountManager, NewAccount, Slot, SlotSummary, UserAccount},
    constants::SESSION_POINTER_KEY,
    crypto::{Cipher, PasswordCipher},
    data::AccountDataManager,
    device_id::DeviceIdStore,
    events::{BusEvent, BusMessage, BusSubscription, SessionEventBus, TabId},
    fingerprint::{DeviceEnvironment, FingerprintGenerator},
    lockout::LockoutTracker,
    storage::{DeviceStorage, KeyValueStore},
};

/// What a sibling tab's broadcast did to this tab.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RemoteSessionChange {
    /// Nothing changed here.
    Ignored,
    /// The cached device id was replaced.
    DeviceIdUpdated,
    /// A sibling logged out the account held here, so this tab logged out too.
    LoggedOut { account_id: String },
    /// A sibling logged in. This tab stays as it was.
    LoginObserved { account_id: String, slot: Slot },
    /// A sibling deleted the data of the active account; the working area was dropped.
    DataCleared { account_id: String },
}

/// The authenticated account and the password that unlocked it.
struct ActiveSession {
    account: UserAccount,
    password: Zeroizing<String>,
}

impl fmt::Debug for ActiveSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveSession")
            .field("account_id", &self.account.id)
            .field("slot", &self.account.slot)
            .finish_non_exhaustive()
    }
}

/// Per-tab identity context.
pub struct SessionCoordinator {
    tab: TabId,
    config: Config,
    clock: Arc<dyn Clock>,
    bus: SessionEventBus,
    shared: Arc<dyn KeyValueStore>,
    fingerprints: FingerprintGenerator,
    device_ids: DeviceIdStore,
    accounts: DeviceAccountManager,
    data: AccountDataManager,
    current: RwLock<Option<ActiveSession>>,
}

impl fmt::Debug for SessionCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionCoordinator")
            .field("tab", &self.tab)
            .finish_non_exhaustive()
    }
}

impl SessionCoordinator {
    /// Open a tab with the default Argon2id/AES-GCM cipher.
    pub async fn open(
        storage: &DeviceStorage,
        environment: Arc<DeviceEnvironment>,
        config: Config,
        clock: Arc<dyn Clock>,
        bus: SessionEventBus,
    ) -> Result<Self> {
        let cipher = Arc::new(PasswordCipher::new(config.kdf.clone()));
        Self::open_with_cipher(storage, environment, config, clock, bus, cipher).await
    }

    /// Open a tab with an explicit [`Cipher`].
    ///
    /// Resolves the device id (generating one on first use) but never
    /// restores a previous login.
    pub async fn open_with_cipher(
        storage: &DeviceStorage,
        environment: Arc<DeviceEnvironment>,
        config: Config,
        clock: Arc<dyn Clock>,
        bus: SessionEventBus,
        cipher: Arc<dyn Cipher>,
    ) -> Result<Self> {
        config.validate()?;
        let tab = TabId::generate();

        let fingerprints = FingerprintGenerator::new(environment, &config, clock.clone());
        let device_ids = DeviceIdStore::new(storage, bus.clone(), tab.clone());
        let device_id = device_ids.get_or_create_device_id(&fingerprints).await;
        tracing::debug!(tab = %tab, %device_id, "Opening session coordinator");

        let lockout = LockoutTracker::new(storage.local().clone(), clock.clone(), &config);
        let accounts =
            DeviceAccountManager::new(device_id, storage, cipher, lockout, clock.clone());
        let data = AccountDataManager::new(storage, bus.clone(), tab.clone());

        Ok(Self {
            tab,
            config,
            clock,
            bus,
            shared: storage.local().clone(),
            fingerprints,
            device_ids,
            accounts,
            data,
            current: RwLock::new(None),
        })
    }

    pub fn tab_id(&self) -> &TabId {
        &self.tab
    }

    /// The device id this tab's account slots are namespaced under.
    pub async fn device_id(&self) -> String {
        self.accounts.device_id().await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn accounts(&self) -> &DeviceAccountManager {
        &self.accounts
    }

    pub fn data(&self) -> &AccountDataManager {
        &self.data
    }

    pub fn device_ids(&self) -> &DeviceIdStore {
        &self.device_ids
    }

    pub fn fingerprint_generator(&self) -> &FingerprintGenerator {
        &self.fingerprints
    }

    pub async fn is_authenticated(&self) -> bool {
        self.current.read().await.is_some()
    }

    /// The logged-in account, if any.
    pub async fn current_account(&self) -> Option<UserAccount> {
        self.current
            .read()
            .await
            .as_ref()
            .map(|session| session.account.clone())
    }

    /// Whether any slot is occupied. Does not authenticate.
    pub async fn check_persisted_session(&self) -> Result<bool> {
        self.accounts.has_any_accounts().await
    }

    /// The shared pointer to the latest login on this device, if readable.
    pub async fn session_pointer(&self) -> Result<Option<SessionPointer>> {
        let Some(raw) = self.shared.get(SESSION_POINTER_KEY).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(pointer) => Ok(Some(pointer)),
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable session pointer");
                Ok(None)
            }
        }
    }

    /// Create an account in the lowest free slot. The new account is not logged in.
    pub async fn create_account(&self, new: NewAccount<'_>) -> Result<(UserAccount, Slot)> {
        self.accounts.create_account_on_device(new).await
    }

    /// Import a QR payload into the lowest free slot.
    pub async fn import_account(
        &self,
        payload: &str,
        password: Option<&str>,
    ) -> Result<(UserAccount, Slot)> {
        self.accounts.import_account_to_device(payload, password).await
    }

    /// Export the logged-in account as a QR payload.
    pub async fn export_current_account(&self, include_secret: bool) -> Result<String> {
        let current = self.current.read().await;
        let session = current.as_ref().ok_or(AccountError::NotAuthenticated)?;
        self.accounts
            .export_account_qr(session.account.slot, &session.password, include_secret)
            .await
    }

    /// Slot summaries, with the account filled in for the logged-in slot.
    pub async fn device_accounts(&self) -> Result<Vec<SlotSummary>> {
        let mut summaries = self.accounts.get_device_accounts().await?;
        if let Some(session) = self.current.read().await.as_ref() {
            for summary in &mut summaries {
                if summary.slot == session.account.slot {
                    summary.account = Some(session.account.clone());
                }
            }
        }
        Ok(summaries)
    }

    pub async fn check_lockout_status(&self, slot: Slot) -> Result<bool> {
        self.accounts.lockout().check_lockout_status(slot).await
    }

    pub async fn get_remaining_lockout_time(&self, slot: Slot) -> Result<u64> {
        self.accounts.lockout().get_remaining_lockout_time(slot).await
    }

    /// Log into `slot` with `password`.
    ///
    /// On success the data context moves from the previous account (if any)
    /// to the new one, the shared session pointer is written, and sibling tabs
    /// are told.
    pub async fn login(&self, slot: Slot, password: &str) -> Result<UserAccount> {
        let mut current = self.current.write().await;
        let account = self.accounts.switch_to_account(slot, password).await?;

        let previous = current.as_ref().map(|session| session.account.id.clone());
        self.data
            .switch_account_context(previous.as_deref(), &account.id)
            .await?;

        let pointer = SessionPointer {
            account_id: account.id.clone(),
            slot,
            login_at: self.clock.now_utc(),
            tab_id: self.tab.clone(),
        };
        self.shared
            .set(SESSION_POINTER_KEY, &serde_json::to_string(&pointer)?)
            .await?;

        *current = Some(ActiveSession {
            account: account.clone(),
            password: Zeroizing::new(password.to_string()),
        });
        drop(current);

        tracing::info!(tab = %self.tab, %slot, account_id = %account.id, "Logged in");
        self.bus.publish(
            &self.tab,
            BusEvent::LoggedIn {
                account_id: account.id.clone(),
                slot,
            },
        );
        Ok(account)
    }

    /// End the session. The working set is flushed into the account's
    /// namespace first; account data is kept.
    ///
    /// The shared pointer is removed only if it still refers to this tab's
    /// login.
    pub async fn logout(&self) -> Result<()> {
        let account_id = self.end_local_session().await?;
        if let Some(pointer) = self.session_pointer().await? {
            if pointer.tab_id == self.tab {
                self.shared.delete(SESSION_POINTER_KEY).await?;
            }
        }
        tracing::info!(tab = %self.tab, account_id = ?account_id, "Logged out");
        self.bus
            .publish(&self.tab, BusEvent::LoggedOut { account_id });
        Ok(())
    }

    /// Like [`logout`](Self::logout), but always removes the shared pointer.
    pub async fn clear_session(&self) -> Result<()> {
        let account_id = self.end_local_session().await?;
        self.shared.delete(SESSION_POINTER_KEY).await?;
        tracing::info!(tab = %self.tab, account_id = ?account_id, "Session cleared");
        self.bus
            .publish(&self.tab, BusEvent::LoggedOut { account_id });
        Ok(())
    }

    /// Drop the in-memory session and release the data context.
    async fn end_local_session(&self) -> Result<Option<String>> {
        let mut current = self.current.write().await;
        self.data.release_context().await?;
        Ok(current.take().map(|session| session.account.id))
    }

    /// Remove the account in `slot` from this device.
    ///
    /// When `slot` is the logged-in one, the tab logs out and the account's
    /// namespaced data is deleted as well. Data of accounts that are not
    /// logged in cannot be located without their password and is left alone.
    pub async fn remove_account(&self, slot: Slot) -> Result<()> {
        let active_id = self
            .current
            .read()
            .await
            .as_ref()
            .filter(|session| session.account.slot == slot)
            .map(|session| session.account.id.clone());

        if let Some(account_id) = active_id {
            self.logout().await?;
            self.data.clear_account_data(&account_id).await?;
        }
        self.accounts.remove_account_from_device(slot).await
    }

    /// Subscribe to sibling tabs' broadcasts.
    pub fn subscribe(&self) -> BusSubscription {
        self.bus.subscribe(&self.tab)
    }

    /// Apply a broadcast from a sibling tab.
    pub async fn handle_event(&self, message: &BusMessage) -> Result<RemoteSessionChange> {
        if message.origin == self.tab {
            return Ok(RemoteSessionChange::Ignored);
        }
        match &message.event {
            BusEvent::DeviceIdStored { device_id } => {
                if self.device_ids.handle_event(message).await {
                    self.accounts.set_device_id(device_id).await;
                    Ok(RemoteSessionChange::DeviceIdUpdated)
                } else {
                    Ok(RemoteSessionChange::Ignored)
                }
            }
            BusEvent::LoggedIn { account_id, slot } => {
                tracing::debug!(origin = %message.origin, %account_id, %slot, "Sibling tab logged in");
                Ok(RemoteSessionChange::LoginObserved {
                    account_id: account_id.clone(),
                    slot: *slot,
                })
            }
            BusEvent::LoggedOut { account_id } => {
                let held = self
                    .current
                    .read()
                    .await
                    .as_ref()
                    .map(|session| session.account.id.clone());
                let Some(held) = held else {
                    return Ok(RemoteSessionChange::Ignored);
                };
                if account_id.as_deref().is_some_and(|id| id != held) {
                    return Ok(RemoteSessionChange::Ignored);
                }
                self.end_local_session().await?;
                tracing::info!(origin = %message.origin, account_id = %held, "Logged out by sibling tab");
                Ok(RemoteSessionChange::LoggedOut { account_id: held })
            }
            BusEvent::AccountDataCleared { account_id } => {
                if self.data.handle_event(message).await? {
                    Ok(RemoteSessionChange::DataCleared {
                        account_id: account_id.clone(),
                    })
                } else {
                    Ok(RemoteSessionChange::Ignored)
                }
            }
        }
    }

    /// Apply sibling broadcasts in the background until the bus closes.
    pub fn spawn_event_listener(self: Arc<Self>) -> JoinHandle<()> {
        let mut subscription = self.subscribe();
        tokio::spawn(async move {
            while let Some(message) = subscription.recv().await {
                match self.handle_event(&message).await {
                    Ok(RemoteSessionChange::Ignored) => {}
                    Ok(change) => tracing::debug!(?change, "Applied sibling tab event"),
                    Err(e) => tracing::warn!(error = %e, "Failed to apply sibling tab event"),
                }
            }
            tracing::debug!(tab = %self.tab, "Session event listener stopped");
        })
    }
}
