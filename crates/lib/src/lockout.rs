//! Failed-login tracking and time-boxed lockout per account slot
//!
//! Each slot has a failed-attempt counter (`attempts_<slot>`) and an optional
//! lockout expiry (`lockout_<slot>`, epoch milliseconds). Reaching the attempt
//! ceiling sets the expiry and resets the counter, so the first attempt after
//! a lockout starts a fresh cycle. Expiry is evaluated lazily: the record is
//! removed by the first check that observes `now > expiry`.

use std::sync::Arc;

use crate::{
    Clock, Config, Result,
    account::Slot,
    constants::{ATTEMPTS_PREFIX, LOCKOUT_PREFIX},
    storage::KeyValueStore,
};

/// Result of recording a failed attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The slot is still open; this many attempts remain before lockout.
    Remaining(u32),
    /// The ceiling was reached; the slot is locked until this time.
    LockedOut { until_ms: u64 },
}

/// Per-slot attempt counter and lockout window.
#[derive(Debug, Clone)]
pub struct LockoutTracker {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    max_attempts: u32,
    duration_ms: u64,
}

impl LockoutTracker {
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>, config: &Config) -> Self {
        Self {
            store,
            clock,
            max_attempts: config.max_failed_attempts,
            duration_ms: config.lockout_duration_ms,
        }
    }

    fn attempts_key(slot: Slot) -> String {
        format!("{ATTEMPTS_PREFIX}{slot}")
    }

    fn lockout_key(slot: Slot) -> String {
        format!("{LOCKOUT_PREFIX}{slot}")
    }

    async fn read_number(&self, key: &str) -> Result<Option<u64>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };
        match raw.trim().parse::<u64>() {
            Ok(n) => Ok(Some(n)),
            Err(_) => {
                tracing::warn!(key, "Ignoring unparseable lockout record");
                Ok(None)
            }
        }
    }

    /// Active lockout expiry, clearing the record if it has passed.
    async fn active_expiry(&self, slot: Slot) -> Result<Option<u64>> {
        let Some(expiry) = self.read_number(&Self::lockout_key(slot)).await? else {
            return Ok(None);
        };
        if self.clock.now_millis() > expiry {
            tracing::info!(%slot, "Lockout expired");
            self.clear_attempts(slot).await?;
            return Ok(None);
        }
        Ok(Some(expiry))
    }

    /// Whether `slot` is currently locked.
    pub async fn check_lockout_status(&self, slot: Slot) -> Result<bool> {
        Ok(self.active_expiry(slot).await?.is_some())
    }

    /// Milliseconds until the lockout on `slot` ends; 0 when not locked.
    pub async fn get_remaining_lockout_time(&self, slot: Slot) -> Result<u64> {
        Ok(self
            .active_expiry(slot)
            .await?
            .map(|expiry| expiry.saturating_sub(self.clock.now_millis()))
            .unwrap_or(0))
    }

    /// Current consecutive failure count for `slot`.
    pub async fn failed_attempts(&self, slot: Slot) -> Result<u32> {
        self.active_expiry(slot).await?;
        Ok(self
            .read_number(&Self::attempts_key(slot))
            .await?
            .map(|n| n.min(u32::MAX as u64) as u32)
            .unwrap_or(0))
    }

    /// Count a failed login on `slot`, locking it on the final strike.
    pub async fn record_failed_attempt(&self, slot: Slot) -> Result<AttemptOutcome> {
        let attempts = self.failed_attempts(slot).await?.saturating_add(1);

        if attempts >= self.max_attempts {
            let until_ms = self.clock.now_millis().saturating_add(self.duration_ms);
            self.store
                .set(&Self::lockout_key(slot), &until_ms.to_string())
                .await?;
            self.store.delete(&Self::attempts_key(slot)).await?;
            tracing::warn!(%slot, until_ms, "Slot locked after repeated failed logins");
            return Ok(AttemptOutcome::LockedOut { until_ms });
        }

        self.store
            .set(&Self::attempts_key(slot), &attempts.to_string())
            .await?;
        let remaining = self.max_attempts - attempts;
        tracing::debug!(%slot, attempts, remaining, "Recorded failed login");
        Ok(AttemptOutcome::Remaining(remaining))
    }

    /// Reset the counter and any lockout on `slot`.
    pub async fn clear_attempts(&self, slot: Slot) -> Result<()> {
        self.store.delete(&Self::attempts_key(slot)).await?;
        self.store.delete(&Self::lockout_key(slot)).await?;
        Ok(())
    }
}
