//! Core data types for device accounts

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::AccountError;
use crate::constants::MAX_ACCOUNT_SLOTS;

/// One of the fixed account positions on a device, numbered from 1.
///
/// Slot numbers are stable: removing slot 1 does not renumber slot 2.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Slot(u8);

impl Slot {
    /// Validate a slot number.
    pub fn new(n: u8) -> Result<Self, AccountError> {
        if (1..=MAX_ACCOUNT_SLOTS).contains(&n) {
            Ok(Self(n))
        } else {
            Err(AccountError::InvalidSlot { slot: n })
        }
    }

    pub fn get(self) -> u8 {
        self.0
    }

    /// Every slot, lowest first.
    pub fn all() -> impl Iterator<Item = Slot> {
        (1..=MAX_ACCOUNT_SLOTS).map(Slot)
    }
}

impl TryFrom<u8> for Slot {
    type Error = AccountError;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        Slot::new(n)
    }
}

impl From<Slot> for u8 {
    fn from(slot: Slot) -> u8 {
        slot.0
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A decrypted account. Only exists in memory after a successful login,
/// creation or import.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    /// Random UUID; namespaces the account's data.
    pub id: String,
    pub name: String,
    pub date_of_birth: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    /// Chosen symbol or avatar
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub symbol: Option<String>,
    pub slot: Slot,
    /// Feature-owned statistics, opaque to the identity core.
    #[serde(default)]
    pub chanting_stats: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_fingerprint: Option<String>,
}

/// What a slot holds on disk.
///
/// Only `encrypted_data` is secret; the timestamps are kept in the clear so
/// the account picker can show them without a password.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EncryptedAccountRecord {
    /// Base64 of the sealed [`UserAccount`] JSON.
    pub encrypted_data: String,
    pub created_at: DateTime<Utc>,
    pub last_login: DateTime<Utc>,
    /// Device id at the time the slot was filled.
    pub device_fingerprint: String,
}

/// Picker view of one slot.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotSummary {
    pub slot: Slot,
    pub is_empty: bool,
    pub created_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub device_fingerprint: Option<String>,
    /// Filled only for the slot the current tab is logged into.
    pub account: Option<UserAccount>,
}

impl SlotSummary {
    pub(crate) fn empty(slot: Slot) -> Self {
        Self {
            slot,
            is_empty: true,
            created_at: None,
            last_login: None,
            device_fingerprint: None,
            account: None,
        }
    }

    pub(crate) fn occupied(slot: Slot, record: &EncryptedAccountRecord) -> Self {
        Self {
            slot,
            is_empty: false,
            created_at: Some(record.created_at),
            last_login: Some(record.last_login),
            device_fingerprint: Some(record.device_fingerprint.clone()),
            account: None,
        }
    }
}

/// Input for creating an account.
#[derive(Clone, Debug)]
pub struct NewAccount<'a> {
    pub name: &'a str,
    pub date_of_birth: NaiveDate,
    pub password: &'a str,
    pub symbol: Option<&'a str>,
}
