//! Error types for device account slots
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AccountError {
    #[error("All account slots on this device are occupied")]
    DeviceFull,

    #[error("Account slot {slot} is empty")]
    SlotEmpty { slot: u8 },

    /// Wrong password and unreadable records are reported the same way.
    #[error("Invalid password ({attempts_remaining} attempts remaining)")]
    InvalidCredentials { attempts_remaining: u32 },

    #[error("Account is locked for another {remaining_ms} ms")]
    AccountLocked { remaining_ms: u64 },

    #[error("Invalid transfer payload: {reason}")]
    InvalidPayload { reason: String },

    #[error("Invalid slot number {slot}")]
    InvalidSlot { slot: u8 },

    #[error("No account is logged in")]
    NotAuthenticated,
}

impl AccountError {
    /// Check if this error indicates the slot has nothing in it.
    pub fn is_not_found(&self) -> bool {
        matches!(self, AccountError::SlotEmpty { .. })
    }

    /// Check if this error is a failed or refused login.
    pub fn is_authentication_error(&self) -> bool {
        matches!(
            self,
            AccountError::InvalidCredentials { .. }
                | AccountError::AccountLocked { .. }
                | AccountError::NotAuthenticated
        )
    }

    /// Check if this error was caused by caller-supplied input.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            AccountError::InvalidPayload { .. } | AccountError::InvalidSlot { .. }
        )
    }
}

impl From<AccountError> for crate::Error {
    fn from(err: AccountError) -> Self {
        crate::Error::Account(err)
    }
}
