//! Error types for account-scoped data
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    /// No account id was given and no account is active.
    #[error("No account context: pass an account id or switch to an account first")]
    NoAccountContext,

    #[error("Invalid data key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    /// The id cannot be namespaced without overlapping other accounts.
    #[error("Invalid account id '{account_id}': {reason}")]
    InvalidAccountId {
        account_id: String,
        reason: &'static str,
    },

    /// A context switch named a previous account that is not the active one.
    #[error("Cannot switch away from '{from}': active account is {active:?}")]
    ContextMismatch {
        from: String,
        active: Option<String>,
    },
}

impl DataError {
    /// Check if this error was caused by caller-supplied input.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            DataError::InvalidKey { .. } | DataError::InvalidAccountId { .. }
        )
    }
}

impl From<DataError> for crate::Error {
    fn from(err: DataError) -> Self {
        crate::Error::Data(err)
    }
}
