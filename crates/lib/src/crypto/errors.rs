//! Error types for account encryption
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    /// Wrong key and tampered ciphertext are deliberately reported the same way.
    #[error("Decryption failed")]
    DecryptionFailed,

    #[error("Key derivation failed: {reason}")]
    KeyDerivationFailed { reason: String },

    #[error("Ciphertext too short: expected at least {expected} bytes, got {actual}")]
    CiphertextTooShort { expected: usize, actual: usize },

    #[error("Invalid base64 encoding")]
    InvalidEncoding,
}

impl CryptoError {
    /// Check if this error came from opening (rather than sealing) data.
    pub fn is_decryption_error(&self) -> bool {
        matches!(
            self,
            CryptoError::DecryptionFailed
                | CryptoError::CiphertextTooShort { .. }
                | CryptoError::InvalidEncoding
        )
    }
}

impl From<CryptoError> for crate::Error {
    fn from(err: CryptoError) -> Self {
        crate::Error::Crypto(err)
    }
}
