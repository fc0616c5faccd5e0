//! Password-based encryption of account records
//!
//! Account blobs are sealed with AES-256-GCM under a key derived from a
//! secret string with Argon2id. Each call draws a fresh salt and nonce, so
//! sealing the same record twice yields different bytes.
//!
//! Wire format: `salt (16 bytes) || nonce (12 bytes) || ciphertext`.
//!
//! This protects records against casual inspection of browser storage. It is
//! not a boundary against an attacker who can run code in the same profile.

pub mod errors;

use std::fmt::Debug;

use aes_gcm::{
    Aes256Gcm, KeyInit, Nonce,
    aead::{Aead, AeadCore, OsRng},
};
use argon2::{Argon2, Params};
use base64ct::{Base64, Encoding};
use rand::RngCore;
use zeroize::Zeroizing;

pub use errors::CryptoError;

use crate::{Result, config::KdfParams};

/// Salt length for key derivation
pub const SALT_LENGTH: usize = 16;

/// Nonce length for AES-GCM (12 bytes standard)
pub const NONCE_LENGTH: usize = 12;

/// Derived key length for AES-256 (32 bytes)
pub const KEY_LENGTH: usize = 32;

/// Symmetric encryption keyed by a secret string.
///
/// The account manager only sees this trait, so the concrete algorithm can be
/// swapped without touching slot storage.
pub trait Cipher: Send + Sync + Debug {
    /// Seal `plaintext` under `secret`.
    fn encrypt(&self, plaintext: &[u8], secret: &str) -> Result<Vec<u8>>;

    /// Open bytes produced by [`Cipher::encrypt`]. Any mismatch is
    /// [`CryptoError::DecryptionFailed`].
    fn decrypt(&self, ciphertext: &[u8], secret: &str) -> Result<Vec<u8>>;

    /// [`Cipher::encrypt`], base64-encoded for string stores.
    fn encrypt_to_string(&self, plaintext: &[u8], secret: &str) -> Result<String> {
        Ok(Base64::encode_string(&self.encrypt(plaintext, secret)?))
    }

    /// Inverse of [`Cipher::encrypt_to_string`].
    fn decrypt_from_str(&self, encoded: &str, secret: &str) -> Result<Vec<u8>> {
        let bytes = Base64::decode_vec(encoded).map_err(|_| CryptoError::InvalidEncoding)?;
        self.decrypt(&bytes, secret)
    }
}

/// Argon2id + AES-256-GCM.
#[derive(Debug, Clone)]
pub struct PasswordCipher {
    params: KdfParams,
}

impl PasswordCipher {
    pub fn new(params: KdfParams) -> Self {
        Self { params }
    }

    /// Derive a 32-byte key from `secret` and `salt`.
    fn derive_key(&self, secret: &str, salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let params = Params::new(
            self.params.m_cost,
            self.params.t_cost,
            self.params.p_cost,
            Some(KEY_LENGTH),
        )
        .map_err(|e| CryptoError::KeyDerivationFailed {
            reason: format!("Invalid Argon2 parameters: {e}"),
        })?;

        let argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);

        let mut key = Zeroizing::new(vec![0u8; KEY_LENGTH]);
        argon2
            .hash_password_into(secret.as_bytes(), salt, &mut key)
            .map_err(|e| CryptoError::KeyDerivationFailed {
                reason: e.to_string(),
            })?;
        Ok(key)
    }
}

impl Default for PasswordCipher {
    fn default() -> Self {
        Self::new(KdfParams::default())
    }
}

impl Cipher for PasswordCipher {
    fn encrypt(&self, plaintext: &[u8], secret: &str) -> Result<Vec<u8>> {
        let mut salt = [0u8; SALT_LENGTH];
        rand::thread_rng().fill_bytes(&mut salt);
        let key = self.derive_key(secret, &salt)?;

        let cipher = Aes256Gcm::new_from_slice(&key).map_err(|e| CryptoError::EncryptionFailed {
            reason: format!("Failed to create cipher: {e}"),
        })?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext =
            cipher
                .encrypt(&nonce, plaintext)
                .map_err(|e| CryptoError::EncryptionFailed {
                    reason: e.to_string(),
                })?;

        let mut sealed = Vec::with_capacity(SALT_LENGTH + NONCE_LENGTH + ciphertext.len());
        sealed.extend_from_slice(&salt);
        sealed.extend_from_slice(&nonce);
        sealed.extend(ciphertext);
        Ok(sealed)
    }

    fn decrypt(&self, ciphertext: &[u8], secret: &str) -> Result<Vec<u8>> {
        let header = SALT_LENGTH + NONCE_LENGTH;
        if ciphertext.len() < header {
            return Err(CryptoError::CiphertextTooShort {
                expected: header,
                actual: ciphertext.len(),
            }
            .into());
        }

        let (salt, rest) = ciphertext.split_at(SALT_LENGTH);
        let (nonce_bytes, encrypted) = rest.split_at(NONCE_LENGTH);
        let key = self.derive_key(secret, salt)?;

        let cipher =
            Aes256Gcm::new_from_slice(&key).map_err(|_| CryptoError::DecryptionFailed)?;
        cipher
            .decrypt(Nonce::from_slice(nonce_bytes), encrypted)
            .map_err(|_| CryptoError::DecryptionFailed.into())
    }
}
