//! QR transfer payloads
//!
//! An exported account travels as `base64(JSON envelope)`:
//!
//! ```json
//! { "version": "1.0", "exportDate": "...", "deviceFingerprint": "...", "data": "..." }
//! ```
//!
//! `data` is the base64 of a [`TransferBody`] sealed with the [`Cipher`] under
//! `"transfer:" + deviceFingerprint`. Anyone holding the envelope can derive
//! that key, so the sealing only hides the account from casual inspection of
//! the QR text.

use base64ct::{Base64, Encoding};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{AccountError, UserAccount};
use crate::{
    Result,
    constants::{TRANSFER_KEY_PREFIX, TRANSFER_VERSION},
    crypto::Cipher,
};

/// Plaintext carried inside an envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferBody {
    pub account: UserAccount,
    /// The account password, present only when the exporter opted in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,
}

/// Outer, versioned transfer format.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferEnvelope {
    pub version: String,
    pub export_date: DateTime<Utc>,
    pub device_fingerprint: String,
    pub data: String,
}

fn invalid(reason: impl Into<String>) -> crate::Error {
    AccountError::InvalidPayload {
        reason: reason.into(),
    }
    .into()
}

fn transfer_key(device_fingerprint: &str) -> String {
    format!("{TRANSFER_KEY_PREFIX}{device_fingerprint}")
}

impl TransferEnvelope {
    /// Seal `body` for export from the device `device_fingerprint`.
    pub fn seal(
        body: &TransferBody,
        device_fingerprint: &str,
        export_date: DateTime<Utc>,
        cipher: &dyn Cipher,
    ) -> Result<Self> {
        let plaintext = serde_json::to_vec(body)?;
        let data = cipher.encrypt_to_string(&plaintext, &transfer_key(device_fingerprint))?;
        Ok(Self {
            version: TRANSFER_VERSION.to_string(),
            export_date,
            device_fingerprint: device_fingerprint.to_string(),
            data,
        })
    }

    /// Recover the body. Every failure is an invalid payload.
    pub fn open(&self, cipher: &dyn Cipher) -> Result<TransferBody> {
        let plaintext = cipher
            .decrypt_from_str(&self.data, &transfer_key(&self.device_fingerprint))
            .map_err(|e| {
                tracing::debug!(error = %e, "Transfer payload did not decrypt");
                invalid("payload data could not be decrypted")
            })?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| invalid(format!("payload body is malformed: {e}")))
    }

    /// Text form placed in the QR code.
    pub fn encode(&self) -> Result<String> {
        Ok(Base64::encode_string(serde_json::to_string(self)?.as_bytes()))
    }

    /// Parse the QR text, rejecting unknown versions.
    pub fn decode(payload: &str) -> Result<Self> {
        let json = Base64::decode_vec(payload.trim()).map_err(|_| invalid("payload is not base64"))?;
        let envelope: TransferEnvelope = serde_json::from_slice(&json)
            .map_err(|e| invalid(format!("payload envelope is malformed: {e}")))?;
        if envelope.version != TRANSFER_VERSION {
            return Err(invalid(format!(
                "unsupported payload version {}",
                envelope.version
            )));
        }
        Ok(envelope)
    }

    /// Whether the payload is older than `freshness_ms` at `now`.
    ///
    /// Import does not check this; it is for the UI to warn about old codes.
    pub fn is_stale(&self, now: DateTime<Utc>, freshness_ms: u64) -> bool {
        let age = now.signed_duration_since(self.export_date).num_milliseconds();
        age > i64::try_from(freshness_ms).unwrap_or(i64::MAX)
    }
}
