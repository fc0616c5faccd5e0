//! Accounts stored on this device
//!
//! A device offers a fixed number of numbered [`Slot`]s. Each occupied slot
//! holds one password-sealed [`EncryptedAccountRecord`] under a key derived
//! from the device id. Accounts move between devices as QR transfer payloads
//! (see [`TransferEnvelope`]).

pub mod errors;
mod manager;
mod transfer;
mod types;

pub use errors::AccountError;
pub use manager::DeviceAccountManager;
pub use transfer::{TransferBody, TransferEnvelope};
pub use types::{EncryptedAccountRecord, NewAccount, Slot, SlotSummary, UserAccount};
