//! Cross-tab event bus
//!
//! Tabs of the same origin learn about each other's device id writes, logins
//! and logouts through a [`SessionEventBus`]. The bus is a
//! `tokio::sync::broadcast` channel; every message carries the publishing
//! tab's [`TabId`] so subscribers can skip their own echoes.
//!
//! Delivery is best-effort. A slow subscriber that falls behind the channel
//! capacity loses the oldest messages, which mirrors the last-write-wins
//! behaviour of the storage backends underneath.

use std::fmt;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::account::Slot;

/// Default number of undelivered messages kept per subscriber.
pub const DEFAULT_BUS_CAPACITY: usize = 64;

/// Identifier of one open tab.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TabId(String);

impl TabId {
    /// A fresh random tab id.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Something a tab wants its siblings to know.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    /// A device id was written to the storage layers.
    DeviceIdStored { device_id: String },
    /// An account was authenticated in the publishing tab.
    LoggedIn { account_id: String, slot: Slot },
    /// The publishing tab ended its session.
    LoggedOut { account_id: Option<String> },
    /// All namespaced data of an account was deleted.
    AccountDataCleared { account_id: String },
}

/// An event together with the tab that published it.
#[derive(Clone, Debug)]
pub struct BusMessage {
    pub origin: TabId,
    pub event: BusEvent,
}

/// Publish/subscribe channel shared by all tabs of one origin.
#[derive(Clone, Debug)]
pub struct SessionEventBus {
    sender: broadcast::Sender<BusMessage>,
}

impl SessionEventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Publish an event. Returns how many subscribers will see it.
    ///
    /// Having no subscribers is not an error: a single open tab is the
    /// common case.
    pub fn publish(&self, origin: &TabId, event: BusEvent) -> usize {
        tracing::debug!(origin = %origin, ?event, "Publishing bus event");
        self.sender
            .send(BusMessage {
                origin: origin.clone(),
                event,
            })
            .unwrap_or(0)
    }

    /// Subscribe on behalf of `tab`. Messages published by `tab` itself are
    /// filtered out.
    pub fn subscribe(&self, tab: &TabId) -> BusSubscription {
        BusSubscription {
            tab: tab.clone(),
            receiver: self.sender.subscribe(),
        }
    }
}

impl Default for SessionEventBus {
    fn default() -> Self {
        Self::new(DEFAULT_BUS_CAPACITY)
    }
}

/// Receiving half of the bus for one tab.
#[derive(Debug)]
pub struct BusSubscription {
    tab: TabId,
    receiver: broadcast::Receiver<BusMessage>,
}

impl BusSubscription {
    /// Wait for the next message from another tab.
    ///
    /// Returns `None` once every publisher handle has been dropped.
    pub async fn recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(message) if message.origin == self.tab => continue,
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(tab = %self.tab, skipped, "Bus subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Take the next already-delivered message from another tab, if any.
    pub fn try_recv(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.try_recv() {
                Ok(message) if message.origin == self.tab => continue,
                Ok(message) => return Some(message),
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    tracing::warn!(tab = %self.tab, skipped, "Bus subscriber lagged");
                }
                Err(_) => return None,
            }
        }
    }
}
