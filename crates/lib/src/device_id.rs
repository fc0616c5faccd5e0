//! Redundant device id storage
//!
//! The device id is copied into every storage location a browser profile
//! offers so that it survives a clear of any single backend. Reads try the
//! locations from fastest to slowest:
//!
//! 1. the in-tab cache
//! 2. session-scoped storage
//! 3. the embedded document store
//! 4. the primary persistent store
//! 5. decoy keys in the primary persistent store
//! 6. miscellaneous fallback locations
//!
//! A hit in a lower layer is written back into every layer above it. Writes
//! go to all layers and are announced on the [`SessionEventBus`] so sibling
//! tabs refresh their caches.

use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    constants::{
        DECOY_DEVICE_KEYS, DOCUMENT_DEVICE_KEY, FALLBACK_DEVICE_KEY, LOCAL_DEVICE_KEY,
        SESSION_DEVICE_KEY,
    },
    events::{BusEvent, BusMessage, SessionEventBus, TabId},
    fingerprint::FingerprintGenerator,
    storage::{DeviceStorage, KeyValueStore},
};

/// One location holding a copy of the device id.
#[derive(Debug, Clone)]
struct IdLayer {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
}

impl IdLayer {
    fn label(&self) -> String {
        format!("{}:{}", self.store.name(), self.key)
    }
}

/// Reads and writes the device id across every available layer.
#[derive(Debug)]
pub struct DeviceIdStore {
    cache: RwLock<Option<String>>,
    layers: Vec<IdLayer>,
    bus: SessionEventBus,
    tab: TabId,
}

impl DeviceIdStore {
    pub fn new(storage: &DeviceStorage, bus: SessionEventBus, tab: TabId) -> Self {
        let mut layers = vec![
            IdLayer {
                store: storage.session().clone(),
                key: SESSION_DEVICE_KEY,
            },
            IdLayer {
                store: storage.documents().clone(),
                key: DOCUMENT_DEVICE_KEY,
            },
            IdLayer {
                store: storage.local().clone(),
                key: LOCAL_DEVICE_KEY,
            },
        ];
        layers.extend(DECOY_DEVICE_KEYS.iter().map(|&key| IdLayer {
            store: storage.local().clone(),
            key,
        }));
        layers.extend(storage.fallbacks().iter().map(|store| IdLayer {
            store: store.clone(),
            key: FALLBACK_DEVICE_KEY,
        }));

        Self {
            cache: RwLock::new(None),
            layers,
            bus,
            tab,
        }
    }

    /// The stored device id, or `None` if no layer holds one.
    ///
    /// Never fails: an unreadable layer is skipped.
    pub async fn get_device_id(&self) -> Option<String> {
        if let Some(id) = self.cache.read().await.clone() {
            return Some(id);
        }

        for (rank, layer) in self.layers.iter().enumerate() {
            match layer.store.get(layer.key).await {
                Ok(Some(id)) if !id.is_empty() => {
                    tracing::debug!(layer = %layer.label(), "Device id found");
                    self.heal(rank, &id).await;
                    return Some(id);
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(layer = %layer.label(), error = %e, "Device id layer unreadable")
                }
            }
        }
        None
    }

    /// Copy `id` into the cache and every layer ranked above `found_at`.
    async fn heal(&self, found_at: usize, id: &str) {
        *self.cache.write().await = Some(id.to_string());
        for layer in &self.layers[..found_at] {
            match layer.store.set(layer.key, id).await {
                Ok(()) => tracing::debug!(layer = %layer.label(), "Healed device id layer"),
                Err(e) => {
                    tracing::warn!(layer = %layer.label(), error = %e, "Failed to heal device id layer")
                }
            }
        }
    }

    /// Write `id` to every layer and tell sibling tabs.
    ///
    /// Best-effort: a failing layer does not stop the others.
    pub async fn store_device_id(&self, id: &str) {
        *self.cache.write().await = Some(id.to_string());

        let mut written = 0usize;
        for layer in &self.layers {
            match layer.store.set(layer.key, id).await {
                Ok(()) => written += 1,
                Err(e) => {
                    tracing::warn!(layer = %layer.label(), error = %e, "Failed to store device id")
                }
            }
        }
        if written == 0 {
            tracing::error!("Device id could not be persisted to any layer");
        } else {
            tracing::debug!(written, layers = self.layers.len(), "Stored device id");
        }

        self.bus.publish(
            &self.tab,
            BusEvent::DeviceIdStored {
                device_id: id.to_string(),
            },
        );
    }

    /// The stored device id, generating and storing one on first use.
    pub async fn get_or_create_device_id(&self, generator: &FingerprintGenerator) -> String {
        if let Some(id) = self.get_device_id().await {
            return id;
        }
        let id = generator.generate_fingerprint_id().await;
        tracing::info!(device_id = %id, "Generated new device id");
        self.store_device_id(&id).await;
        id
    }

    /// Apply a sibling tab's broadcast. Returns whether the cache changed.
    pub async fn handle_event(&self, message: &BusMessage) -> bool {
        if message.origin == self.tab {
            return false;
        }
        let BusEvent::DeviceIdStored { device_id } = &message.event else {
            return false;
        };
        let mut cache = self.cache.write().await;
        if cache.as_deref() == Some(device_id.as_str()) {
            return false;
        }
        tracing::debug!(origin = %message.origin, "Device id updated by sibling tab");
        *cache = Some(device_id.clone());
        true
    }

    /// Forget the in-tab cache.
    pub async fn clear_cache(&self) {
        *self.cache.write().await = None;
    }

    /// Names of the layers in read order, for diagnostics.
    pub fn layer_labels(&self) -> Vec<String> {
        self.layers.iter().map(IdLayer::label).collect()
    }
}
