//! Ranked, redundant storage
//!
//! Writes fan out to every layer and succeed if at least one layer accepted
//! them. Reads walk the layers in rank order and return the first hit. A
//! layer that errors is logged and skipped; [`StorageError::Unavailable`] is
//! only raised when no layer could serve the request.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;

use super::{KeyValueStore, StorageError};
use crate::Result;

/// A ranked list of stores treated as one.
#[derive(Debug, Clone)]
pub struct Replicated {
    name: String,
    layers: Vec<Arc<dyn KeyValueStore>>,
}

impl Replicated {
    /// Combine `layers`, most durable first.
    pub fn new(name: impl Into<String>, layers: Vec<Arc<dyn KeyValueStore>>) -> Self {
        Self {
            name: name.into(),
            layers,
        }
    }

    /// The layers in rank order.
    pub fn layers(&self) -> &[Arc<dyn KeyValueStore>] {
        &self.layers
    }

    fn unavailable(operation: &'static str, key: &str) -> crate::Error {
        tracing::error!(operation, key, "All storage backends failed");
        StorageError::Unavailable {
            operation,
            key: key.to_string(),
        }
        .into()
    }
}

#[async_trait]
impl KeyValueStore for Replicated {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut answered = false;
        for layer in &self.layers {
            match layer.get(key).await {
                Ok(Some(value)) => {
                    tracing::debug!(layer = layer.name(), key, "Read hit");
                    return Ok(Some(value));
                }
                Ok(None) => answered = true,
                Err(e) => tracing::warn!(layer = layer.name(), key, error = %e, "Read failed"),
            }
        }
        if answered || self.layers.is_empty() {
            Ok(None)
        } else {
            Err(Self::unavailable("read", key))
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut written = 0usize;
        for layer in &self.layers {
            match layer.set(key, value).await {
                Ok(()) => written += 1,
                Err(e) => tracing::warn!(layer = layer.name(), key, error = %e, "Write failed"),
            }
        }
        if written == 0 {
            return Err(Self::unavailable("write", key));
        }
        tracing::debug!(key, written, layers = self.layers.len(), "Replicated write");
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut deleted = 0usize;
        for layer in &self.layers {
            match layer.delete(key).await {
                Ok(()) => deleted += 1,
                Err(e) => tracing::warn!(layer = layer.name(), key, error = %e, "Delete failed"),
            }
        }
        if deleted == 0 && !self.layers.is_empty() {
            return Err(Self::unavailable("delete", key));
        }
        Ok(())
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>> {
        let mut keys = BTreeSet::new();
        let mut answered = false;
        for layer in &self.layers {
            match layer.keys(prefix).await {
                Ok(found) => {
                    answered = true;
                    keys.extend(found);
                }
                Err(e) => tracing::warn!(layer = layer.name(), prefix, error = %e, "Listing failed"),
            }
        }
        if !answered && !self.layers.is_empty() {
            return Err(Self::unavailable("list", prefix));
        }
        Ok(keys.into_iter().collect())
    }
}
