use std::path::Path;
use std::sync::Arc;

use super::{JsonFileStore, KeyValueStore, MemoryStore, Replicated};
use crate::Result;

/// The storage backends visible to one tab of one browser profile.
///
/// `local` and `documents` are shared by every tab; `session` and the
/// fallback locations belong to a single tab. Use [`DeviceStorage::new_tab`]
/// to model a second tab opened against the same profile.
#[derive(Debug, Clone)]
pub struct DeviceStorage {
    local: Arc<dyn KeyValueStore>,
    session: Arc<dyn KeyValueStore>,
    documents: Arc<dyn KeyValueStore>,
    fallbacks: Vec<Arc<dyn KeyValueStore>>,
}

impl DeviceStorage {
    /// Assemble storage from explicit backends.
    pub fn new(
        local: Arc<dyn KeyValueStore>,
        session: Arc<dyn KeyValueStore>,
        documents: Arc<dyn KeyValueStore>,
        fallbacks: Vec<Arc<dyn KeyValueStore>>,
    ) -> Self {
        Self {
            local,
            session,
            documents,
            fallbacks,
        }
    }

    /// Purely in-memory storage.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(MemoryStore::new("local")),
            Arc::new(MemoryStore::new("session")),
            Arc::new(MemoryStore::new("documents")),
            Self::tab_fallbacks(),
        )
    }

    /// Storage whose shared backends persist under `dir`.
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let local = JsonFileStore::open("local", dir.join("local.json")).await?;
        let documents = JsonFileStore::open("documents", dir.join("documents.json")).await?;
        Ok(Self::new(
            Arc::new(local),
            Arc::new(MemoryStore::new("session")),
            Arc::new(documents),
            Self::tab_fallbacks(),
        ))
    }

    fn tab_fallbacks() -> Vec<Arc<dyn KeyValueStore>> {
        vec![
            Arc::new(MemoryStore::new("css-variable")),
            Arc::new(MemoryStore::new("window-name")),
        ]
    }

    /// Storage as seen from another tab: shared backends, fresh per-tab ones.
    pub fn new_tab(&self) -> Self {
        Self::new(
            self.local.clone(),
            Arc::new(MemoryStore::new("session")),
            self.documents.clone(),
            Self::tab_fallbacks(),
        )
    }

    /// Primary persistent store.
    pub fn local(&self) -> &Arc<dyn KeyValueStore> {
        &self.local
    }

    /// Session-scoped store.
    pub fn session(&self) -> &Arc<dyn KeyValueStore> {
        &self.session
    }

    /// Embedded document store.
    pub fn documents(&self) -> &Arc<dyn KeyValueStore> {
        &self.documents
    }

    /// Miscellaneous last-resort locations.
    pub fn fallbacks(&self) -> &[Arc<dyn KeyValueStore>] {
        &self.fallbacks
    }

    /// The durable backends combined, most durable first.
    pub fn durable(&self, name: &str) -> Replicated {
        Replicated::new(name, vec![self.local.clone(), self.documents.clone()])
    }
}
