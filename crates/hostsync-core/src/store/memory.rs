// # Memory Hosts Store
//
// In-memory implementation of HostsStore.
//
// ## Purpose
//
// Holds the managed block in memory instead of a file. Useful for tests
// and for dry runs where mutating a real hosts file is undesirable.
//
// The marker lifecycle is modeled too: the block is `None` until the first
// write, and `clear()` returns it to `None`, mirroring marker removal.

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::Error;
use crate::model::HostEntry;
use crate::traits::HostsStore;

/// In-memory hosts store implementation
#[derive(Debug, Clone, Default)]
pub struct MemoryHostsStore {
    block: Arc<RwLock<Option<BTreeSet<HostEntry>>>>,
}

impl MemoryHostsStore {
    /// Create a new empty store (no managed block yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the managed block currently exists
    pub async fn has_block(&self) -> bool {
        self.block.read().await.is_some()
    }

    /// Snapshot of the current entry set (empty if no block)
    pub async fn entries(&self) -> BTreeSet<HostEntry> {
        self.block.read().await.clone().unwrap_or_default()
    }
}

#[async_trait]
impl HostsStore for MemoryHostsStore {
    async fn read_entries(&self) -> Result<Vec<HostEntry>, Error> {
        let guard = self.block.read().await;
        Ok(guard
            .as_ref()
            .map(|entries| entries.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn write_entries(&self, entries: &BTreeSet<HostEntry>) -> Result<(), Error> {
        let mut guard = self.block.write().await;
        *guard = Some(entries.clone());
        Ok(())
    }

    async fn clear(&self) -> Result<(), Error> {
        let mut guard = self.block.write().await;
        *guard = None;
        Ok(())
    }
}
