// # Hosts Store Trait
//
// Defines the interface for the component that owns the managed block of
// the hosts file. Nothing else in the system is permitted to touch the
// file's managed region.
//
// ## Implementations
//
// - File-based with atomic rewrite: `store/file.rs`
// - In-memory (tests, ephemeral runs): `store/memory.rs`

use async_trait::async_trait;
use std::collections::BTreeSet;

use crate::model::HostEntry;

/// Trait for hosts store implementations
///
/// The store is handed the *complete* desired entry set on every write; it
/// never appends. This keeps the file convergent even if an earlier write
/// was missed, and makes `write_entries` idempotent: writing the same set
/// twice produces byte-identical content.
///
/// # Thread Safety
///
/// All methods must be safe to call concurrently, though the engine
/// serializes writes through a single task.
#[async_trait]
pub trait HostsStore: Send + Sync {
    /// Read the entries currently recorded in the managed block.
    ///
    /// Returns an empty vector if the markers are absent. Entries are
    /// returned in file order.
    async fn read_entries(&self) -> Result<Vec<HostEntry>, crate::Error>;

    /// Replace the managed block with the given entry set.
    ///
    /// Inserts the marker pair on first write. All content outside the
    /// markers is preserved byte-for-byte. The block is written one line
    /// per entry, sorted by (ip, hostname).
    ///
    /// # Atomicity
    ///
    /// Implementations must commit the new content atomically: a reader
    /// never observes a partially written file, and a crash mid-write
    /// leaves the previous content fully intact.
    async fn write_entries(&self, entries: &BTreeSet<HostEntry>) -> Result<(), crate::Error>;

    /// Empty the managed block and remove the marker pair.
    ///
    /// Used on graceful shutdown to restore the file to its pre-management
    /// state. A no-op if the markers are absent.
    async fn clear(&self) -> Result<(), crate::Error>;
}
