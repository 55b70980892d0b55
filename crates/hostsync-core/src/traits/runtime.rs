// # Container Runtime Trait
//
// Defines the interface to the container runtime: a queryable inventory of
// containers plus a stream of lifecycle notifications.
//
// ## Implementations
//
// - Docker Engine API: `hostsync-docker` crate
// - Scripted test double: `tests/common/mod.rs`
//
// The engine only ever reads from the runtime; it never mutates containers.

use async_trait::async_trait;
use std::pin::Pin;
use tokio_stream::Stream;

use crate::model::{ContainerDescriptor, EventKind};

/// A raw lifecycle notification from the runtime.
///
/// Carries only the container id and the kind of transition; the engine
/// re-fetches the descriptor when it needs current metadata, so a stale
/// event can never inject stale addresses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeEvent {
    /// Kind of transition
    pub kind: EventKind,
    /// Id of the affected container
    pub container_id: String,
}

impl RuntimeEvent {
    /// Create a new runtime event
    pub fn new(kind: EventKind, container_id: impl Into<String>) -> Self {
        Self {
            kind,
            container_id: container_id.into(),
        }
    }
}

/// Trait for container runtime implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Responsibilities
///
/// Runtime adapters are observers: they report what containers exist and
/// what happens to them. They must not filter by label, compute host
/// entries, or touch the hosts file; those concerns belong to the engine.
///
/// # Event stream contract
///
/// `subscribe()` returns a stream that yields events until the underlying
/// connection drops, then yields an `Err` item or ends. Reconnection is the
/// watcher's job, not the adapter's: the watcher calls `subscribe()` again
/// after backoff. Events for the same container id must be yielded in the
/// order the runtime reported them.
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// List all currently running containers.
    ///
    /// Containers whose metadata cannot be fetched are skipped (logged by
    /// the implementation); one broken container must not fail the listing.
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<ContainerDescriptor>)`: snapshot of running containers
    /// - `Err(Error)`: the runtime is unreachable
    async fn list_running(&self) -> Result<Vec<ContainerDescriptor>, crate::Error>;

    /// Fetch a fresh descriptor for a single container.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(descriptor))`: the container exists
    /// - `Ok(None)`: the container is gone (raced with removal)
    /// - `Err(Error)`: the runtime is unreachable
    async fn inspect(&self, container_id: &str)
    -> Result<Option<ContainerDescriptor>, crate::Error>;

    /// Open a lifecycle event stream.
    ///
    /// Each call opens a fresh subscription. A yielded `Err` item or stream
    /// end means the subscription is dead and a new one must be opened.
    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<RuntimeEvent, crate::Error>> + Send + 'static>>;
}
