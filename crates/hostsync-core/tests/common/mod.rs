//! Test doubles and common utilities for engine contract tests
//!
//! Provides a scripted container runtime whose inventory and event stream
//! are driven by the test, and an observable store wrapper.

use async_trait::async_trait;
use hostsync_core::error::Result;
use hostsync_core::model::{ContainerDescriptor, EventKind, HostEntry, NetworkAttachment};
use hostsync_core::traits::{ContainerRuntime, HostsStore, RuntimeEvent};
use hostsync_core::{Error, MemoryHostsStore, SyncConfig};
use std::collections::{BTreeSet, HashMap};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio_stream::Stream;

/// A container runtime fully controlled by the test.
///
/// The inventory backs `list_running`/`inspect`; events are pushed onto the
/// currently open subscription, and `sever_stream()` drops that
/// subscription's sender to simulate a disconnect.
#[derive(Clone, Default)]
pub struct ScriptedRuntime {
    containers: Arc<Mutex<HashMap<String, ContainerDescriptor>>>,
    stream_tx: Arc<Mutex<Option<mpsc::UnboundedSender<Result<RuntimeEvent>>>>>,
    fail_listing: Arc<AtomicBool>,
    subscriptions: Arc<AtomicUsize>,
}

impl ScriptedRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put a container into the inventory (it will show up in listings and
    /// inspections, but no event is emitted).
    pub fn add_container(&self, descriptor: ContainerDescriptor) {
        self.containers
            .lock()
            .unwrap()
            .insert(descriptor.id.clone(), descriptor);
    }

    /// Drop a container from the inventory.
    pub fn remove_container(&self, container_id: &str) {
        self.containers.lock().unwrap().remove(container_id);
    }

    /// Emit an event on the currently open subscription.
    ///
    /// Panics if no subscription is open; tests should wait for the
    /// watcher to attach first.
    pub fn push_event(&self, kind: EventKind, container_id: &str) {
        let guard = self.stream_tx.lock().unwrap();
        let tx = guard.as_ref().expect("no open event subscription");
        tx.send(Ok(RuntimeEvent::new(kind, container_id)))
            .expect("event stream receiver dropped");
    }

    /// End the current subscription, simulating a stream disconnect.
    pub fn sever_stream(&self) {
        self.stream_tx.lock().unwrap().take();
    }

    /// Make subsequent listings fail (RuntimeUnavailable).
    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn subscriptions(&self) -> usize {
        self.subscriptions.load(Ordering::SeqCst)
    }

    /// Wait until at least `n` subscriptions have been opened.
    pub async fn wait_for_subscriptions(&self, n: usize) {
        while self.subscriptions() < n {
            tokio::time::sleep(tokio::time::Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl ContainerRuntime for ScriptedRuntime {
    async fn list_running(&self) -> Result<Vec<ContainerDescriptor>> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(Error::runtime("scripted listing failure"));
        }
        Ok(self
            .containers
            .lock()
            .unwrap()
            .values()
            .filter(|c| c.running)
            .cloned()
            .collect())
    }

    async fn inspect(&self, container_id: &str) -> Result<Option<ContainerDescriptor>> {
        Ok(self.containers.lock().unwrap().get(container_id).cloned())
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<RuntimeEvent>> + Send + 'static>> {
        self.subscriptions.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = mpsc::unbounded_channel();
        *self.stream_tx.lock().unwrap() = Some(tx);
        Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
    }
}

/// A hosts store that records calls and can inject write failures.
#[derive(Clone, Default)]
pub struct RecordingStore {
    inner: MemoryHostsStore,
    write_count: Arc<AtomicUsize>,
    clear_count: Arc<AtomicUsize>,
    fail_writes: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_count(&self) -> usize {
        self.write_count.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clear_count.load(Ordering::SeqCst)
    }

    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub async fn entries(&self) -> BTreeSet<HostEntry> {
        self.inner.entries().await
    }

    pub async fn has_block(&self) -> bool {
        self.inner.has_block().await
    }
}

#[async_trait]
impl HostsStore for RecordingStore {
    async fn read_entries(&self) -> Result<Vec<HostEntry>> {
        self.inner.read_entries().await
    }

    async fn write_entries(&self, entries: &BTreeSet<HostEntry>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Error::store("injected write failure"));
        }
        self.write_count.fetch_add(1, Ordering::SeqCst);
        self.inner.write_entries(entries).await
    }

    async fn clear(&self) -> Result<()> {
        self.clear_count.fetch_add(1, Ordering::SeqCst);
        self.inner.clear().await
    }
}

/// A running descriptor with one bridge-network IP and optional aliases.
pub fn container(id: &str, name: &str, ip: &str, aliases: &[&str]) -> ContainerDescriptor {
    let mut descriptor = ContainerDescriptor::new(id, name);
    descriptor.networks.insert(
        "bridge".to_string(),
        NetworkAttachment {
            addresses: vec![ip.parse().unwrap()],
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        },
    );
    descriptor
}

pub fn entry(ip: &str, hostname: &str) -> HostEntry {
    HostEntry::new(ip.parse().unwrap(), hostname)
}

pub fn entry_set(pairs: &[(&str, &str)]) -> BTreeSet<HostEntry> {
    pairs.iter().map(|(ip, name)| entry(ip, name)).collect()
}

/// Engine config with a short reconnect backoff for tests.
pub fn test_config() -> SyncConfig {
    let mut config = SyncConfig::default();
    config.engine.backoff_initial_secs = 1;
    config.engine.backoff_max_secs = 2;
    config
}

/// Let queued events drain through the engine loop.
///
/// Under a paused clock this advances virtual time instantly once the
/// runtime is idle.
pub async fn settle() {
    tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;
}
