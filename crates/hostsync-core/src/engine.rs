//! Sync engine
//!
//! The SyncEngine wires the pieces together and is the single consumer of
//! watcher messages, so all managed-table mutations and store writes happen
//! on one logical sequence.
//!
//! ## Event Flow
//!
//! ```text
//! ┌──────────────────┐                     ┌─────────────┐
//! │ ContainerRuntime │── RuntimeEvent ───▶ │ EventWatcher│
//! └──────────────────┘                     └──────┬──────┘
//!          ▲                                      │ bounded channel
//!          │ inspect / list                       ▼
//!          │                               ┌─────────────┐
//!          └──────────────────────────────▶│  SyncEngine │
//!                                          └──────┬──────┘
//!                              ┌───────────────────┼──────────────┐
//!                              ▼                   ▼              ▼
//!                       ┌────────────┐      ┌────────────┐ ┌────────────┐
//!                       │ Reconciler │      │ HostsStore │ │   Events   │
//!                       │ (table)    │      │ (write)    │ │  (notify)  │
//!                       └────────────┘      └────────────┘ └────────────┘
//! ```
//!
//! ## Lifecycle
//!
//! 1. Startup full sync: list running containers, rebuild the table, write
//!    the managed block. Failure here is fatal: the engine refuses to run
//!    with a known-stale table.
//! 2. Spawn the watcher and apply its messages until shutdown.
//! 3. On shutdown: stop the watcher, clear the managed block, exit.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::SyncConfig;
use crate::error::Result;
use crate::filter::EntryFilter;
use crate::model::EventKind;
use crate::reconcile::Reconciler;
use crate::traits::{ContainerRuntime, HostsStore, RuntimeEvent};
use crate::watch::{EventWatcher, WatcherMessage};

/// Events emitted by the SyncEngine for monitoring and tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// Startup full sync completed
    Started {
        containers: usize,
        entries: usize,
    },

    /// A recovery full sync completed
    Resynced {
        containers: usize,
        entries: usize,
    },

    /// The managed block was rewritten
    EntriesWritten {
        entries: usize,
    },

    /// A store write failed; the table keeps the desired state so the
    /// next successful write converges
    WriteFailed {
        error: String,
    },

    /// Engine stopped
    Stopped {
        reason: String,
    },
}

/// Container hosts synchronization engine.
pub struct SyncEngine {
    runtime: Arc<dyn ContainerRuntime>,
    store: Box<dyn HostsStore>,
    reconciler: Reconciler,
    config: SyncConfig,
    event_tx: mpsc::Sender<EngineEvent>,
}

impl SyncEngine {
    /// Create a new engine.
    ///
    /// # Returns
    ///
    /// A tuple of (engine, event_receiver); the receiver yields
    /// [`EngineEvent`]s and may be dropped if not needed.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        store: Box<dyn HostsStore>,
        config: SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<EngineEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.engine.event_channel_capacity);
        let reconciler = Reconciler::new(EntryFilter::new(config.filter.clone()));

        let engine = Self {
            runtime,
            store,
            reconciler,
            config,
            event_tx: tx,
        };

        Ok((engine, rx))
    }

    /// Run until SIGINT.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: clean shutdown, managed block cleared
    /// - `Err(Error)`: fatal startup failure
    pub async fn run(self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run with a programmatic shutdown signal instead of SIGINT.
    ///
    /// The daemon uses this to wire SIGTERM handling; tests use it for
    /// deterministic shutdown.
    pub async fn run_with_shutdown(
        self,
        shutdown_rx: tokio::sync::oneshot::Receiver<()>,
    ) -> Result<()> {
        self.run_internal(Some(shutdown_rx)).await
    }

    async fn run_internal(
        mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        // Startup full sync. A runtime that cannot be listed or a managed
        // block that cannot be written makes the process exit non-zero
        // rather than run with a known-stale table.
        let descriptors = self.runtime.list_running().await?;
        self.reconciler.full_sync(&descriptors);
        let entries = self.reconciler.desired_entries();
        self.store.write_entries(&entries).await?;

        info!(
            containers = self.reconciler.tracked(),
            entries = entries.len(),
            "startup sync complete"
        );
        self.emit_event(EngineEvent::Started {
            containers: self.reconciler.tracked(),
            entries: entries.len(),
        });

        let (watch_tx, mut watch_rx) =
            mpsc::channel(self.config.engine.event_channel_capacity);
        let watcher = EventWatcher::new(Arc::clone(&self.runtime), watch_tx, &self.config.engine);
        let watcher_handle = tokio::spawn(watcher.run());

        let reason;
        if let Some(mut rx) = shutdown_rx {
            loop {
                tokio::select! {
                    Some(message) = watch_rx.recv() => {
                        self.handle_message(message).await;
                    }

                    _ = &mut rx => {
                        info!("shutdown signal received");
                        reason = "shutdown signal".to_string();
                        break;
                    }
                }
            }
        } else {
            loop {
                tokio::select! {
                    Some(message) = watch_rx.recv() => {
                        self.handle_message(message).await;
                    }

                    _ = tokio::signal::ctrl_c() => {
                        info!("interrupt received");
                        reason = "interrupt".to_string();
                        break;
                    }
                }
            }
        }

        // Stop the watcher first so no write can race the cleanup, then
        // restore the file.
        watcher_handle.abort();
        if let Err(e) = self.store.clear().await {
            error!("failed to clear managed block during shutdown: {}", e);
        }

        self.emit_event(EngineEvent::Stopped { reason });
        info!("engine stopped, managed block cleared");
        Ok(())
    }

    /// Apply one watcher message to the table, writing the store if the
    /// desired entry set changed.
    async fn handle_message(&mut self, message: WatcherMessage) {
        match message {
            WatcherMessage::Event(event) => self.handle_event(event).await,
            WatcherMessage::Resync => self.resync().await,
        }
    }

    async fn handle_event(&mut self, event: RuntimeEvent) {
        let changed = match event.kind {
            EventKind::Started | EventKind::NetworkChanged => {
                match self.runtime.inspect(&event.container_id).await {
                    Ok(Some(descriptor)) => match event.kind {
                        EventKind::Started => self.reconciler.container_started(&descriptor),
                        _ => self.reconciler.container_changed(&descriptor),
                    },
                    Ok(None) => {
                        // Raced with removal; the stop event may never
                        // arrive, so drop the entries now.
                        debug!(container_id = %event.container_id, "container vanished before inspect");
                        self.reconciler.container_stopped(&event.container_id)
                    }
                    Err(e) => {
                        // A dying runtime surfaces as a stream disconnect
                        // next, and the resync will repair the table.
                        warn!(
                            container_id = %event.container_id,
                            "failed to inspect container: {}", e
                        );
                        false
                    }
                }
            }
            EventKind::Stopped => self.reconciler.container_stopped(&event.container_id),
        };

        if changed {
            self.persist().await;
        }
    }

    /// Rebuild the table from a fresh listing and write the full set.
    ///
    /// Always writes, so the file converges even when the in-memory diff
    /// says nothing changed (the file may have missed an earlier write).
    async fn resync(&mut self) {
        let descriptors = match self.runtime.list_running().await {
            Ok(descriptors) => descriptors,
            Err(e) => {
                // The watcher will reconnect and request another resync.
                error!("failed to list containers for resync: {}", e);
                return;
            }
        };

        self.reconciler.full_sync(&descriptors);
        self.persist().await;

        self.emit_event(EngineEvent::Resynced {
            containers: self.reconciler.tracked(),
            entries: self.reconciler.desired_entries().len(),
        });
    }

    /// Write the current desired entry set.
    ///
    /// On failure the table is left as-is; the next triggering event or
    /// resync retries with the full current state, so a missed write is
    /// never silently dropped.
    async fn persist(&mut self) {
        let entries = self.reconciler.desired_entries();
        match self.store.write_entries(&entries).await {
            Ok(()) => {
                debug!(entries = entries.len(), "managed block updated");
                self.emit_event(EngineEvent::EntriesWritten {
                    entries: entries.len(),
                });
            }
            Err(e) => {
                error!("failed to write hosts file: {}", e);
                self.emit_event(EngineEvent::WriteFailed {
                    error: e.to_string(),
                });
            }
        }
    }

    fn emit_event(&self, event: EngineEvent) {
        // Monitoring is best-effort; a full channel drops the event rather
        // than stalling reconciliation.
        if self.event_tx.try_send(event).is_err() {
            warn!("engine event channel full, dropping event");
        }
    }
}
