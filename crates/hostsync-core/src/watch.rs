//! Event watcher
//!
//! Consumes the runtime's lifecycle event stream and forwards normalized
//! messages to the engine over a bounded channel. The watcher owns
//! reconnection: when the stream yields an error or ends, it sleeps with
//! bounded exponential backoff, opens a fresh subscription, and asks the
//! engine for a full resync before incremental delivery resumes, so no
//! event gap can leave the managed table stale.
//!
//! The watcher never waits on store writes; it only awaits channel
//! capacity, and the single-producer channel preserves per-container
//! event ordering.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;
use tokio_stream::StreamExt;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::traits::{ContainerRuntime, RuntimeEvent};

/// Message from the watcher to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatcherMessage {
    /// A lifecycle event arrived
    Event(RuntimeEvent),
    /// The stream was re-established after a gap; run a full sync
    Resync,
}

/// Watcher task over a runtime's event stream.
pub struct EventWatcher {
    runtime: Arc<dyn ContainerRuntime>,
    tx: mpsc::Sender<WatcherMessage>,
    backoff_initial: Duration,
    backoff_max: Duration,
}

impl EventWatcher {
    /// Create a watcher feeding the given channel.
    pub fn new(
        runtime: Arc<dyn ContainerRuntime>,
        tx: mpsc::Sender<WatcherMessage>,
        config: &EngineConfig,
    ) -> Self {
        Self {
            runtime,
            tx,
            backoff_initial: Duration::from_secs(config.backoff_initial_secs),
            backoff_max: Duration::from_secs(config.backoff_max_secs),
        }
    }

    /// Consume event streams until the engine goes away.
    ///
    /// Returns when the receiving side of the channel is dropped; stream
    /// failures are never fatal here, they only trigger reconnection.
    pub async fn run(self) {
        let mut backoff = self.backoff_initial;
        let mut reconnecting = false;

        loop {
            let mut stream = self.runtime.subscribe();

            if reconnecting {
                // The gap may have swallowed events; have the engine
                // rebuild from a fresh listing before trusting the stream.
                info!("event stream re-established, requesting full resync");
                if self.tx.send(WatcherMessage::Resync).await.is_err() {
                    return;
                }
            }

            while let Some(item) = stream.next().await {
                match item {
                    Ok(event) => {
                        backoff = self.backoff_initial;
                        debug!(?event, "container event");
                        if self.tx.send(WatcherMessage::Event(event)).await.is_err() {
                            return;
                        }
                    }
                    Err(e) => {
                        warn!("event stream error: {}", e);
                        break;
                    }
                }
            }

            reconnecting = true;
            warn!("event stream ended, reconnecting in {:?}", backoff);
            sleep(backoff).await;
            backoff = (backoff * 2).min(self.backoff_max);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ContainerDescriptor, EventKind};
    use async_trait::async_trait;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio_stream::Stream;

    /// Runtime whose first subscription fails immediately and whose second
    /// delivers one event then stays open.
    struct FlakyRuntime {
        subscriptions: AtomicUsize,
    }

    #[async_trait]
    impl ContainerRuntime for FlakyRuntime {
        async fn list_running(&self) -> Result<Vec<ContainerDescriptor>, crate::Error> {
            Ok(vec![])
        }

        async fn inspect(
            &self,
            _container_id: &str,
        ) -> Result<Option<ContainerDescriptor>, crate::Error> {
            Ok(None)
        }

        fn subscribe(
            &self,
        ) -> Pin<Box<dyn Stream<Item = Result<RuntimeEvent, crate::Error>> + Send + 'static>>
        {
            let attempt = self.subscriptions.fetch_add(1, Ordering::SeqCst);
            if attempt == 0 {
                Box::pin(tokio_stream::once(Err(crate::Error::runtime(
                    "connection reset",
                ))))
            } else {
                let (tx, rx) = mpsc::unbounded_channel();
                tx.send(Ok(RuntimeEvent::new(EventKind::Started, "c1")))
                    .unwrap();
                // Leak the sender so the stream stays open.
                std::mem::forget(tx);
                Box::pin(tokio_stream::wrappers::UnboundedReceiverStream::new(rx))
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn disconnect_triggers_resync_before_events() {
        let runtime = Arc::new(FlakyRuntime {
            subscriptions: AtomicUsize::new(0),
        });
        let (tx, mut rx) = mpsc::channel(16);

        let config = EngineConfig::default();
        let watcher = EventWatcher::new(runtime, tx, &config);
        let handle = tokio::spawn(watcher.run());

        // Backoff sleeps auto-advance under the paused clock.
        assert_eq!(rx.recv().await, Some(WatcherMessage::Resync));
        assert_eq!(
            rx.recv().await,
            Some(WatcherMessage::Event(RuntimeEvent::new(
                EventKind::Started,
                "c1"
            )))
        );

        drop(rx);
        // Watcher exits once the channel is gone and it next tries to send.
        handle.abort();
    }
}
