// # hostsync-core
//
// Core library for the container hosts-file synchronizer.
//
// ## Architecture Overview
//
// This library keeps a hosts file's managed block in sync with the running
// containers on a host:
// - **ContainerRuntime**: Trait for listing containers and streaming
//   lifecycle events (implemented by `hostsync-docker`)
// - **HostsStore**: Trait owning the managed block (file and memory impls)
// - **Reconciler**: State machine mapping container id → entry set
// - **EventWatcher**: Stream consumer with reconnect/backoff and resync
// - **SyncEngine**: Supervisor wiring it all together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: the runtime adapter observes, the store
//    persists, the reconciler decides
// 2. **Event-Driven**: incremental updates from a lifecycle stream, full
//    sync only for startup and gap recovery
// 3. **Single Writer**: one engine task mutates the table and the file
// 4. **Idempotency**: every write is the complete desired set, so missed
//    writes converge on the next one

pub mod config;
pub mod engine;
pub mod error;
pub mod extract;
pub mod filter;
pub mod model;
pub mod reconcile;
pub mod store;
pub mod traits;
pub mod watch;

// Re-export core types for convenience
pub use config::{EngineConfig, FilterConfig, SyncConfig};
pub use engine::{EngineEvent, SyncEngine};
pub use error::{Error, Result};
pub use filter::EntryFilter;
pub use model::{ContainerDescriptor, EventKind, HostEntry, NetworkAttachment};
pub use reconcile::Reconciler;
pub use store::{FileHostsStore, MemoryHostsStore};
pub use traits::{ContainerRuntime, HostsStore, RuntimeEvent};
