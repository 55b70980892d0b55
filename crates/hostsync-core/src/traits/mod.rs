//! Core traits for the hosts synchronizer
//!
//! This module defines the abstract interfaces the engine is built against.
//!
//! - [`ContainerRuntime`]: list containers and stream lifecycle events
//! - [`HostsStore`]: own the managed block of the hosts file

pub mod hosts_store;
pub mod runtime;

pub use hosts_store::HostsStore;
pub use runtime::{ContainerRuntime, RuntimeEvent};
