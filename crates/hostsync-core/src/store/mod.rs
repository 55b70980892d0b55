// # Hosts Store Implementations
//
// This module provides implementations of the HostsStore trait for
// different persistence strategies.

pub mod file;
pub mod memory;

pub use file::{BEGIN_MARKER, END_MARKER, FileHostsStore};
pub use memory::MemoryHostsStore;
