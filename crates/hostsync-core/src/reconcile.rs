//! Reconciler state machine
//!
//! Maps container identity to its current entry set (the managed table) and
//! decides when the hosts store must be rewritten. The table is the
//! authoritative state; the file is a persisted projection of it.
//!
//! A tracked container is either *present* (nonempty entry set), *present
//! with no entries yet* (running but awaiting an IP, an empty set in the
//! table), or absent. Ineligible containers are treated exactly like
//! absent ones.
//!
//! All mutation happens on the engine's single event loop; the reconciler
//! itself is a plain owned structure with no interior locking.

use std::collections::{BTreeSet, HashMap};
use tracing::{debug, trace};

use crate::extract;
use crate::filter::EntryFilter;
use crate::model::{ContainerDescriptor, HostEntry};

/// The reconciler and its managed table.
#[derive(Debug)]
pub struct Reconciler {
    /// Managed table: container id → entries it currently contributes
    table: HashMap<String, BTreeSet<HostEntry>>,
    filter: EntryFilter,
}

impl Reconciler {
    /// Create a reconciler with an empty table.
    pub fn new(filter: EntryFilter) -> Self {
        Self {
            table: HashMap::new(),
            filter,
        }
    }

    /// A container entered the running state.
    ///
    /// Returns `true` if the union of all entries changed and the store
    /// must be rewritten.
    pub fn container_started(&mut self, descriptor: &ContainerDescriptor) -> bool {
        self.apply_descriptor(descriptor)
    }

    /// A running container's addresses, networks, or name changed.
    ///
    /// Returns `true` if the union of all entries changed.
    pub fn container_changed(&mut self, descriptor: &ContainerDescriptor) -> bool {
        self.apply_descriptor(descriptor)
    }

    /// A container stopped or was removed.
    ///
    /// Returns `true` if the union of all entries changed.
    pub fn container_stopped(&mut self, container_id: &str) -> bool {
        let before = self.desired_entries();
        if self.table.remove(container_id).is_none() {
            trace!(container_id, "stop for untracked container, ignoring");
            return false;
        }
        debug!(container_id, "container removed from managed table");
        self.desired_entries() != before
    }

    /// Rebuild the entire table from a fresh container listing.
    ///
    /// Prior in-memory state is discarded, so the result is the same
    /// whether the old table was empty, stale, or correct. The caller
    /// performs a single store write afterwards regardless of whether
    /// anything changed.
    pub fn full_sync(&mut self, descriptors: &[ContainerDescriptor]) {
        self.table.clear();
        for descriptor in descriptors {
            if !descriptor.running || !self.filter.is_eligible(descriptor) {
                continue;
            }
            self.table
                .insert(descriptor.id.clone(), extract::host_entries(descriptor));
        }
        debug!(containers = self.table.len(), "managed table rebuilt");
    }

    /// The complete desired entry set: the deduplicated union over all
    /// tracked containers, in (ip, hostname) order.
    pub fn desired_entries(&self) -> BTreeSet<HostEntry> {
        self.table.values().flatten().cloned().collect()
    }

    /// Number of containers currently tracked.
    pub fn tracked(&self) -> usize {
        self.table.len()
    }

    /// Recompute one container's contribution and record it.
    ///
    /// A descriptor that is not running or not eligible is handled as a
    /// removal, which makes start/change transitions self-correcting when
    /// they race with a stop.
    fn apply_descriptor(&mut self, descriptor: &ContainerDescriptor) -> bool {
        if !descriptor.running || !self.filter.is_eligible(descriptor) {
            return self.container_stopped(&descriptor.id);
        }

        let entries = extract::host_entries(descriptor);
        let before = self.desired_entries();

        trace!(
            container = %descriptor.name,
            entries = entries.len(),
            "recorded container contribution"
        );
        self.table.insert(descriptor.id.clone(), entries);

        self.desired_entries() != before
    }
}
