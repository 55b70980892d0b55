//! Container eligibility filtering
//!
//! Decides whether a container is managed at all. Ineligible containers are
//! treated exactly like absent ones by the reconciler, so flipping a label
//! off and restarting the container removes its entries.

use tracing::debug;

use crate::config::FilterConfig;
use crate::model::ContainerDescriptor;

/// Label-based entry filter.
#[derive(Debug, Clone)]
pub struct EntryFilter {
    config: FilterConfig,
}

impl EntryFilter {
    /// Create a filter from validated configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Whether the container should be managed.
    ///
    /// With filtering disabled every container is eligible. With filtering
    /// enabled the container's labels must contain the configured key with
    /// a value exactly equal to the configured value; the comparison is
    /// case-sensitive with no wildcard or substring semantics.
    pub fn is_eligible(&self, descriptor: &ContainerDescriptor) -> bool {
        if !self.config.enabled {
            return true;
        }

        let matched = descriptor
            .labels
            .get(&self.config.label_key)
            .is_some_and(|value| *value == self.config.label_value);

        if !matched {
            debug!(
                container = %descriptor.name,
                label = %self.config.label_key,
                "container skipped by label filter"
            );
        }

        matched
    }
}
