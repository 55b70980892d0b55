//! Configuration types for the hosts synchronizer
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Main synchronizer configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Path of the hosts file containing the managed block
    #[serde(default = "default_hosts_file")]
    pub hosts_file: PathBuf,

    /// Label-based container filtering
    #[serde(default)]
    pub filter: FilterConfig,

    /// Optional engine settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl SyncConfig {
    /// Create a configuration with defaults
    pub fn new() -> Self {
        Self {
            hosts_file: default_hosts_file(),
            filter: FilterConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.hosts_file.as_os_str().is_empty() {
            return Err(crate::Error::config("hosts file path cannot be empty"));
        }

        self.filter.validate()?;
        self.engine.validate()?;

        Ok(())
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Label filter configuration
///
/// When `enabled` is false every running container is eligible. When
/// enabled, a container is eligible iff its labels contain `label_key`
/// with a value exactly equal to `label_value` (case-sensitive).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    /// Whether label filtering is enabled
    #[serde(default)]
    pub enabled: bool,

    /// Label key to match
    #[serde(default = "default_label_key")]
    pub label_key: String,

    /// Expected label value
    #[serde(default = "default_label_value")]
    pub label_value: String,
}

impl FilterConfig {
    /// Validate the filter configuration
    ///
    /// An enabled filter with an empty key or value can never match any
    /// container and is rejected as contradictory.
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.enabled {
            if self.label_key.is_empty() {
                return Err(crate::Error::config(
                    "label filter enabled but LABEL_KEY is empty",
                ));
            }
            if self.label_value.is_empty() {
                return Err(crate::Error::config(
                    "label filter enabled but LABEL_VALUE is empty",
                ));
            }
        }
        Ok(())
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            label_key: default_label_key(),
            label_value: default_label_value(),
        }
    }
}

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the watcher → reconciler event channel
    ///
    /// When full, the watcher awaits; per-container ordering is preserved
    /// because there is a single producer task.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,

    /// Initial event-stream reconnect backoff (in seconds)
    #[serde(default = "default_backoff_initial_secs")]
    pub backoff_initial_secs: u64,

    /// Maximum event-stream reconnect backoff (in seconds)
    ///
    /// The backoff doubles after each failed reconnect up to this bound;
    /// retries continue indefinitely while the process is alive.
    #[serde(default = "default_backoff_max_secs")]
    pub backoff_max_secs: u64,
}

impl EngineConfig {
    /// Validate the engine configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("event channel capacity must be > 0"));
        }
        if self.backoff_initial_secs == 0 {
            return Err(crate::Error::config("initial backoff must be > 0"));
        }
        if self.backoff_max_secs < self.backoff_initial_secs {
            return Err(crate::Error::config(
                "maximum backoff must be >= initial backoff",
            ));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
            backoff_initial_secs: default_backoff_initial_secs(),
            backoff_max_secs: default_backoff_max_secs(),
        }
    }
}

fn default_hosts_file() -> PathBuf {
    PathBuf::from("/etc/hosts")
}

fn default_label_key() -> String {
    "hoster.enable".to_string()
}

fn default_label_value() -> String {
    "true".to_string()
}

fn default_event_channel_capacity() -> usize {
    1000
}

fn default_backoff_initial_secs() -> u64 {
    1
}

fn default_backoff_max_secs() -> u64 {
    30
}
