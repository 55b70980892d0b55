//! Data model for the hosts synchronizer
//!
//! A [`ContainerDescriptor`] is an immutable snapshot of one container as
//! reported by the runtime; it is re-fetched on every event and never
//! mutated in place. A [`HostEntry`] is one line of the managed block.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;

/// Snapshot of a single container as seen by the runtime.
///
/// Fields the runtime did not report are represented as empty collections,
/// never as errors: a container that is still acquiring an IP simply has an
/// attachment with no addresses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerDescriptor {
    /// Opaque container id, unique per container lifetime
    pub id: String,

    /// Primary container name (leading `/` already stripped)
    pub name: String,

    /// Container labels
    #[serde(default)]
    pub labels: HashMap<String, String>,

    /// Whether the container is currently running
    pub running: bool,

    /// Attached networks by network name
    #[serde(default)]
    pub networks: HashMap<String, NetworkAttachment>,
}

/// One network attachment of a container.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NetworkAttachment {
    /// IP addresses assigned on this network (empty while initializing)
    #[serde(default)]
    pub addresses: Vec<IpAddr>,

    /// Network-scoped aliases declared for the container
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ContainerDescriptor {
    /// Create a minimal running descriptor with no networks attached.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            labels: HashMap::new(),
            running: true,
            networks: HashMap::new(),
        }
    }
}

/// One line of the managed block: an (ip, hostname) pair.
///
/// Ownership is not part of the entry itself; the reconciler tracks which
/// container produced which entries in its table, keyed by container id.
/// The derived `Ord` sorts by (ip, hostname), which is the persisted order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HostEntry {
    /// Address the hostname resolves to
    pub ip: IpAddr,
    /// Hostname mapped to the address
    pub hostname: String,
}

impl HostEntry {
    /// Create a new entry.
    pub fn new(ip: IpAddr, hostname: impl Into<String>) -> Self {
        Self {
            ip,
            hostname: hostname.into(),
        }
    }

    /// Render the entry as a managed-block line.
    pub fn to_line(&self) -> String {
        format!("{}\t{}", self.ip, self.hostname)
    }

    /// Parse a managed-block line (`<ip><whitespace><hostname>`).
    ///
    /// Returns `None` for lines that do not look like entries; the store
    /// skips those rather than failing the whole read.
    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split_whitespace();
        let ip: IpAddr = parts.next()?.parse().ok()?;
        let hostname = parts.next()?.to_string();
        Some(Self { ip, hostname })
    }
}

impl std::fmt::Display for HostEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} -> {}", self.hostname, self.ip)
    }
}

/// Kind of lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Container entered the running state
    Started,
    /// Container stopped, died, or was removed
    Stopped,
    /// Container gained/lost a network, an address, or was renamed;
    /// the descriptor must be re-fetched
    NetworkChanged,
}
