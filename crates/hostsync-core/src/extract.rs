//! Address extraction
//!
//! Derives the set of [`HostEntry`] values a container contributes: for
//! every attached network, every assigned IP is paired with the container's
//! primary name and with each alias declared on that network.
//!
//! Absence of data is never an error here. A container that is not running,
//! has no networks, or has attachments without addresses yet simply
//! contributes the empty set; a later event with a fresh descriptor will
//! supply the entries.

use std::collections::BTreeSet;

use crate::model::{ContainerDescriptor, HostEntry};

/// Compute the host entries a container contributes.
pub fn host_entries(descriptor: &ContainerDescriptor) -> BTreeSet<HostEntry> {
    let mut entries = BTreeSet::new();

    if !descriptor.running {
        return entries;
    }

    for attachment in descriptor.networks.values() {
        // No address yet: the container is still initializing on this
        // network and contributes nothing from it.
        for &ip in &attachment.addresses {
            if !descriptor.name.is_empty() {
                entries.insert(HostEntry::new(ip, descriptor.name.clone()));
            }
            for alias in &attachment.aliases {
                if !alias.is_empty() {
                    entries.insert(HostEntry::new(ip, alias.clone()));
                }
            }
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NetworkAttachment;

    fn descriptor_with(
        networks: Vec<(&str, Vec<&str>, Vec<&str>)>,
    ) -> ContainerDescriptor {
        let mut descriptor = ContainerDescriptor::new("c1", "web");
        for (network, ips, aliases) in networks {
            descriptor.networks.insert(
                network.to_string(),
                NetworkAttachment {
                    addresses: ips.iter().map(|ip| ip.parse().unwrap()).collect(),
                    aliases: aliases.iter().map(|a| a.to_string()).collect(),
                },
            );
        }
        descriptor
    }

    #[test]
    fn name_and_alias_share_the_ip() {
        let descriptor = descriptor_with(vec![("bridge", vec!["172.18.0.2"], vec!["web-server"])]);
        let entries = host_entries(&descriptor);

        let lines: Vec<_> = entries.iter().map(HostEntry::to_line).collect();
        assert_eq!(lines, ["172.18.0.2\tweb", "172.18.0.2\tweb-server"]);
    }

    #[test]
    fn every_network_contributes() {
        let descriptor = descriptor_with(vec![
            ("frontend", vec!["172.18.0.2"], vec![]),
            ("backend", vec!["172.19.0.7"], vec!["api"]),
        ]);
        let entries = host_entries(&descriptor);

        assert_eq!(entries.len(), 3);
        assert!(entries.contains(&HostEntry::new("172.18.0.2".parse().unwrap(), "web")));
        assert!(entries.contains(&HostEntry::new("172.19.0.7".parse().unwrap(), "web")));
        assert!(entries.contains(&HostEntry::new("172.19.0.7".parse().unwrap(), "api")));
    }

    #[test]
    fn network_without_address_contributes_nothing() {
        let descriptor = descriptor_with(vec![("bridge", vec![], vec!["web-server"])]);
        assert!(host_entries(&descriptor).is_empty());
    }

    #[test]
    fn stopped_container_contributes_nothing() {
        let mut descriptor =
            descriptor_with(vec![("bridge", vec!["172.18.0.2"], vec![])]);
        descriptor.running = false;
        assert!(host_entries(&descriptor).is_empty());
    }

    #[test]
    fn zero_networks_contributes_nothing() {
        let descriptor = ContainerDescriptor::new("c1", "web");
        assert!(host_entries(&descriptor).is_empty());
    }

    #[test]
    fn duplicate_alias_collapses() {
        let descriptor = descriptor_with(vec![("bridge", vec!["172.18.0.2"], vec!["web"])]);
        // Alias equal to the primary name yields a single entry.
        assert_eq!(host_entries(&descriptor).len(), 1);
    }
}
