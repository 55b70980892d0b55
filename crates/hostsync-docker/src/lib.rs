//! Docker Engine API implementation of [`ContainerRuntime`]
//!
//! Talks to the local Docker daemon via [`bollard`]: listings come from
//! `/containers/json` plus a per-container inspect (the summary endpoint
//! does not carry network aliases), and lifecycle notifications from the
//! `/events` stream filtered to container and network events.
//!
//! This adapter only observes. It maps the daemon's wire types into
//! descriptors and normalized events; eligibility, entry computation, and
//! file writes all live in `hostsync-core`.

use async_trait::async_trait;
use bollard::Docker;
use bollard::container::ListContainersOptions;
use bollard::models::{
    ContainerInspectResponse, EventMessage, EventMessageTypeEnum,
};
use bollard::system::EventsOptions;
use futures_util::StreamExt;
use std::collections::HashMap;
use std::pin::Pin;
use tokio_stream::Stream;
use tracing::{debug, warn};

use hostsync_core::model::{ContainerDescriptor, EventKind, NetworkAttachment};
use hostsync_core::traits::{ContainerRuntime, RuntimeEvent};
use hostsync_core::Error;

/// Container actions that mean "entered the running state".
const START_ACTIONS: &[&str] = &["start"];

/// Container actions that mean "no longer running / gone".
const STOP_ACTIONS: &[&str] = &["die", "stop", "kill", "destroy"];

/// Container actions that require a descriptor re-fetch.
const REFETCH_ACTIONS: &[&str] = &["rename"];

/// Docker-backed container runtime.
#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect to the Docker daemon.
    ///
    /// Honors `DOCKER_HOST` for tcp/http daemons, otherwise uses the
    /// platform-default local socket.
    pub fn connect() -> Result<Self, Error> {
        let docker = match std::env::var("DOCKER_HOST") {
            Ok(host) if host.starts_with("tcp://") || host.starts_with("http://") => {
                Docker::connect_with_http(&host, 120, bollard::API_DEFAULT_VERSION)
            }
            _ => Docker::connect_with_local_defaults(),
        }
        .map_err(|e| Error::runtime(format!("failed to connect to Docker: {}", e)))?;

        Ok(Self { docker })
    }

    /// Verify the daemon answers, for fail-fast startup.
    pub async fn ping(&self) -> Result<(), Error> {
        self.docker
            .ping()
            .await
            .map(|_| ())
            .map_err(|e| Error::runtime(format!("Docker daemon unreachable: {}", e)))
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn list_running(&self) -> Result<Vec<ContainerDescriptor>, Error> {
        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };
        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| Error::runtime(format!("failed to list containers: {}", e)))?;

        let mut descriptors = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let Some(id) = summary.id else { continue };
            // One broken container must not fail the whole listing.
            match self.inspect(&id).await {
                Ok(Some(descriptor)) => descriptors.push(descriptor),
                Ok(None) => debug!(container_id = %id, "container vanished during listing"),
                Err(e) => warn!(container_id = %id, "failed to inspect container: {}", e),
            }
        }
        Ok(descriptors)
    }

    async fn inspect(
        &self,
        container_id: &str,
    ) -> Result<Option<ContainerDescriptor>, Error> {
        match self.docker.inspect_container(container_id, None).await {
            Ok(detail) => Ok(descriptor_from_inspect(detail)),
            Err(bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            }) => Ok(None),
            Err(e) => Err(Error::runtime(format!(
                "failed to inspect container {}: {}",
                container_id, e
            ))),
        }
    }

    fn subscribe(
        &self,
    ) -> Pin<Box<dyn Stream<Item = Result<RuntimeEvent, Error>> + Send + 'static>> {
        let mut filters: HashMap<String, Vec<String>> = HashMap::new();
        filters.insert(
            "type".to_string(),
            vec!["container".to_string(), "network".to_string()],
        );
        filters.insert(
            "event".to_string(),
            START_ACTIONS
                .iter()
                .chain(STOP_ACTIONS)
                .chain(REFETCH_ACTIONS)
                .chain(["connect", "disconnect"].iter())
                .map(|s| s.to_string())
                .collect(),
        );

        let options = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        let stream = self.docker.events(Some(options)).filter_map(|item| async move {
            match item {
                Ok(message) => normalize_event(message).map(Ok),
                Err(e) => Some(Err(Error::runtime(format!("event stream error: {}", e)))),
            }
        });

        Box::pin(stream)
    }
}

/// Map a daemon event to a normalized runtime event.
///
/// Returns `None` for events that carry nothing actionable (unknown
/// action, missing actor id).
fn normalize_event(message: EventMessage) -> Option<RuntimeEvent> {
    let action = message.action?;
    let actor = message.actor?;

    match message.typ? {
        EventMessageTypeEnum::CONTAINER => {
            let id = actor.id?;
            let kind = if START_ACTIONS.contains(&action.as_str()) {
                EventKind::Started
            } else if STOP_ACTIONS.contains(&action.as_str()) {
                EventKind::Stopped
            } else if REFETCH_ACTIONS.contains(&action.as_str()) {
                EventKind::NetworkChanged
            } else {
                return None;
            };
            Some(RuntimeEvent::new(kind, id))
        }
        EventMessageTypeEnum::NETWORK => {
            // Network connect/disconnect events name the container in the
            // actor attributes, not the actor id (that's the network).
            if action != "connect" && action != "disconnect" {
                return None;
            }
            let id = actor.attributes?.get("container")?.clone();
            Some(RuntimeEvent::new(EventKind::NetworkChanged, id))
        }
        _ => None,
    }
}

/// Build a descriptor from an inspect response.
///
/// Missing metadata degrades to empty collections; a container the daemon
/// half-describes contributes zero entries rather than an error.
fn descriptor_from_inspect(detail: ContainerInspectResponse) -> Option<ContainerDescriptor> {
    let id = detail.id?;
    let name = detail
        .name
        .as_deref()
        .map(|n| n.trim_start_matches('/').to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| id.clone());

    let labels = detail
        .config
        .as_ref()
        .and_then(|c| c.labels.clone())
        .unwrap_or_default();

    let running = detail
        .state
        .as_ref()
        .and_then(|s| s.running)
        .unwrap_or(false);

    let mut networks = HashMap::new();
    if let Some(endpoints) = detail.network_settings.and_then(|s| s.networks) {
        for (network_name, endpoint) in endpoints {
            let mut addresses = Vec::new();
            for candidate in [&endpoint.ip_address, &endpoint.global_ipv6_address] {
                if let Some(raw) = candidate.as_deref().filter(|s| !s.is_empty()) {
                    match raw.parse() {
                        Ok(ip) => addresses.push(ip),
                        Err(_) => warn!(
                            container = %name,
                            network = %network_name,
                            address = raw,
                            "unparseable address reported by daemon"
                        ),
                    }
                }
            }
            networks.insert(
                network_name,
                NetworkAttachment {
                    addresses,
                    aliases: endpoint.aliases.clone().unwrap_or_default(),
                },
            );
        }
    }

    Some(ContainerDescriptor {
        id,
        name,
        labels,
        running,
        networks,
    })
}
