use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::image::{Image, ImageStatus, is_same_image};
use crate::strategy::UpdateStrategy;
use crate::{
    DEFAULT_NETWORK, HANDOVER_TIMEOUT_LABEL, UPDATE_STRATEGY_LABEL, strip_system_labels,
};

const DEFAULT_HANDOVER_TIMEOUT: Duration = Duration::from_secs(60);

/// Observed lifecycle of a service container.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ServiceStatus {
    Installing,
    Installed,
    Running,
    Stopping,
    Stopped,
    Dead,
    /// Old release that has been signalled to hand over to its successor.
    Handover,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Installing => "Installing",
            ServiceStatus::Installed => "Installed",
            ServiceStatus::Running => "Running",
            ServiceStatus::Stopping => "Stopping",
            ServiceStatus::Stopped => "Stopped",
            ServiceStatus::Dead => "Dead",
            ServiceStatus::Handover => "Handover",
        }
    }
}

/// Container command, preserved in whichever form the composition used.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum Command {
    Shell(String),
    Args(Vec<String>),
}

impl Command {
    /// The argv the engine actually runs; shell form goes through `/bin/sh -c`.
    pub fn as_argv(&self) -> Vec<String> {
        match self {
            Command::Shell(line) => vec!["/bin/sh".into(), "-c".into(), line.clone()],
            Command::Args(args) => args.clone(),
        }
    }
}

/// Engine restart policy for a service container.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RestartPolicy {
    #[default]
    Always,
    UnlessStopped,
    OnFailure,
    No,
}

/// How a service attaches to one of its app's networks.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkAttachment {
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub ipv4_address: Option<String>,
}

/// Declarative container configuration for a service.
///
/// This is the unit config equality is defined over; see
/// [`Service::is_equal_config`] for which fields are excluded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Image reference the container runs; a registry name for targets, the
    /// reference the container was created with for observed state.
    pub image: String,
    pub running: bool,
    pub privileged: bool,
    pub labels: BTreeMap<String, String>,
    pub environment: BTreeMap<String, String>,
    pub command: Option<Command>,
    /// Mount entries in `source:destination` form; bare absolute paths are
    /// anonymous container paths.
    pub volumes: Vec<String>,
    pub networks: BTreeMap<String, NetworkAttachment>,
    pub depends_on: Vec<String>,
    pub restart: RestartPolicy,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            image: String::new(),
            running: true,
            privileged: false,
            labels: BTreeMap::new(),
            environment: BTreeMap::new(),
            command: None,
            volumes: Vec::new(),
            networks: BTreeMap::new(),
            depends_on: Vec::new(),
            restart: RestartPolicy::default(),
        }
    }
}

/// A single container specification belonging to an app.
///
/// Identity is the (`app_id`, `service_name`, `release_id`) triple; two
/// releases of the same name may coexist in observed state only while a
/// hand-over is in flight.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Service {
    pub app_id: u32,
    pub app_uuid: Option<String>,
    pub service_id: u32,
    pub service_name: String,
    pub release_id: u32,
    pub image_id: u32,
    pub image_name: String,
    pub container_id: Option<String>,
    pub status: ServiceStatus,
    pub created_at: Option<DateTime<Utc>>,
    pub config: ServiceConfig,
}

impl Service {
    pub fn is_running(&self) -> bool {
        self.status == ServiceStatus::Running
    }

    /// Same release metadata, i.e. an update to this pair would be a no-op.
    pub fn has_same_release(&self, other: &Service) -> bool {
        self.release_id == other.release_id && self.image_id == other.image_id
    }

    /// Structural config equality ignoring the running flag, agent-owned
    /// labels, and release metadata. A `false` here means the container must
    /// be recreated to reach the other config.
    ///
    /// Fields a composition may leave implicit are normalized so observed
    /// state read back from the engine compares equal: an empty network map
    /// means the `default` network, and an undeclared command means the
    /// image default.
    pub fn is_equal_config(&self, other: &Service) -> bool {
        if !is_same_image(&self.config.image, &other.config.image) {
            return false;
        }
        if !commands_equal(&self.config.command, &other.config.command) {
            return false;
        }
        if normalized_networks(&self.config) != normalized_networks(&other.config) {
            return false;
        }
        let mut a = self.config.clone();
        let mut b = other.config.clone();
        a.labels = strip_system_labels(&a.labels);
        b.labels = strip_system_labels(&b.labels);
        a.running = true;
        b.running = true;
        a.image.clear();
        b.image.clear();
        a.command = None;
        b.command = None;
        a.networks.clear();
        b.networks.clear();
        a == b
    }

    pub fn update_strategy(&self) -> UpdateStrategy {
        UpdateStrategy::from_label(self.config.labels.get(UPDATE_STRATEGY_LABEL).map(String::as_str))
    }

    pub fn handover_timeout(&self) -> Duration {
        self.config
            .labels
            .get(HANDOVER_TIMEOUT_LABEL)
            .and_then(|value| value.parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_HANDOVER_TIMEOUT)
    }

    /// True when the mount list names the given app volume as a source.
    /// Absolute sources are host bind mounts, not app volumes.
    pub fn references_volume(&self, name: &str) -> bool {
        self.config.volumes.iter().any(|entry| {
            let source = entry.split_once(':').map_or(entry.as_str(), |(src, _)| src);
            !source.starts_with('/') && source == name
        })
    }

    pub fn references_network(&self, name: &str) -> bool {
        self.config.networks.contains_key(name)
    }

    /// Image descriptor for a fetch of this service's target image.
    pub fn image_to_fetch(&self) -> Image {
        Image {
            image_id: self.image_id,
            app_id: self.app_id,
            service_id: self.service_id,
            service_name: self.service_name.clone(),
            release_id: self.release_id,
            name: self.image_name.clone(),
            docker_image_id: None,
            status: ImageStatus::Downloading,
            download_progress: None,
        }
    }

    /// Image descriptor for removing the image this service currently runs.
    pub fn image_to_remove(&self) -> Image {
        Image {
            image_id: self.image_id,
            app_id: self.app_id,
            service_id: self.service_id,
            service_name: self.service_name.clone(),
            release_id: self.release_id,
            name: self.image_name.clone(),
            docker_image_id: None,
            status: ImageStatus::Deleting,
            download_progress: None,
        }
    }
}

/// A side that declares no command runs the image default, which the other
/// side's engine read-back reports verbatim; only two explicit commands can
/// disagree. Shell form compares as its exec-form argv.
fn commands_equal(a: &Option<Command>, b: &Option<Command>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => a.as_argv() == b.as_argv(),
        _ => true,
    }
}

/// Services that declare no networks implicitly join `default`.
fn normalized_networks(config: &ServiceConfig) -> BTreeMap<String, NetworkAttachment> {
    let mut networks = config.networks.clone();
    if networks.is_empty() {
        networks.insert(DEFAULT_NETWORK.to_string(), NetworkAttachment::default());
    }
    networks
}
