//! Target-state ingestion: serde DTOs for composition documents and their
//! fallible conversion into domain values.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::app::App;
use crate::errors::ValidationError;
use crate::network::{Ipam, IpamPool, Network, NetworkConfig, supervised_labels};
use crate::service::{
    Command, NetworkAttachment, RestartPolicy, Service, ServiceConfig, ServiceStatus,
};
use crate::volume::{Volume, VolumeConfig};
use crate::{
    APP_ID_LABEL, APP_UUID_LABEL, DEFAULT_NETWORK, RELEASE_ID_LABEL, SERVICE_ID_LABEL,
    SERVICE_NAME_LABEL, SUPERVISED_LABEL,
};

/// One app as described by the target-state provider.
#[derive(Debug, Clone, Deserialize)]
pub struct AppComposition {
    pub app_id: u32,
    #[serde(default)]
    pub app_uuid: Option<String>,
    #[serde(default)]
    pub services: BTreeMap<String, ServiceComposition>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkComposition>,
    #[serde(default)]
    pub volumes: BTreeMap<String, VolumeComposition>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceComposition {
    pub service_id: u32,
    pub image_id: u32,
    pub release_id: u32,
    pub image: String,
    #[serde(default = "default_running")]
    pub running: bool,
    #[serde(default)]
    pub privileged: bool,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub command: Option<Command>,
    #[serde(default)]
    pub volumes: Vec<String>,
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkAttachment>,
    #[serde(default)]
    pub depends_on: Vec<String>,
    #[serde(default)]
    pub restart: RestartPolicy,
}

fn default_running() -> bool {
    true
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkComposition {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub ipam: Option<IpamComposition>,
    #[serde(default)]
    pub enable_ipv6: bool,
    #[serde(default)]
    pub internal: bool,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpamComposition {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub config: Vec<IpamPoolComposition>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IpamPoolComposition {
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub ip_range: Option<String>,
    #[serde(default)]
    pub aux_addresses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VolumeComposition {
    #[serde(default)]
    pub driver: Option<String>,
    #[serde(default)]
    pub driver_opts: BTreeMap<String, String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

impl App {
    /// Builds a target app from its composition, applying identity labels
    /// and validating structure before the planner ever sees the value.
    pub fn from_compose(doc: AppComposition) -> Result<App, ValidationError> {
        let app_uuid = doc.app_uuid.clone();

        let mut networks = BTreeMap::new();
        for (name, net) in doc.networks {
            let network = Network::from_compose(doc.app_id, app_uuid.as_deref(), &name, net)?;
            networks.insert(name, network);
        }

        let mut volumes = BTreeMap::new();
        for (name, vol) in doc.volumes {
            let volume = Volume::from_compose(doc.app_id, app_uuid.as_deref(), &name, vol);
            volumes.insert(name, volume);
        }

        let mut services = Vec::new();
        for (name, svc) in doc.services {
            let service =
                Service::from_compose(doc.app_id, app_uuid.as_deref(), &name, svc)?;
            validate_references(&service, &networks, &volumes)?;
            services.push(service);
        }

        let app = App {
            app_id: doc.app_id,
            app_uuid,
            services,
            networks,
            volumes,
            is_target: true,
        };
        app.validate_dependencies()?;
        Ok(app)
    }
}

impl Service {
    pub fn from_compose(
        app_id: u32,
        app_uuid: Option<&str>,
        name: &str,
        compose: ServiceComposition,
    ) -> Result<Service, ValidationError> {
        if compose.image.trim().is_empty() {
            return Err(ValidationError::ImageNotFound {
                service: name.to_string(),
            });
        }

        let mut labels = compose.labels;
        labels.insert(SUPERVISED_LABEL.into(), "true".into());
        labels.insert(APP_ID_LABEL.into(), app_id.to_string());
        labels.insert(SERVICE_ID_LABEL.into(), compose.service_id.to_string());
        labels.insert(SERVICE_NAME_LABEL.into(), name.to_string());
        labels.insert(RELEASE_ID_LABEL.into(), compose.release_id.to_string());
        if let Some(uuid) = app_uuid {
            labels.insert(APP_UUID_LABEL.into(), uuid.to_string());
        }

        Ok(Service {
            app_id,
            app_uuid: app_uuid.map(str::to_string),
            service_id: compose.service_id,
            service_name: name.to_string(),
            release_id: compose.release_id,
            image_id: compose.image_id,
            image_name: compose.image.clone(),
            container_id: None,
            status: ServiceStatus::Installed,
            created_at: None,
            config: ServiceConfig {
                image: compose.image,
                running: compose.running,
                privileged: compose.privileged,
                labels,
                environment: compose.environment,
                command: compose.command,
                volumes: compose.volumes,
                networks: compose.networks,
                depends_on: compose.depends_on,
                restart: compose.restart,
            },
        })
    }
}

impl Network {
    pub fn from_compose(
        app_id: u32,
        app_uuid: Option<&str>,
        name: &str,
        compose: NetworkComposition,
    ) -> Result<Network, ValidationError> {
        let ipam = match compose.ipam {
            None => Ipam::default(),
            Some(ipam) => {
                let mut pools = Vec::new();
                for pool in ipam.config {
                    let (subnet, gateway) = match (pool.subnet, pool.gateway) {
                        (Some(subnet), Some(gateway)) => (subnet, gateway),
                        _ => {
                            return Err(ValidationError::InvalidNetworkConfiguration {
                                network: name.to_string(),
                                reason: "ipam pool requires both subnet and gateway".into(),
                            });
                        }
                    };
                    pools.push(IpamPool {
                        subnet,
                        gateway,
                        ip_range: pool.ip_range,
                        aux_addresses: pool.aux_addresses,
                    });
                }
                Ipam {
                    driver: ipam.driver.unwrap_or_else(|| "default".into()),
                    pools,
                    options: ipam.options,
                }
            }
        };

        let mut labels = compose.labels;
        labels.extend(supervised_labels(app_uuid));

        let network = Network {
            app_id,
            app_uuid: app_uuid.map(str::to_string),
            name: name.to_string(),
            config: NetworkConfig {
                driver: compose.driver.unwrap_or_else(|| "bridge".into()),
                ipam,
                enable_ipv6: compose.enable_ipv6,
                internal: compose.internal,
                labels,
                options: compose.options,
            },
        };
        network.validate()?;
        Ok(network)
    }
}

impl Volume {
    pub fn from_compose(
        app_id: u32,
        app_uuid: Option<&str>,
        name: &str,
        compose: VolumeComposition,
    ) -> Volume {
        let mut labels = compose.labels;
        labels.extend(supervised_labels(app_uuid));

        Volume {
            app_id,
            app_uuid: app_uuid.map(str::to_string),
            name: name.to_string(),
            config: VolumeConfig {
                driver: compose.driver.unwrap_or_else(|| "local".into()),
                driver_opts: compose.driver_opts,
                labels,
            },
        }
    }
}

/// A service may only attach to networks and mount volumes its app declares.
fn validate_references(
    service: &Service,
    networks: &BTreeMap<String, Network>,
    volumes: &BTreeMap<String, Volume>,
) -> Result<(), ValidationError> {
    for net in service.config.networks.keys() {
        if net != DEFAULT_NETWORK && !networks.contains_key(net) {
            return Err(ValidationError::InvalidServiceConfiguration {
                service: service.service_name.clone(),
                reason: format!("attaches to undeclared network {net}"),
            });
        }
    }
    for entry in &service.config.volumes {
        let source = entry.split_once(':').map_or(entry.as_str(), |(src, _)| src);
        if !source.starts_with('/') && !volumes.contains_key(source) {
            return Err(ValidationError::InvalidServiceConfiguration {
                service: service.service_name.clone(),
                reason: format!("mounts undeclared volume {source}"),
            });
        }
    }
    Ok(())
}
