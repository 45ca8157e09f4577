use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::{
    APP_UUID_LABEL, DEFAULT_NETWORK, HOST_SCOPE_APP_ID, SUPERVISED_LABEL, SUPERVISOR_NETWORK,
    strip_system_labels,
};

const DEFAULT_DRIVER: &str = "bridge";
const SUPERVISOR_SUBNET: &str = "10.114.104.0/25";
const SUPERVISOR_GATEWAY: &str = "10.114.104.1";

/// One IPAM address pool. Both `subnet` and `gateway` are mandatory.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct IpamPool {
    pub subnet: String,
    pub gateway: String,
    #[serde(default)]
    pub ip_range: Option<String>,
    #[serde(default)]
    pub aux_addresses: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Ipam {
    pub driver: String,
    #[serde(default)]
    pub pools: Vec<IpamPool>,
    #[serde(default)]
    pub options: BTreeMap<String, String>,
}

impl Default for Ipam {
    fn default() -> Self {
        Self {
            driver: "default".into(),
            pools: Vec::new(),
            options: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    pub driver: String,
    pub ipam: Ipam,
    pub enable_ipv6: bool,
    pub internal: bool,
    pub labels: BTreeMap<String, String>,
    pub options: BTreeMap<String, String>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            driver: DEFAULT_DRIVER.into(),
            ipam: Ipam::default(),
            enable_ipv6: false,
            internal: false,
            labels: BTreeMap::new(),
            options: BTreeMap::new(),
        }
    }
}

/// An app-scoped engine network, identified by (`app_id`, `name`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Network {
    pub app_id: u32,
    pub app_uuid: Option<String>,
    pub name: String,
    pub config: NetworkConfig,
}

impl Network {
    /// The implicit per-app bridge services join unless they opt out.
    pub fn default_for_app(app_id: u32, app_uuid: Option<&str>) -> Network {
        Network {
            app_id,
            app_uuid: app_uuid.map(str::to_string),
            name: DEFAULT_NETWORK.into(),
            config: NetworkConfig {
                labels: supervised_labels(app_uuid),
                ..NetworkConfig::default()
            },
        }
    }

    /// The host-level bridge the agent keeps alive across all apps.
    pub fn supervisor_bridge() -> Network {
        Network {
            app_id: HOST_SCOPE_APP_ID,
            app_uuid: None,
            name: SUPERVISOR_NETWORK.into(),
            config: NetworkConfig {
                ipam: Ipam {
                    pools: vec![IpamPool {
                        subnet: SUPERVISOR_SUBNET.into(),
                        gateway: SUPERVISOR_GATEWAY.into(),
                        ..IpamPool::default()
                    }],
                    ..Ipam::default()
                },
                labels: supervised_labels(None),
                ..NetworkConfig::default()
            },
        }
    }

    /// Config equality modulo agent-owned labels. A `false` means the engine
    /// network has to be destroyed and recreated.
    pub fn is_equal_config(&self, other: &Network) -> bool {
        let mut a = self.config.clone();
        let mut b = other.config.clone();
        a.labels = strip_system_labels(&a.labels);
        b.labels = strip_system_labels(&b.labels);
        a == b
    }

    pub(crate) fn validate(&self) -> Result<(), ValidationError> {
        for pool in &self.config.ipam.pools {
            if pool.subnet.is_empty() || pool.gateway.is_empty() {
                return Err(ValidationError::InvalidNetworkConfiguration {
                    network: self.name.clone(),
                    reason: "ipam pool requires both subnet and gateway".into(),
                });
            }
        }
        Ok(())
    }
}

pub(crate) fn supervised_labels(app_uuid: Option<&str>) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::new();
    labels.insert(SUPERVISED_LABEL.to_string(), "true".to_string());
    if let Some(uuid) = app_uuid {
        labels.insert(APP_UUID_LABEL.to_string(), uuid.to_string());
    }
    labels
}
