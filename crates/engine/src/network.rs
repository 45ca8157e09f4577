use std::collections::BTreeMap;

use composer::network::{Ipam, IpamPool, Network, NetworkConfig};
use composer::{APP_UUID_LABEL, SUPERVISED_LABEL};

use crate::AdapterError;
use crate::names::parse_scoped_name;

/// Builds the observed [`Network`] for one engine network.
///
/// Returns `Ok(None)` for networks this agent does not own; a supervised
/// network whose name does not carry the app scope is an error.
pub fn network_from_engine(
    net: &bollard::models::Network,
) -> Result<Option<Network>, AdapterError> {
    let labels: BTreeMap<String, String> = net
        .labels
        .as_ref()
        .map(|labels| labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    if labels.get(SUPERVISED_LABEL).map(String::as_str) != Some("true") {
        return Ok(None);
    }

    let scoped = net.name.clone().unwrap_or_default();
    let (app_id, name) =
        parse_scoped_name(&scoped).ok_or_else(|| AdapterError::InvalidNetworkName {
            name: scoped.clone(),
        })?;

    let ipam = match net.ipam.as_ref() {
        None => Ipam::default(),
        Some(ipam) => {
            let mut pools = Vec::new();
            for pool in ipam.config.as_deref().unwrap_or_default() {
                let (subnet, gateway) = match (pool.subnet.clone(), pool.gateway.clone()) {
                    (Some(subnet), Some(gateway)) => (subnet, gateway),
                    _ => {
                        let err = composer::errors::ValidationError::InvalidNetworkConfiguration {
                            network: name.to_string(),
                            reason: "ipam pool requires both subnet and gateway".into(),
                        };
                        return Err(err.into());
                    }
                };
                pools.push(IpamPool {
                    subnet,
                    gateway,
                    ip_range: pool.ip_range.clone(),
                    aux_addresses: pool
                        .auxiliary_addresses
                        .as_ref()
                        .map(|aux| aux.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        .unwrap_or_default(),
                });
            }
            Ipam {
                driver: ipam.driver.clone().unwrap_or_else(|| "default".into()),
                pools,
                options: ipam
                    .options
                    .as_ref()
                    .map(|opts| opts.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                    .unwrap_or_default(),
            }
        }
    };

    let app_uuid = labels.get(APP_UUID_LABEL).cloned();

    Ok(Some(Network {
        app_id,
        app_uuid,
        name: name.to_string(),
        config: NetworkConfig {
            driver: net.driver.clone().unwrap_or_else(|| "bridge".into()),
            ipam,
            enable_ipv6: net.enable_ipv6.unwrap_or(false),
            internal: net.internal.unwrap_or(false),
            labels,
            options: net
                .options
                .as_ref()
                .map(|opts| opts.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                .unwrap_or_default(),
        },
    }))
}
