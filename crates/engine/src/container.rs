use std::collections::BTreeMap;

use bollard::models::{
    ContainerInspectResponse, ContainerState, ContainerStateStatusEnum, MountPointTypeEnum,
    RestartPolicyNameEnum,
};
use chrono::{DateTime, Utc};
use tracing::warn;

use composer::image::{Image, is_same_image};
use composer::service::{
    Command, NetworkAttachment, RestartPolicy, Service, ServiceConfig, ServiceStatus,
};
use composer::{
    APP_ID_LABEL, APP_UUID_LABEL, RELEASE_ID_LABEL, SERVICE_ID_LABEL, SERVICE_NAME_LABEL,
    SUPERVISED_LABEL,
};

use crate::AdapterError;
use crate::names::parse_scoped_name;

/// Builds the observed [`Service`] for one inspected container.
///
/// Returns `Ok(None)` for containers this agent does not own. The image
/// inventory is consulted to recover the image id and registry name the
/// container was fetched under.
pub fn service_from_engine(
    inspect: &ContainerInspectResponse,
    images: &[Image],
) -> Result<Option<Service>, AdapterError> {
    let container_ref = inspect
        .name
        .clone()
        .or_else(|| inspect.id.clone())
        .unwrap_or_else(|| "<unnamed>".into());

    let config = inspect.config.as_ref();
    let labels: BTreeMap<String, String> = config
        .and_then(|cfg| cfg.labels.as_ref())
        .map(|labels| labels.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
        .unwrap_or_default();

    if labels.get(SUPERVISED_LABEL).map(String::as_str) != Some("true") {
        return Ok(None);
    }

    let app_id = parse_u32_label(&labels, APP_ID_LABEL, &container_ref).map_err(|err| {
        match err {
            AdapterError::InvalidLabel { value, .. } => AdapterError::InvalidAppId { value },
            other => other,
        }
    })?;
    let service_id = parse_u32_label(&labels, SERVICE_ID_LABEL, &container_ref)?;
    let release_id = parse_u32_label(&labels, RELEASE_ID_LABEL, &container_ref)?;
    let service_name = labels
        .get(SERVICE_NAME_LABEL)
        .cloned()
        .ok_or(AdapterError::MissingLabel {
            container: container_ref.clone(),
            label: SERVICE_NAME_LABEL,
        })?;
    let app_uuid = labels.get(APP_UUID_LABEL).cloned();

    let image_ref = config
        .and_then(|cfg| cfg.image.clone())
        .unwrap_or_default();
    let (image_id, image_name) = resolve_image(&image_ref, inspect.image.as_deref(), images);

    let environment = config
        .and_then(|cfg| cfg.env.as_ref())
        .map(|env| {
            env.iter()
                .filter_map(|entry| entry.split_once('='))
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default();

    // The engine reports the image default here when the container was
    // created without an explicit command; config equality tolerates that.
    let command = config
        .and_then(|cfg| cfg.cmd.clone())
        .filter(|argv| !argv.is_empty())
        .map(Command::Args);

    let state = inspect.state.as_ref();
    let status = map_status(state);
    let running = state.and_then(|s| s.running).unwrap_or(false);

    let host_config = inspect.host_config.as_ref();
    let privileged = host_config.and_then(|hc| hc.privileged).unwrap_or(false);
    let restart = host_config
        .and_then(|hc| hc.restart_policy.as_ref())
        .and_then(|policy| policy.name.as_ref())
        .map(map_restart_policy)
        .unwrap_or_default();

    let volumes = inspect
        .mounts
        .as_deref()
        .unwrap_or_default()
        .iter()
        .filter(|mount| mount.typ == Some(MountPointTypeEnum::VOLUME))
        .filter_map(|mount| {
            let scoped = mount.name.as_deref()?;
            let (mount_app, bare) = parse_scoped_name(scoped)?;
            if mount_app != app_id {
                return None;
            }
            let destination = mount.destination.as_deref()?;
            Some(format!("{bare}:{destination}"))
        })
        .collect();

    let networks = inspect
        .network_settings
        .as_ref()
        .and_then(|settings| settings.networks.as_ref())
        .map(|nets| {
            nets.iter()
                .filter_map(|(scoped, endpoint)| {
                    let (net_app, bare) = parse_scoped_name(scoped)?;
                    if net_app != app_id {
                        return None;
                    }
                    // The engine injects the container short id as an alias
                    // on every endpoint; that is not configuration.
                    let aliases = endpoint
                        .aliases
                        .clone()
                        .unwrap_or_default()
                        .into_iter()
                        .filter(|alias| !is_short_id(alias, inspect.id.as_deref()))
                        .collect();
                    Some((
                        bare.to_string(),
                        NetworkAttachment {
                            aliases,
                            ipv4_address: endpoint
                                .ipam_config
                                .as_ref()
                                .and_then(|ipam| ipam.ipv4_address.clone()),
                        },
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    let created_at = inspect
        .created
        .as_deref()
        .and_then(parse_engine_timestamp);

    Ok(Some(Service {
        app_id,
        app_uuid,
        service_id,
        service_name,
        release_id,
        image_id,
        image_name,
        container_id: inspect.id.clone(),
        status,
        created_at,
        config: ServiceConfig {
            image: image_ref,
            running,
            privileged,
            labels,
            environment,
            command,
            volumes,
            networks,
            depends_on: Vec::new(),
            restart,
        },
    }))
}

fn is_short_id(alias: &str, container_id: Option<&str>) -> bool {
    alias.len() == 12 && container_id.is_some_and(|id| id.starts_with(alias))
}

fn parse_u32_label(
    labels: &BTreeMap<String, String>,
    label: &'static str,
    container: &str,
) -> Result<u32, AdapterError> {
    let value = labels.get(label).ok_or(AdapterError::MissingLabel {
        container: container.to_string(),
        label,
    })?;
    value.parse().map_err(|_| AdapterError::InvalidLabel {
        label,
        value: value.clone(),
    })
}

/// Recovers (image id, registry name) from the inventory; a container whose
/// image the inventory no longer tracks keeps its raw reference and id 0.
fn resolve_image(image_ref: &str, engine_digest: Option<&str>, images: &[Image]) -> (u32, String) {
    let matched = images.iter().find(|img| {
        let digest = img.docker_image_id.as_deref();
        digest.zip(engine_digest).is_some_and(|(d, e)| d == e)
            || digest.is_some_and(|d| d == image_ref)
            || is_same_image(&img.name, image_ref)
    });
    match matched {
        Some(img) => (img.image_id, img.name.clone()),
        None => {
            warn!(image = %image_ref, "container image not present in inventory");
            (0, image_ref.to_string())
        }
    }
}

fn map_status(state: Option<&ContainerState>) -> ServiceStatus {
    let Some(state) = state else {
        return ServiceStatus::Installed;
    };
    match state.status {
        Some(ContainerStateStatusEnum::RUNNING | ContainerStateStatusEnum::RESTARTING) => {
            ServiceStatus::Running
        }
        Some(ContainerStateStatusEnum::PAUSED) => ServiceStatus::Running,
        Some(ContainerStateStatusEnum::CREATED) => ServiceStatus::Installed,
        Some(ContainerStateStatusEnum::REMOVING) => ServiceStatus::Stopping,
        Some(ContainerStateStatusEnum::EXITED) => ServiceStatus::Stopped,
        Some(ContainerStateStatusEnum::DEAD) => ServiceStatus::Dead,
        _ => ServiceStatus::Installed,
    }
}

fn map_restart_policy(name: &RestartPolicyNameEnum) -> RestartPolicy {
    match name {
        RestartPolicyNameEnum::NO => RestartPolicy::No,
        RestartPolicyNameEnum::ON_FAILURE => RestartPolicy::OnFailure,
        RestartPolicyNameEnum::UNLESS_STOPPED => RestartPolicy::UnlessStopped,
        _ => RestartPolicy::Always,
    }
}

fn parse_engine_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
