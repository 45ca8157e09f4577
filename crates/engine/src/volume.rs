use std::collections::BTreeMap;

use composer::volume::{Volume, VolumeConfig};
use composer::{APP_UUID_LABEL, SUPERVISED_LABEL};

use crate::AdapterError;
use crate::names::parse_scoped_name;

/// Builds the observed [`Volume`] for one engine volume, skipping volumes
/// this agent does not own.
pub fn volume_from_engine(vol: &bollard::models::Volume) -> Result<Option<Volume>, AdapterError> {
    let labels: BTreeMap<String, String> = vol
        .labels
        .iter()
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    if labels.get(SUPERVISED_LABEL).map(String::as_str) != Some("true") {
        return Ok(None);
    }

    let (app_id, name) =
        parse_scoped_name(&vol.name).ok_or_else(|| AdapterError::InvalidVolumeName {
            name: vol.name.clone(),
        })?;

    let app_uuid = labels.get(APP_UUID_LABEL).cloned();

    Ok(Some(Volume {
        app_id,
        app_uuid,
        name: name.to_string(),
        config: VolumeConfig {
            driver: vol.driver.clone(),
            driver_opts: vol
                .options
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            labels,
        },
    }))
}
