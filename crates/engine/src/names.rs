//! Engine object naming: app-scoped networks and volumes are serialized as
//! `<appId>_<name>`, containers as `<serviceName>_<imageId>_<releaseId>_<uuid>`.

use composer::service::Service;
use uuid::Uuid;

/// Serializes an app-scoped object name for the engine.
pub fn scoped_name(app_id: u32, name: &str) -> String {
    format!("{app_id}_{name}")
}

/// Splits an engine object name back into (app id, bare name). Returns
/// `None` when the name was not produced by [`scoped_name`]; callers decide
/// whether that is an error or just an unmanaged object.
pub fn parse_scoped_name(scoped: &str) -> Option<(u32, &str)> {
    let (prefix, name) = scoped.split_once('_')?;
    if prefix.is_empty() || name.is_empty() || !prefix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let app_id = prefix.parse().ok()?;
    Some((app_id, name))
}

/// A fresh engine container name for a service about to be created. The
/// trailing uuid keeps names unique across recreations of the same release.
pub fn container_name(service: &Service) -> String {
    format!(
        "{}_{}_{}_{}",
        service.service_name,
        service.image_id,
        service.release_id,
        Uuid::new_v4().simple()
    )
}
