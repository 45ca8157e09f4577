use serde::{Deserialize, Serialize};

use crate::image::Image;
use crate::network::Network;
use crate::service::Service;
use crate::volume::Volume;

/// An atomic, executable mutation against the container engine.
///
/// Steps are plain values; nothing here talks to the engine. Serialized form
/// tags each step with its action name so batches read naturally in logs and
/// over the device API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum Step {
    Fetch { image: Image },
    RemoveImage { image: Image },
    CreateNetwork { target: Network },
    RemoveNetwork { current: Network },
    CreateVolume { target: Volume },
    RemoveVolume { current: Volume },
    Start { target: Service },
    Stop { current: Service },
    Kill { current: Service },
    /// Purge a dead container so the service can be recreated.
    Remove { current: Service },
    /// Only release metadata differs; rewrite identity labels in place.
    UpdateMetadata { current: Service, target: Service },
    /// Signal the old release that its successor is up.
    Handover { current: Service, target: Service },
    Restart { current: Service },
    Noop,
}

impl Step {
    pub fn action(&self) -> &'static str {
        match self {
            Step::Fetch { .. } => "fetch",
            Step::RemoveImage { .. } => "removeImage",
            Step::CreateNetwork { .. } => "createNetwork",
            Step::RemoveNetwork { .. } => "removeNetwork",
            Step::CreateVolume { .. } => "createVolume",
            Step::RemoveVolume { .. } => "removeVolume",
            Step::Start { .. } => "start",
            Step::Stop { .. } => "stop",
            Step::Kill { .. } => "kill",
            Step::Remove { .. } => "remove",
            Step::UpdateMetadata { .. } => "updateMetadata",
            Step::Handover { .. } => "handover",
            Step::Restart { .. } => "restart",
            Step::Noop => "noop",
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Step::Noop)
    }

    /// Identity used to drop duplicate steps from one batch; two steps with
    /// the same identity would mutate the same resource the same way.
    pub(crate) fn identity(&self) -> StepIdentity {
        match self {
            Step::Fetch { image } => StepIdentity::Fetch(image.image_id),
            Step::RemoveImage { image } => {
                StepIdentity::RemoveImage(image.image_id, image.name.clone())
            }
            Step::CreateNetwork { target } => {
                StepIdentity::CreateNetwork(target.app_id, target.name.clone())
            }
            Step::RemoveNetwork { current } => {
                StepIdentity::RemoveNetwork(current.app_id, current.name.clone())
            }
            Step::CreateVolume { target } => {
                StepIdentity::CreateVolume(target.app_id, target.name.clone())
            }
            Step::RemoveVolume { current } => {
                StepIdentity::RemoveVolume(current.app_id, current.name.clone())
            }
            Step::Start { target } => StepIdentity::Start(
                target.app_id,
                target.service_name.clone(),
                target.release_id,
            ),
            Step::Stop { current } => StepIdentity::Stop(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
            ),
            Step::Kill { current } => StepIdentity::Kill(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
            ),
            Step::Remove { current } => StepIdentity::Remove(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
            ),
            Step::UpdateMetadata { current, target } => StepIdentity::UpdateMetadata(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
                target.release_id,
            ),
            Step::Handover { current, target } => StepIdentity::Handover(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
                target.release_id,
            ),
            Step::Restart { current } => StepIdentity::Restart(
                current.app_id,
                current.service_name.clone(),
                current.release_id,
            ),
            Step::Noop => StepIdentity::Noop,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum StepIdentity {
    Fetch(u32),
    RemoveImage(u32, String),
    CreateNetwork(u32, String),
    RemoveNetwork(u32, String),
    CreateVolume(u32, String),
    RemoveVolume(u32, String),
    Start(u32, String, u32),
    Stop(u32, String, u32),
    Kill(u32, String, u32),
    Remove(u32, String, u32),
    UpdateMetadata(u32, String, u32, u32),
    Handover(u32, String, u32, u32),
    Restart(u32, String, u32),
    Noop,
}
