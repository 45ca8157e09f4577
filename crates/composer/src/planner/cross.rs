//! Steps that only make sense with the whole device in view: tearing down
//! apps the target no longer mentions, sweeping resources nothing references
//! any more, and keeping the host bridge alive.

use crate::app::App;
use crate::context::Context;
use crate::image::{ImageStatus, is_same_image};
use crate::network::Network;
use crate::step::Step;
use crate::{HOST_SCOPE_APP_ID, SUPERVISOR_NETWORK};

use super::app::{attached_to_network, effective_networks, teardown_step};

pub(crate) fn plan(current: &[App], target: &[App], ctx: &Context) -> Vec<Step> {
    let mut steps = Vec::new();

    // Whole-app removal is cloud-driven and therefore suppressed in local
    // mode. Host-scoped objects are never app removals.
    if !ctx.local_mode {
        for app in current.iter().filter(|app| {
            app.app_id != HOST_SCOPE_APP_ID
                && !target.iter().any(|tgt| tgt.app_id == app.app_id)
        }) {
            if app.services.is_empty() {
                for net in app.networks.values() {
                    steps.push(Step::RemoveNetwork {
                        current: net.clone(),
                    });
                }
                for vol in app.volumes.values() {
                    steps.push(Step::RemoveVolume {
                        current: vol.clone(),
                    });
                }
            } else {
                steps.extend(app.services.iter().map(teardown_step));
            }
        }
    }

    // Resources of live apps that neither tree references any more.
    for app in current {
        let Some(tgt) = target.iter().find(|tgt| tgt.app_id == app.app_id) else {
            continue;
        };
        let target_networks = effective_networks(tgt);
        for (name, net) in &app.networks {
            let referenced = app
                .services
                .iter()
                .chain(tgt.services.iter())
                .any(|svc| attached_to_network(svc, name));
            if !target_networks.contains_key(name) && !referenced {
                steps.push(Step::RemoveNetwork {
                    current: net.clone(),
                });
            }
        }
        for (name, vol) in &app.volumes {
            let referenced = app
                .services
                .iter()
                .chain(tgt.services.iter())
                .any(|svc| svc.references_volume(name));
            if !tgt.volumes.contains_key(name) && !referenced {
                steps.push(Step::RemoveVolume {
                    current: vol.clone(),
                });
            }
        }
    }

    // The agent's own bridge must exist before any service can be expected
    // to reach it.
    let wants_services = target.iter().any(|app| !app.services.is_empty());
    let bridge_present = current
        .iter()
        .any(|app| app.networks.contains_key(SUPERVISOR_NETWORK));
    if wants_services && !bridge_present {
        steps.push(Step::CreateNetwork {
            target: Network::supervisor_bridge(),
        });
    }

    steps
}

/// Trailing image removal: only runs once a batch is otherwise quiet, so an
/// update in flight never loses the image it is about to stop using.
/// Reference counting spans every app in both trees.
pub(crate) fn image_cleanup(current: &[App], target: &[App], ctx: &Context) -> Vec<Step> {
    if ctx.local_mode {
        return Vec::new();
    }

    let mut steps = Vec::new();
    for image in &ctx.available_images {
        if image.status != ImageStatus::Downloaded {
            continue;
        }
        let referenced = target
            .iter()
            .chain(current.iter())
            .flat_map(|app| app.services.iter())
            .any(|svc| {
                svc.image_id == image.image_id
                    || is_same_image(&svc.config.image, &image.name)
                    || image
                        .docker_image_id
                        .as_deref()
                        .is_some_and(|digest| digest == svc.config.image)
            });
        if !referenced {
            steps.push(Step::RemoveImage {
                image: image.clone(),
            });
        }
    }
    steps
}
