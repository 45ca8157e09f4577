//! Per-app diff: produces the steps that move one app's observed state
//! toward its target.
//!
//! Ordering between dependent steps is never encoded in a batch. A step whose
//! preconditions are unmet is simply not emitted; once earlier steps take
//! effect and show up in observed state, a later invocation emits it. Every
//! emitted step is safe in isolation.

use std::collections::{BTreeMap, BTreeSet};

use crate::DEFAULT_NETWORK;
use crate::app::App;
use crate::context::Context;
use crate::inventory::ImageInventory;
use crate::network::Network;
use crate::service::{Service, ServiceStatus};
use crate::step::Step;
use crate::UPDATE_STRATEGY_LABEL;
use crate::strategy::UpdateStrategy;

pub(crate) fn plan_app(current: Option<&App>, target: &App, ctx: &Context) -> Vec<Step> {
    let empty;
    let current = match current {
        Some(app) => app,
        None => {
            empty = App::empty(target.app_id, target.app_uuid.clone());
            &empty
        }
    };

    let target_networks = effective_networks(target);

    let mut steps = Vec::new();
    steps.extend(volume_steps(current, target));
    steps.extend(network_steps(current, target, &target_networks));
    steps.extend(service_steps(current, target, &target_networks, ctx));
    steps
}

/// The target's networks plus the implicit `default` bridge every app with
/// services is guaranteed.
pub(crate) fn effective_networks(target: &App) -> BTreeMap<String, Network> {
    let mut networks = target.networks.clone();
    if !target.services.is_empty() {
        networks.entry(DEFAULT_NETWORK.to_string()).or_insert_with(|| {
            Network::default_for_app(target.app_id, target.app_uuid.as_deref())
        });
    }
    networks
}

/// How a service counts as using a network: an explicit attachment, or the
/// implicit `default` membership of services that declare none.
pub(crate) fn attached_to_network(service: &Service, name: &str) -> bool {
    service.references_network(name)
        || (name == DEFAULT_NETWORK && service.config.networks.is_empty())
}

/// The single way a current service is torn down, wherever the need arises.
pub(crate) fn teardown_step(current: &Service) -> Step {
    match current.status {
        ServiceStatus::Stopping => Step::Noop,
        ServiceStatus::Dead => Step::Remove {
            current: current.clone(),
        },
        _ => Step::Kill {
            current: current.clone(),
        },
    }
}

fn volume_steps(current: &App, target: &App) -> Vec<Step> {
    let mut steps = Vec::new();
    for (name, tvol) in &target.volumes {
        match current.volumes.get(name) {
            None => steps.push(Step::CreateVolume {
                target: tvol.clone(),
            }),
            Some(cvol) if !cvol.is_equal_config(tvol) => {
                // Recreation: users go first, then the volume, and the
                // create falls out of the None arm on a later invocation.
                let users: Vec<&Service> = current
                    .services
                    .iter()
                    .filter(|svc| svc.references_volume(name))
                    .collect();
                if users.is_empty() {
                    steps.push(Step::RemoveVolume {
                        current: cvol.clone(),
                    });
                } else {
                    steps.extend(users.into_iter().map(teardown_step));
                }
            }
            Some(_) => {}
        }
    }
    // Volumes only in current are left alone here; the cross-app pass
    // removes them once nothing references them.
    steps
}

fn network_steps(
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
) -> Vec<Step> {
    let mut steps = Vec::new();
    for (name, tnet) in target_networks {
        match current.networks.get(name) {
            None => steps.push(Step::CreateNetwork {
                target: tnet.clone(),
            }),
            Some(cnet) if !cnet.is_equal_config(tnet) => {
                let users: Vec<&Service> = current
                    .services
                    .iter()
                    .filter(|svc| attached_to_network(svc, name))
                    .collect();
                if users.is_empty() {
                    steps.push(Step::RemoveNetwork {
                        current: cnet.clone(),
                    });
                } else {
                    steps.extend(users.into_iter().map(teardown_step));
                }
            }
            Some(_) => {}
        }
    }
    steps
}

fn service_steps(
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
    ctx: &Context,
) -> Vec<Step> {
    let inventory = ctx.inventory();
    let mut names: BTreeSet<&str> = current
        .services
        .iter()
        .map(|svc| svc.service_name.as_str())
        .collect();
    names.extend(target.services.iter().map(|svc| svc.service_name.as_str()));

    let mut steps = Vec::new();
    for name in names {
        let currents: Vec<&Service> = current.services_named(name).collect();
        match target.service_by_name(name) {
            None => steps.extend(currents.into_iter().map(teardown_step)),
            Some(tgt) if currents.is_empty() => {
                if tgt.config.running {
                    steps.extend(start_steps(
                        start_decision(tgt, current, target, target_networks, ctx, &inventory),
                        tgt,
                    ));
                }
            }
            Some(tgt) => {
                let primary = currents
                    .iter()
                    .copied()
                    .find(|c| c.release_id == tgt.release_id)
                    .or_else(|| currents.iter().copied().max_by_key(|c| c.release_id));
                let Some(primary) = primary else { continue };
                steps.extend(pair_steps(
                    primary,
                    tgt,
                    current,
                    target,
                    target_networks,
                    ctx,
                    &inventory,
                ));
                for old in currents
                    .iter()
                    .filter(|c| c.release_id != primary.release_id)
                {
                    steps.push(superseded_step(old, tgt));
                }
            }
        }
    }
    steps
}

/// What keeps a target-only service from being started right now.
enum StartDecision {
    Fetch,
    WaitDownloading,
    WaitResources,
    WaitDependencies,
    WaitEngine,
    Ready,
}

fn start_decision(
    target_svc: &Service,
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
    ctx: &Context,
    inventory: &ImageInventory<'_>,
) -> StartDecision {
    if !inventory.is_available(target_svc) {
        if inventory.is_downloading(target_svc) {
            return StartDecision::WaitDownloading;
        }
        return StartDecision::Fetch;
    }
    if !resources_ready(target_svc, current, target, target_networks) {
        return StartDecision::WaitResources;
    }
    if !dependencies_ready(target_svc, current, ctx) {
        return StartDecision::WaitDependencies;
    }
    if pending_start(target_svc, current, ctx) {
        return StartDecision::WaitEngine;
    }
    StartDecision::Ready
}

fn start_steps(decision: StartDecision, target_svc: &Service) -> Vec<Step> {
    match decision {
        StartDecision::Fetch => vec![Step::Fetch {
            image: target_svc.image_to_fetch(),
        }],
        StartDecision::WaitDownloading
        | StartDecision::WaitDependencies
        | StartDecision::WaitEngine => vec![Step::Noop],
        // Create steps already in flight drive progress here.
        StartDecision::WaitResources => Vec::new(),
        StartDecision::Ready => vec![Step::Start {
            target: target_svc.clone(),
        }],
    }
}

/// Steps for a service present in both trees.
fn pair_steps(
    current_svc: &Service,
    target_svc: &Service,
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
    ctx: &Context,
    inventory: &ImageInventory<'_>,
) -> Vec<Step> {
    if current_svc.status == ServiceStatus::Dead {
        return vec![Step::Remove {
            current: current_svc.clone(),
        }];
    }

    if current_svc.is_equal_config(target_svc) {
        if !current_svc.has_same_release(target_svc) {
            return vec![Step::UpdateMetadata {
                current: current_svc.clone(),
                target: target_svc.clone(),
            }];
        }
        return running_state_steps(current_svc, target_svc);
    }

    strategy_steps(
        current_svc,
        target_svc,
        current,
        target,
        target_networks,
        ctx,
        inventory,
    )
}

/// Config and release agree; only the running flag may differ.
fn running_state_steps(current_svc: &Service, target_svc: &Service) -> Vec<Step> {
    match (target_svc.config.running, current_svc.status) {
        (false, ServiceStatus::Running) => vec![Step::Stop {
            current: current_svc.clone(),
        }],
        (false, ServiceStatus::Stopping) => Vec::new(),
        (true, ServiceStatus::Stopped | ServiceStatus::Installed) => vec![Step::Start {
            target: target_svc.clone(),
        }],
        (true, ServiceStatus::Installing | ServiceStatus::Stopping) => vec![Step::Noop],
        _ => Vec::new(),
    }
}

/// Material config change: the update strategy dictates the kill/fetch/start
/// interleaving across invocations.
fn strategy_steps(
    current_svc: &Service,
    target_svc: &Service,
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
    ctx: &Context,
    inventory: &ImageInventory<'_>,
) -> Vec<Step> {
    match strategy_for(current_svc, target_svc) {
        UpdateStrategy::DownloadThenKill => {
            if inventory.is_available(target_svc) {
                vec![teardown_step(current_svc)]
            } else if inventory.is_downloading(target_svc) {
                vec![Step::Noop]
            } else {
                vec![Step::Fetch {
                    image: target_svc.image_to_fetch(),
                }]
            }
        }
        UpdateStrategy::KillThenDownload => vec![teardown_step(current_svc)],
        UpdateStrategy::DeleteThenDownload => {
            let teardown = teardown_step(current_svc);
            if teardown.is_noop() {
                vec![Step::Noop]
            } else {
                vec![
                    teardown,
                    Step::RemoveImage {
                        image: current_svc.image_to_remove(),
                    },
                ]
            }
        }
        UpdateStrategy::HandOver => {
            // New release comes up alongside the old one; the old release is
            // signalled and killed once the successor is observed (see
            // superseded_step).
            match start_decision(target_svc, current, target, target_networks, ctx, inventory) {
                StartDecision::Fetch => vec![Step::Fetch {
                    image: target_svc.image_to_fetch(),
                }],
                StartDecision::Ready => vec![Step::Start {
                    target: target_svc.clone(),
                }],
                _ => vec![Step::Noop],
            }
        }
    }
}

/// Step for an observed release that has been superseded by the one matching
/// the target, i.e. the tail end of a hand-over.
fn superseded_step(old: &Service, target_svc: &Service) -> Step {
    match old.status {
        ServiceStatus::Handover => Step::Kill {
            current: old.clone(),
        },
        ServiceStatus::Stopping => Step::Noop,
        ServiceStatus::Dead => Step::Remove {
            current: old.clone(),
        },
        _ => {
            if strategy_for(old, target_svc) == UpdateStrategy::HandOver {
                Step::Handover {
                    current: old.clone(),
                    target: target_svc.clone(),
                }
            } else {
                Step::Kill {
                    current: old.clone(),
                }
            }
        }
    }
}

/// The strategy label is read off the observed service first so an in-flight
/// update keeps the policy it started under, then off the target.
fn strategy_for(current_svc: &Service, target_svc: &Service) -> UpdateStrategy {
    let label = current_svc
        .config
        .labels
        .get(UPDATE_STRATEGY_LABEL)
        .or_else(|| target_svc.config.labels.get(UPDATE_STRATEGY_LABEL));
    UpdateStrategy::from_label(label.map(String::as_str))
}

/// Every network and volume the service explicitly references must exist in
/// observed state and already match its target config.
fn resources_ready(
    svc: &Service,
    current: &App,
    target: &App,
    target_networks: &BTreeMap<String, Network>,
) -> bool {
    for name in svc.config.networks.keys() {
        let ready = match (current.networks.get(name), target_networks.get(name)) {
            (Some(observed), Some(wanted)) => observed.is_equal_config(wanted),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !ready {
            return false;
        }
    }
    for entry in &svc.config.volumes {
        let source = entry.split_once(':').map_or(entry.as_str(), |(src, _)| src);
        if source.starts_with('/') {
            continue;
        }
        let ready = match (current.volumes.get(source), target.volumes.get(source)) {
            (Some(observed), Some(wanted)) => observed.is_equal_config(wanted),
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !ready {
            return false;
        }
    }
    true
}

/// All depends_on siblings are observed Running and were started by us.
fn dependencies_ready(svc: &Service, current: &App, ctx: &Context) -> bool {
    svc.config.depends_on.iter().all(|dep| {
        current
            .services_named(dep)
            .any(|sibling| sibling.is_running() && ctx.was_started(sibling))
    })
}

/// A start was already requested for this service and the container has not
/// surfaced in observed state yet.
fn pending_start(svc: &Service, current: &App, ctx: &Context) -> bool {
    ctx.container_ids.get(&svc.service_name).is_some_and(|cid| {
        ctx.container_started.contains(cid)
            && !current
                .services
                .iter()
                .any(|s| s.container_id.as_deref() == Some(cid))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::{Image, ImageStatus};
    use crate::service::ServiceConfig;
    use crate::volume::{Volume, VolumeConfig};

    fn target_app(app_id: u32) -> App {
        App {
            is_target: true,
            ..App::empty(app_id, None)
        }
    }

    fn service(name: &str, release_id: u32, image: &str, status: ServiceStatus) -> Service {
        Service {
            app_id: 1,
            app_uuid: None,
            service_id: 1,
            service_name: name.into(),
            release_id,
            image_id: release_id,
            image_name: image.into(),
            container_id: matches!(
                status,
                ServiceStatus::Running
                    | ServiceStatus::Stopping
                    | ServiceStatus::Dead
                    | ServiceStatus::Stopped
                    | ServiceStatus::Handover
            )
            .then(|| format!("{name}-{release_id}")),
            status,
            created_at: None,
            config: ServiceConfig {
                image: image.into(),
                ..ServiceConfig::default()
            },
        }
    }

    fn downloaded(image: &str, image_id: u32) -> Image {
        Image {
            image_id,
            app_id: 1,
            service_id: 1,
            service_name: "main".into(),
            release_id: image_id,
            name: image.into(),
            docker_image_id: Some(format!("sha256:{image_id}")),
            status: ImageStatus::Downloaded,
            download_progress: None,
        }
    }

    fn volume(name: &str) -> Volume {
        Volume {
            app_id: 1,
            app_uuid: None,
            name: name.into(),
            config: VolumeConfig::default(),
        }
    }

    fn actions(steps: &[Step]) -> Vec<&'static str> {
        steps.iter().map(Step::action).collect()
    }

    #[test]
    fn creates_missing_volume() {
        let current = App::empty(1, None);
        let mut target = target_app(1);
        target.volumes.insert("data".into(), volume("data"));

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["createVolume"]);
    }

    #[test]
    fn synthesizes_default_network_for_apps_with_services() {
        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));
        let ctx = Context {
            available_images: vec![downloaded("app:1", 1)],
            ..Context::default()
        };

        let steps = plan_app(None, &target, &ctx);
        assert!(
            steps
                .iter()
                .any(|s| matches!(s, Step::CreateNetwork { target } if target.name == "default"))
        );
        assert!(steps.iter().any(|s| matches!(s, Step::Start { .. })));
    }

    #[test]
    fn fetches_before_starting_when_image_missing() {
        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));

        let steps = plan_app(None, &target, &Context::default());
        assert!(steps.iter().any(|s| matches!(s, Step::Fetch { .. })));
        assert!(!steps.iter().any(|s| matches!(s, Step::Start { .. })));
    }

    #[test]
    fn waits_quietly_while_image_downloads() {
        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));
        let mut current = App::empty(1, None);
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));
        let ctx = Context {
            downloading: BTreeSet::from([1]),
            ..Context::default()
        };

        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["noop"]);
    }

    #[test]
    fn kill_then_download_kills_in_first_batch() {
        let mut current = App::empty(1, None);
        let mut old = service("main", 1, "main-image", ServiceStatus::Running);
        old.config
            .labels
            .insert(UPDATE_STRATEGY_LABEL.into(), "kill-then-download".into());
        current.services.push(old);
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        target
            .services
            .push(service("main", 2, "main-image-2", ServiceStatus::Installed));

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["kill"]);
    }

    #[test]
    fn download_then_kill_fetches_first_and_kills_once_available() {
        let mut current = App::empty(1, None);
        current
            .services
            .push(service("main", 1, "main-image", ServiceStatus::Running));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        target
            .services
            .push(service("main", 2, "main-image-2", ServiceStatus::Installed));

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["fetch"]);

        let ctx = Context {
            available_images: vec![downloaded("main-image-2", 2)],
            ..Context::default()
        };
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["kill"]);
    }

    #[test]
    fn delete_then_download_pairs_kill_with_image_removal() {
        let mut current = App::empty(1, None);
        let mut old = service("main", 1, "main-image", ServiceStatus::Running);
        old.config
            .labels
            .insert(UPDATE_STRATEGY_LABEL.into(), "delete-then-download".into());
        current.services.push(old);
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        target
            .services
            .push(service("main", 2, "main-image-2", ServiceStatus::Installed));

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["kill", "removeImage"]);
    }

    #[test]
    fn dead_container_is_removed_even_when_target_matches() {
        let mut current = App::empty(1, None);
        current
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Dead));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));

        let ctx = Context {
            available_images: vec![downloaded("app:1", 1)],
            ..Context::default()
        };
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["remove"]);
    }

    #[test]
    fn stopping_service_is_left_to_the_engine() {
        let mut current = App::empty(1, None);
        current
            .services
            .push(service("aux", 1, "aux:1", ServiceStatus::Stopping));
        let target = target_app(1);

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["noop"]);
    }

    #[test]
    fn metadata_only_change_updates_in_place() {
        let mut current = App::empty(1, None);
        current
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Running));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        target
            .services
            .push(service("main", 2, "app:1", ServiceStatus::Installed));

        let ctx = Context {
            available_images: vec![downloaded("app:1", 2)],
            ..Context::default()
        };
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["updateMetadata"]);
    }

    #[test]
    fn running_flag_difference_stops_and_starts() {
        let mut current = App::empty(1, None);
        current
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Running));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        let mut stopped = service("main", 1, "app:1", ServiceStatus::Installed);
        stopped.config.running = false;
        target.services.push(stopped);

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["stop"]);

        let mut current = App::empty(1, None);
        current
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Stopped));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));
        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));

        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["start"]);
    }

    #[test]
    fn volume_recreation_kills_users_before_removal() {
        let mut current = App::empty(1, None);
        let mut user = service("svc", 1, "app:1", ServiceStatus::Running);
        user.config.volumes = vec!["v:/data".into()];
        current.services.push(user);
        current.volumes.insert("v".into(), volume("v"));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let mut target = target_app(1);
        let mut tuser = service("svc", 1, "app:1", ServiceStatus::Installed);
        tuser.config.volumes = vec!["v:/data".into()];
        target.services.push(tuser);
        let mut tvol = volume("v");
        tvol.config.labels.insert("tier".into(), "hot".into());
        target.volumes.insert("v".into(), tvol);

        let ctx = Context {
            available_images: vec![downloaded("app:1", 1)],
            ..Context::default()
        };

        // Users first.
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["kill"]);

        // Then the volume itself, with the start held back.
        current.services.clear();
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["removeVolume"]);

        // Then the create, start still held until it is observed.
        current.volumes.clear();
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["createVolume"]);
    }

    #[test]
    fn dependencies_gate_start_until_running_and_started() {
        let mut target = target_app(1);
        let mut main = service("main", 1, "main:1", ServiceStatus::Installed);
        main.config.depends_on = vec!["dep".into()];
        target.services.push(main);
        target
            .services
            .push(service("dep", 1, "dep:1", ServiceStatus::Installed));

        let mut ctx = Context {
            available_images: vec![downloaded("main:1", 1), downloaded("dep:1", 1)],
            ..Context::default()
        };

        let steps = plan_app(None, &target, &ctx);
        assert!(
            steps
                .iter()
                .any(|s| matches!(s, Step::Start { target } if target.service_name == "dep"))
        );
        assert!(
            !steps
                .iter()
                .any(|s| matches!(s, Step::Start { target } if target.service_name == "main"))
        );

        let mut current = App::empty(1, None);
        current
            .services
            .push(service("dep", 1, "dep:1", ServiceStatus::Running));
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));
        ctx.container_started.insert("dep-1".into());

        let steps = plan_app(Some(&current), &target, &ctx);
        assert!(
            steps
                .iter()
                .any(|s| matches!(s, Step::Start { target } if target.service_name == "main"))
        );
    }

    #[test]
    fn pending_start_suppresses_duplicate_start_requests() {
        let mut target = target_app(1);
        target
            .services
            .push(service("main", 1, "app:1", ServiceStatus::Installed));
        let mut current = App::empty(1, None);
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let ctx = Context {
            available_images: vec![downloaded("app:1", 1)],
            container_ids: BTreeMap::from([("main".to_string(), "c1".to_string())]),
            container_started: BTreeSet::from(["c1".to_string()]),
            ..Context::default()
        };

        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["noop"]);
    }

    #[test]
    fn hand_over_runs_both_releases_then_signals_then_kills() {
        let strategy_label = (UPDATE_STRATEGY_LABEL.to_string(), "hand-over".to_string());

        let mut old = service("main", 1, "main:1", ServiceStatus::Running);
        old.config.labels.extend([strategy_label.clone()]);
        let mut new = service("main", 2, "main:2", ServiceStatus::Installed);
        new.config.labels.extend([strategy_label.clone()]);

        let mut current = App::empty(1, None);
        current.services.push(old.clone());
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));
        let mut target = target_app(1);
        target.services.push(new.clone());

        // New image not on disk yet: fetch.
        let steps = plan_app(Some(&current), &target, &Context::default());
        assert_eq!(actions(&steps), vec!["fetch"]);

        // Image available: the successor starts alongside the old release.
        let ctx = Context {
            available_images: vec![downloaded("main:2", 2)],
            ..Context::default()
        };
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["start"]);

        // Both observed: signal the old release.
        let mut running_new = new.clone();
        running_new.status = ServiceStatus::Running;
        running_new.container_id = Some("main-2".into());
        current.services.push(running_new);
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["handover"]);

        // Signal acknowledged: the old release goes away.
        current.services[0].status = ServiceStatus::Handover;
        let steps = plan_app(Some(&current), &target, &ctx);
        assert_eq!(actions(&steps), vec!["kill"]);
    }

    #[test]
    fn target_only_service_that_should_not_run_is_left_alone() {
        let mut target = target_app(1);
        let mut svc = service("main", 1, "app:1", ServiceStatus::Installed);
        svc.config.running = false;
        target.services.push(svc);
        let mut current = App::empty(1, None);
        current
            .networks
            .insert("default".into(), Network::default_for_app(1, None));

        let ctx = Context {
            available_images: vec![downloaded("app:1", 1)],
            ..Context::default()
        };
        let steps = plan_app(Some(&current), &target, &ctx);
        assert!(steps.is_empty());
    }
}
