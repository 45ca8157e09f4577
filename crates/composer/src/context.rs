use std::collections::{BTreeMap, BTreeSet};

use crate::executor::StepOutcome;
use crate::image::Image;
use crate::inventory::ImageInventory;
use crate::service::Service;

/// The runtime view a single planner invocation works against.
///
/// Built fresh by the reconcile loop for every invocation; the planner only
/// reads it.
#[derive(Debug, Clone, Default)]
pub struct Context {
    /// When set, removals driven purely by the cloud target (whole apps,
    /// unreferenced images) are suppressed.
    pub local_mode: bool,
    /// Images currently on disk, per the image inventory provider.
    pub available_images: Vec<Image>,
    /// service-name to container-id, covering containers the executor has
    /// created but which may not have surfaced in observed state yet.
    pub container_ids: BTreeMap<String, String>,
    /// Image ids whose fetch is in flight.
    pub downloading: BTreeSet<u32>,
    /// Snapshot of the [`StartMemo`] owned by the reconcile loop.
    pub container_started: BTreeSet<String>,
}

impl Context {
    pub fn inventory(&self) -> ImageInventory<'_> {
        ImageInventory::new(&self.available_images, &self.downloading)
    }

    /// True when we have asked the engine to start this observed service's
    /// container since it was last released.
    pub(crate) fn was_started(&self, service: &Service) -> bool {
        let by_container = service
            .container_id
            .as_deref()
            .is_some_and(|id| self.container_started.contains(id));
        let by_name = self
            .container_ids
            .get(&service.service_name)
            .is_some_and(|id| self.container_started.contains(id));
        by_container || by_name
    }
}

/// Tracks container ids we have asked the engine to start and not yet seen
/// released. Owned by the reconcile loop; the planner reads a snapshot via
/// [`Context::container_started`] so repeated invocations do not re-request
/// starts the engine is still working on.
#[derive(Debug, Clone, Default)]
pub struct StartMemo {
    started: BTreeSet<String>,
}

impl StartMemo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that a start was requested for the container.
    pub fn mark_started(&mut self, container_id: impl Into<String>) {
        self.started.insert(container_id.into());
    }

    /// Drops the entry once the container is killed, removed, or otherwise
    /// released by the engine.
    pub fn forget(&mut self, container_id: &str) {
        self.started.remove(container_id);
    }

    pub fn contains(&self, container_id: &str) -> bool {
        self.started.contains(container_id)
    }

    pub fn snapshot(&self) -> BTreeSet<String> {
        self.started.clone()
    }

    /// Folds one executed step's feedback into the memo.
    pub fn absorb(&mut self, outcome: &StepOutcome) {
        for id in &outcome.started {
            self.mark_started(id.clone());
        }
        for id in &outcome.released {
            self.forget(id);
        }
    }
}
