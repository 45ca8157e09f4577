use std::collections::BTreeMap;

pub mod app;
pub mod compose;
pub mod context;
pub mod errors;
pub mod executor;
pub mod image;
pub mod inventory;
pub mod network;
pub mod planner;
pub mod service;
pub mod step;
pub mod strategy;
pub mod volume;

/// Marks engine objects whose lifecycle this agent owns; unmarked objects are ignored.
pub const SUPERVISED_LABEL: &str = "io.balena.supervised";
pub const APP_ID_LABEL: &str = "io.balena.app-id";
pub const APP_UUID_LABEL: &str = "io.balena.app-uuid";
pub const SERVICE_ID_LABEL: &str = "io.balena.service-id";
pub const SERVICE_NAME_LABEL: &str = "io.balena.service-name";
pub const RELEASE_ID_LABEL: &str = "io.balena.release-id";
pub const UPDATE_STRATEGY_LABEL: &str = "io.balena.update.strategy";
pub const HANDOVER_TIMEOUT_LABEL: &str = "io.balena.update.handover-timeout";

/// Implicit per-app network every service joins unless it opts out.
pub const DEFAULT_NETWORK: &str = "default";
/// Host-level bridge the agent itself is reachable on.
pub const SUPERVISOR_NETWORK: &str = "supervisor0";
/// Reserved app id for host-scoped objects such as [`SUPERVISOR_NETWORK`].
pub const HOST_SCOPE_APP_ID: u32 = 0;

const SYSTEM_LABEL_PREFIX: &str = "io.balena.";

/// Drops agent-owned labels so equality checks see only user configuration.
///
/// Every config-equality predicate in this crate goes through this one
/// function; comparing raw label maps would make recreated objects look
/// permanently dirty.
pub fn strip_system_labels(labels: &BTreeMap<String, String>) -> BTreeMap<String, String> {
    labels
        .iter()
        .filter(|(key, _)| !key.starts_with(SYSTEM_LABEL_PREFIX))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

pub use app::App;
pub use context::{Context, StartMemo};
pub use executor::{DynStepExecutor, StepError, StepExecutor, StepOutcome};
pub use image::{Image, ImageStatus};
pub use network::Network;
pub use planner::next_steps;
pub use service::{Service, ServiceStatus};
pub use step::Step;
pub use strategy::{StrategyWarnings, UpdateStrategy};
pub use volume::Volume;
