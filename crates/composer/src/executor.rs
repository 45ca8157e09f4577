use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::step::Step;

pub type DynStepExecutor = Arc<dyn StepExecutor>;

/// Contract between the planner and whatever runs its steps.
///
/// The executor owns all engine I/O. Steps touching disjoint resources may
/// run in parallel; steps touching the same service, network, or volume must
/// be serialized by the implementation. Each execution reports a
/// [`StepOutcome`] the reconcile loop folds into its [`crate::StartMemo`]
/// and observed state before planning again.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    async fn execute(&self, step: &Step) -> Result<StepOutcome, StepError>;
}

/// Feedback from one executed step.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    /// Container ids a start was requested for.
    pub started: Vec<String>,
    /// Container ids killed, removed, or observed gone.
    pub released: Vec<String>,
    /// Image ids whose fetch completed during this step.
    pub fetched: Vec<u32>,
}

impl StepOutcome {
    pub fn started(container_id: impl Into<String>) -> Self {
        Self {
            started: vec![container_id.into()],
            ..Self::default()
        }
    }

    pub fn released(container_id: impl Into<String>) -> Self {
        Self {
            released: vec![container_id.into()],
            ..Self::default()
        }
    }

    pub fn fetched(image_id: u32) -> Self {
        Self {
            fetched: vec![image_id],
            ..Self::default()
        }
    }
}

/// Failures surfaced by step execution.
///
/// Transient errors retry on the next reconciliation; permanent ones are
/// deferred and surfaced through the device status API.
#[derive(Debug, Error)]
pub enum StepError {
    #[error("failed to reach container engine ({context}): {source}")]
    Connection {
        context: &'static str,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to fetch image {image}: {source}")]
    Fetch {
        image: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("image manifest for {image} is invalid")]
    InvalidManifest { image: String },
    #[error("failed to remove image {image}: {source}")]
    RemoveImage {
        image: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to create network {name}: {source}")]
    CreateNetwork {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to remove network {name}: {source}")]
    RemoveNetwork {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to create volume {name}: {source}")]
    CreateVolume {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to remove volume {name}: {source}")]
    RemoveVolume {
        name: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to start service {service}: {source}")]
    Start {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to stop service {service}: {source}")]
    Stop {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to kill service {service}: {source}")]
    Kill {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to remove container for service {service}: {source}")]
    Remove {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to update metadata for service {service}: {source}")]
    UpdateMetadata {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("handover for service {service} failed: {source}")]
    Handover {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("failed to restart service {service}: {source}")]
    Restart {
        service: String,
        #[source]
        source: anyhow::Error,
    },
}

impl StepError {
    /// Permanent failures are not retried by the reconcile loop.
    pub fn is_permanent(&self) -> bool {
        matches!(self, StepError::InvalidManifest { .. })
    }

    pub fn is_connection_error(&self) -> bool {
        matches!(self, StepError::Connection { .. })
    }
}
