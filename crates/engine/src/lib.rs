//! Read-side adapters between engine objects and the domain model.
//!
//! The current-state provider lists containers, networks, and volumes from
//! the engine and runs them through these conversions; anything without the
//! supervised label is skipped rather than rejected. Validation failures
//! surface here, at the boundary, so the planner only ever sees well-formed
//! values.

use thiserror::Error;

pub mod container;
pub mod names;
pub mod network;
pub mod volume;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("invalid app id label: {value}")]
    InvalidAppId { value: String },

    #[error("network name {name} does not have the <appId>_<name> form")]
    InvalidNetworkName { name: String },

    #[error("volume name {name} does not have the <appId>_<name> form")]
    InvalidVolumeName { name: String },

    #[error("container {container} is missing label {label}")]
    MissingLabel {
        container: String,
        label: &'static str,
    },

    #[error("label {label} has invalid value {value}")]
    InvalidLabel { label: &'static str, value: String },

    #[error(transparent)]
    Validation(#[from] composer::errors::ValidationError),
}

pub use container::service_from_engine;
pub use names::{container_name, parse_scoped_name, scoped_name};
pub use network::network_from_engine;
pub use volume::volume_from_engine;
