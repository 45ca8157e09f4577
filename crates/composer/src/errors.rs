use thiserror::Error;

/// Structural validation failures raised while turning external descriptions
/// (target-state documents, engine objects) into domain values.
///
/// The planner itself never returns these; by the time it runs, both state
/// trees have already passed validation.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("service {service} has an invalid configuration: {reason}")]
    InvalidServiceConfiguration { service: String, reason: String },

    #[error("network {network} has an invalid configuration: {reason}")]
    InvalidNetworkConfiguration { network: String, reason: String },

    #[error("service {service} does not name an image to fetch")]
    ImageNotFound { service: String },

    #[error("service dependency cycle: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },
}
