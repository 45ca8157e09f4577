use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::strip_system_labels;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VolumeConfig {
    pub driver: String,
    pub driver_opts: BTreeMap<String, String>,
    pub labels: BTreeMap<String, String>,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            driver: "local".into(),
            driver_opts: BTreeMap::new(),
            labels: BTreeMap::new(),
        }
    }
}

/// An app-scoped engine volume, identified by (`app_id`, `name`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Volume {
    pub app_id: u32,
    pub app_uuid: Option<String>,
    pub name: String,
    pub config: VolumeConfig,
}

impl Volume {
    /// Config equality modulo agent-owned labels. Volumes cannot be mutated
    /// in place; inequality here means remove-then-recreate.
    pub fn is_equal_config(&self, other: &Volume) -> bool {
        let mut a = self.config.clone();
        let mut b = other.config.clone();
        a.labels = strip_system_labels(&a.labels);
        b.labels = strip_system_labels(&b.labels);
        a == b
    }
}
