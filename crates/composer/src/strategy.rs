use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::UPDATE_STRATEGY_LABEL;
use crate::service::Service;

/// Per-service policy for ordering kill/fetch/start when a material config
/// change forces the container to be recreated.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    #[default]
    DownloadThenKill,
    KillThenDownload,
    DeleteThenDownload,
    HandOver,
}

impl UpdateStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStrategy::DownloadThenKill => "download-then-kill",
            UpdateStrategy::KillThenDownload => "kill-then-download",
            UpdateStrategy::DeleteThenDownload => "delete-then-download",
            UpdateStrategy::HandOver => "hand-over",
        }
    }

    /// Strict parse; `None` for values outside the recognized set.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "download-then-kill" => Some(UpdateStrategy::DownloadThenKill),
            "kill-then-download" => Some(UpdateStrategy::KillThenDownload),
            "delete-then-download" => Some(UpdateStrategy::DeleteThenDownload),
            "hand-over" => Some(UpdateStrategy::HandOver),
            _ => None,
        }
    }

    /// Label semantics: absent or unrecognized values mean the default.
    pub fn from_label(value: Option<&str>) -> Self {
        value.and_then(Self::parse).unwrap_or_default()
    }
}

/// Unknown-strategy warnings, deduplicated per distinct label value.
///
/// Owned by the reconcile loop like the start memo, so planning itself stays
/// lock-free; the loop runs each newly ingested target's services through
/// [`StrategyWarnings::note_service`] once.
#[derive(Debug, Clone, Default)]
pub struct StrategyWarnings {
    seen: BTreeSet<String>,
}

impl StrategyWarnings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Logs an unrecognized strategy value the first time it is seen.
    pub fn note_service(&mut self, service: &Service) {
        let Some(value) = service.config.labels.get(UPDATE_STRATEGY_LABEL) else {
            return;
        };
        if UpdateStrategy::parse(value).is_none() && self.seen.insert(value.clone()) {
            warn!(
                strategy = %value,
                service = %service.service_name,
                "unknown update strategy label, using download-then-kill"
            );
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        self.seen.contains(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::{ServiceConfig, ServiceStatus};

    #[test]
    fn parses_known_values() {
        assert_eq!(
            UpdateStrategy::parse("kill-then-download"),
            Some(UpdateStrategy::KillThenDownload)
        );
        assert_eq!(
            UpdateStrategy::parse("delete-then-download"),
            Some(UpdateStrategy::DeleteThenDownload)
        );
        assert_eq!(
            UpdateStrategy::parse("hand-over"),
            Some(UpdateStrategy::HandOver)
        );
        assert_eq!(UpdateStrategy::parse("rolling-maybe"), None);
    }

    #[test]
    fn missing_or_unknown_values_use_default() {
        assert_eq!(
            UpdateStrategy::from_label(None),
            UpdateStrategy::DownloadThenKill
        );
        assert_eq!(
            UpdateStrategy::from_label(Some("rolling-maybe")),
            UpdateStrategy::DownloadThenKill
        );
    }

    #[test]
    fn round_trips_as_str() {
        for strategy in [
            UpdateStrategy::DownloadThenKill,
            UpdateStrategy::KillThenDownload,
            UpdateStrategy::DeleteThenDownload,
            UpdateStrategy::HandOver,
        ] {
            assert_eq!(UpdateStrategy::parse(strategy.as_str()), Some(strategy));
        }
    }

    fn service_with_strategy(value: Option<&str>) -> Service {
        let mut config = ServiceConfig {
            image: "app:1".into(),
            ..ServiceConfig::default()
        };
        if let Some(value) = value {
            config
                .labels
                .insert(UPDATE_STRATEGY_LABEL.into(), value.into());
        }
        Service {
            app_id: 1,
            app_uuid: None,
            service_id: 1,
            service_name: "main".into(),
            release_id: 1,
            image_id: 1,
            image_name: "app:1".into(),
            container_id: None,
            status: ServiceStatus::Installed,
            created_at: None,
            config,
        }
    }

    #[test]
    fn warnings_record_unknown_values_once() {
        let mut warnings = StrategyWarnings::new();
        let unknown = service_with_strategy(Some("rolling-maybe"));

        warnings.note_service(&unknown);
        warnings.note_service(&unknown);
        assert!(warnings.contains("rolling-maybe"));

        warnings.note_service(&service_with_strategy(Some("hand-over")));
        assert!(!warnings.contains("hand-over"));

        warnings.note_service(&service_with_strategy(None));
        assert!(!warnings.contains(""));
    }
}
