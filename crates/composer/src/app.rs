use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;
use crate::network::Network;
use crate::service::Service;
use crate::volume::Volume;

/// The unit of deployment: one app's services, networks, and volumes.
///
/// `is_target` records which state tree a value belongs to; target apps come
/// from composition documents, current apps from engine observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct App {
    pub app_id: u32,
    pub app_uuid: Option<String>,
    pub services: Vec<Service>,
    pub networks: BTreeMap<String, Network>,
    pub volumes: BTreeMap<String, Volume>,
    pub is_target: bool,
}

impl App {
    /// An empty observed app, used when a target app has no current
    /// counterpart yet.
    pub fn empty(app_id: u32, app_uuid: Option<String>) -> App {
        App {
            app_id,
            app_uuid,
            services: Vec::new(),
            networks: BTreeMap::new(),
            volumes: BTreeMap::new(),
            is_target: false,
        }
    }

    /// All observed entries for a service name; more than one only during a
    /// hand-over window.
    pub fn services_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Service> {
        self.services
            .iter()
            .filter(move |svc| svc.service_name == name)
    }

    pub fn service_by_name<'a>(&'a self, name: &str) -> Option<&'a Service> {
        self.services.iter().find(|svc| svc.service_name == name)
    }

    /// Rejects dependency graphs the planner could never make progress on:
    /// references to missing siblings and cycles.
    pub(crate) fn validate_dependencies(&self) -> Result<(), ValidationError> {
        let names: Vec<&str> = self
            .services
            .iter()
            .map(|svc| svc.service_name.as_str())
            .collect();

        for svc in &self.services {
            for dep in &svc.config.depends_on {
                if !names.contains(&dep.as_str()) {
                    return Err(ValidationError::InvalidServiceConfiguration {
                        service: svc.service_name.clone(),
                        reason: format!("depends on unknown service {dep}"),
                    });
                }
            }
        }

        // Iterative DFS over the depends_on edges; a back edge is a cycle.
        let mut finished: Vec<&str> = Vec::new();
        for start in &self.services {
            if finished.contains(&start.service_name.as_str()) {
                continue;
            }
            let mut path: Vec<&str> = Vec::new();
            self.visit(start, &mut path, &mut finished)?;
        }
        Ok(())
    }

    fn visit<'a>(
        &'a self,
        svc: &'a Service,
        path: &mut Vec<&'a str>,
        finished: &mut Vec<&'a str>,
    ) -> Result<(), ValidationError> {
        let name = svc.service_name.as_str();
        if finished.contains(&name) {
            return Ok(());
        }
        if let Some(pos) = path.iter().position(|seen| *seen == name) {
            let mut chain: Vec<String> = path[pos..].iter().map(|s| s.to_string()).collect();
            chain.push(name.to_string());
            return Err(ValidationError::DependencyCycle { chain });
        }
        path.push(name);
        for dep in &svc.config.depends_on {
            if let Some(next) = self.service_by_name(dep) {
                self.visit(next, path, finished)?;
            }
        }
        path.pop();
        finished.push(name);
        Ok(())
    }
}
