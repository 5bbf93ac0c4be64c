use tracing::{info, warn};

use super::{Orchestrator, Outcome, StepResult};
use crate::model::Registry;
use crate::provider::{ApiError, ErrorKind};

/// Registries found across all projects, plus how each project went.
#[derive(Debug, Default)]
pub(super) struct Discovery {
    pub registries: Vec<Registry>,
    pub projects: Vec<StepResult>,
}

/// How listing one project ended.
enum ProjectScan {
    Found(Vec<Registry>),
    /// The project contributes nothing, even registries already listed in
    /// earlier locations.
    Skipped(String),
}

impl Orchestrator {
    /// Enumerate projects and list their registries in every configured location.
    ///
    /// A project with the Artifact Registry API disabled, or without access,
    /// contributes nothing and does not stop the run.
    pub(super) async fn discover(&self) -> Result<Discovery, ApiError> {
        info!("Discovering GCP registries");
        let projects = self.projects.list_projects().await?;
        info!(count = projects.len(), "Found projects");

        let mut discovery = Discovery::default();
        for project_id in projects {
            info!(project = %project_id, "Checking project");
            let outcome = match self.discover_project(&project_id).await? {
                ProjectScan::Found(found) => {
                    discovery.registries.extend(found);
                    Outcome::Succeeded
                }
                ProjectScan::Skipped(reason) => Outcome::Skipped(reason),
            };
            discovery.projects.push(StepResult::new(project_id, outcome));
        }
        Ok(discovery)
    }

    async fn discover_project(&self, project_id: &str) -> Result<ProjectScan, ApiError> {
        let mut registries = Vec::new();
        for location in &self.locations {
            match self.registries.list_registries(project_id, location).await {
                Ok(found) => {
                    for registry in found {
                        info!(registry = %registry, "Found registry");
                        registries.push(registry);
                    }
                }
                Err(err) => match err.kind() {
                    ErrorKind::Authentication => return Err(err),
                    ErrorKind::ServiceDisabled => {
                        info!(project = %project_id, "Artifact Registry API not enabled in project");
                        return Ok(ProjectScan::Skipped(
                            "Artifact Registry API not enabled".to_string(),
                        ));
                    }
                    ErrorKind::PermissionDenied => {
                        info!(project = %project_id, %location, "No access to Artifact Registry in project");
                        return Ok(ProjectScan::Skipped(
                            "no access to Artifact Registry".to_string(),
                        ));
                    }
                    _ => {
                        warn!(project = %project_id, %location, %err, "Failed to list repositories");
                    }
                },
            }
        }
        Ok(ProjectScan::Found(registries))
    }
}
