use std::collections::HashSet;

use tracing::{error, info, warn};

use super::{Orchestrator, Outcome, RegisterSummary, StepResult};
use crate::model::{Registry, ServiceAccount};
use crate::provider::{ApiError, ErrorKind};

impl Orchestrator {
    /// Discover every docker repository and register the ones Falcon does not
    /// know about yet.
    ///
    /// Only authentication failures and failures of shared steps (listing
    /// projects, listing registrations, the service account and its key) end
    /// the run. Everything else is recorded in the summary.
    pub async fn register(&self) -> Result<RegisterSummary, ApiError> {
        let discovery = self.discover().await?;
        let mut summary = RegisterSummary {
            projects: discovery.projects,
            ..RegisterSummary::default()
        };

        if discovery.registries.is_empty() {
            info!("No registries found");
            return Ok(summary);
        }
        info!(count = discovery.registries.len(), "Discovered registries");

        let registered: HashSet<String> = self
            .registrations
            .list_registrations()
            .await?
            .iter()
            .map(|registration| registration.identity())
            .collect();

        let account = self.accounts.ensure_account().await?;
        info!(email = %account.email, created = account.created, "Using service account");

        let denied = self
            .grant_all(&discovery.registries, &account, &mut summary)
            .await?;

        let mut pending = Vec::new();
        for registry in discovery.registries {
            let url = registry.url();
            if registered.contains(&url) {
                info!(registry = %url, "Registry already registered, skipping");
                summary.registrations.push(StepResult::new(
                    url,
                    Outcome::Skipped("already registered".to_string()),
                ));
            } else if denied.contains(&registry.project_id) {
                summary.registrations.push(StepResult::new(
                    url,
                    Outcome::Skipped(format!(
                        "IAM grant failed for project {}",
                        registry.project_id
                    )),
                ));
            } else {
                pending.push(registry);
            }
        }

        if pending.is_empty() {
            info!("Nothing new to register");
            return Ok(summary);
        }

        let key = self.accounts.create_key(&account).await?;
        for registry in pending {
            let url = registry.url();
            info!(registry = %url, "Registering");
            let outcome = match self.registrations.register(&registry, &key).await {
                Ok(record) => {
                    info!(registry = %url, id = %record.id, "Registered");
                    Outcome::Succeeded
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                    info!(registry = %url, "Registry already registered, skipping");
                    Outcome::Skipped("already registered".to_string())
                }
                Err(err) => {
                    error!(registry = %url, %err, "Failed to register");
                    Outcome::Failed(err.to_string())
                }
            };
            summary.registrations.push(StepResult::new(url, outcome));
        }

        Ok(summary)
    }

    /// Grant the required roles once per project that has registries.
    ///
    /// Returns the projects whose grant failed.
    async fn grant_all(
        &self,
        registries: &[Registry],
        account: &ServiceAccount,
        summary: &mut RegisterSummary,
    ) -> Result<HashSet<String>, ApiError> {
        let mut seen = HashSet::new();
        let mut denied = HashSet::new();

        for registry in registries {
            let project_id = &registry.project_id;
            if !seen.insert(project_id.clone()) {
                continue;
            }

            let outcome = match self.accounts.grant(project_id, account).await {
                Ok(added) if added.is_empty() => {
                    info!(project = %project_id, "IAM permissions already in place");
                    Outcome::Succeeded
                }
                Ok(added) => {
                    info!(project = %project_id, roles = ?added, "Granted IAM permissions");
                    Outcome::Succeeded
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!(project = %project_id, %err, "Failed to grant IAM permissions");
                    denied.insert(project_id.clone());
                    Outcome::Failed(err.to_string())
                }
            };
            summary
                .grants
                .push(StepResult::new(project_id.clone(), outcome));
        }

        Ok(denied)
    }
}
