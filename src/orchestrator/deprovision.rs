use tracing::{error, info, warn};

use super::{AccountCleanup, DeprovisionSummary, Orchestrator, Outcome, StepResult};
use crate::model::Registration;
use crate::provider::ApiError;

impl Orchestrator {
    /// Remove GAR registrations from Falcon, then delete the scanner service
    /// account.
    ///
    /// `confirm` sees the registrations about to be removed and is only asked
    /// when there are any. Declining skips the removals. The account is
    /// deleted either way, as it is when the registrations cannot be listed.
    ///
    /// IAM bindings in scanned projects are left in place; they dangle once
    /// the account is gone.
    pub async fn deprovision(
        &self,
        confirm: impl FnOnce(&[Registration]) -> bool,
    ) -> Result<DeprovisionSummary, ApiError> {
        let mut listing_error = None;
        let registrations = match self.find_gar_registrations().await {
            Ok(registrations) => registrations,
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                error!(%err, "Failed to list Falcon registrations");
                listing_error = Some(err.to_string());
                Vec::new()
            }
        };

        let declined = !registrations.is_empty() && !confirm(&registrations);
        let removals = if declined {
            info!("Aborted registry removal");
            Vec::new()
        } else {
            self.remove_all(&registrations).await?
        };

        info!("Deleting service account");
        let account = match self.accounts.delete_account().await {
            Ok(true) => AccountCleanup::Deleted,
            Ok(false) => {
                info!("Service account does not exist");
                AccountCleanup::Absent
            }
            Err(err) if err.is_fatal() => return Err(err),
            Err(err) => {
                warn!(%err, "Failed to delete service account");
                AccountCleanup::Failed(err.to_string())
            }
        };

        Ok(DeprovisionSummary {
            listing_error,
            declined,
            removals,
            account,
        })
    }

    /// Falcon registrations that point at Google Artifact Registry.
    async fn find_gar_registrations(&self) -> Result<Vec<Registration>, ApiError> {
        let registrations = self.registrations.list_registrations().await?;
        let total = registrations.len();
        let gar: Vec<_> = registrations
            .into_iter()
            .filter(Registration::is_gar)
            .collect();
        info!(total, gar = gar.len(), "Listed Falcon registrations");
        Ok(gar)
    }

    async fn remove_all(&self, registrations: &[Registration]) -> Result<Vec<StepResult>, ApiError> {
        let mut removals = Vec::with_capacity(registrations.len());
        for registration in registrations {
            let label = registration.label();
            info!(registration = %label, "Removing registration");
            let outcome = match self.registrations.deregister(&registration.id).await {
                Ok(()) => Outcome::Succeeded,
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    error!(registration = %label, %err, "Failed to remove registration");
                    Outcome::Failed(err.to_string())
                }
            };
            removals.push(StepResult::new(label, outcome));
        }
        Ok(removals)
    }
}
