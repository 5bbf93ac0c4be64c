//! Register and deprovision flows.
//!
//! Both flows are single linear passes with no rollback. Errors are caught at
//! the smallest enclosing unit (a project or a registry) and recorded as an
//! [`Outcome`]; only fatal errors end the run early. Re-running a flow after a
//! partial failure converges on the same end state.

mod deprovision;
mod discovery;
mod outcome;
mod register;

#[cfg(test)]
mod fakes;

use std::sync::Arc;

pub use outcome::{AccountCleanup, DeprovisionSummary, Outcome, RegisterSummary, StepResult};

use crate::provider::{AccountProvisioner, ProjectSource, RegistrationApi, RegistrySource};

pub struct Orchestrator {
    projects: Arc<dyn ProjectSource>,
    registries: Arc<dyn RegistrySource>,
    accounts: Arc<dyn AccountProvisioner>,
    registrations: Arc<dyn RegistrationApi>,
    locations: Vec<String>,
}

impl Orchestrator {
    pub fn new(
        projects: Arc<dyn ProjectSource>,
        registries: Arc<dyn RegistrySource>,
        accounts: Arc<dyn AccountProvisioner>,
        registrations: Arc<dyn RegistrationApi>,
        locations: Vec<String>,
    ) -> Self {
        Self {
            projects,
            registries,
            accounts,
            registrations,
            locations,
        }
    }
}
