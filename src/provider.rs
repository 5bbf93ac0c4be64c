//! External collaborators.
//!
//! The orchestrator only talks to GCP and Falcon through the traits below, so
//! every collaborator can be swapped for an in-memory fake in tests.

pub mod error;
pub mod falcon;
pub mod gcp;

use async_trait::async_trait;

pub use error::{ApiError, ErrorKind};

use crate::model::{Registration, Registry, ServiceAccount, ServiceAccountKey};

/// Lists the GCP projects visible to the caller.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    async fn list_projects(&self) -> Result<Vec<String>, ApiError>;
}

/// Lists the Artifact Registry docker repositories of one project location.
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn list_registries(
        &self,
        project_id: &str,
        location: &str,
    ) -> Result<Vec<Registry>, ApiError>;
}

/// Manages the scanner service account and its IAM bindings.
#[async_trait]
pub trait AccountProvisioner: Send + Sync {
    /// Create the account unless it already exists.
    async fn ensure_account(&self) -> Result<ServiceAccount, ApiError>;

    /// Generate a new JSON key for the account.
    async fn create_key(&self, account: &ServiceAccount) -> Result<ServiceAccountKey, ApiError>;

    /// Bind the account to the required roles on `project_id`.
    ///
    /// Returns the roles that were newly bound; empty when every binding was
    /// already in place.
    async fn grant(
        &self,
        project_id: &str,
        account: &ServiceAccount,
    ) -> Result<Vec<String>, ApiError>;

    /// Delete the account. Returns `false` if it did not exist.
    async fn delete_account(&self) -> Result<bool, ApiError>;
}

/// Falcon image registry integrations.
#[async_trait]
pub trait RegistrationApi: Send + Sync {
    async fn list_registrations(&self) -> Result<Vec<Registration>, ApiError>;

    async fn register(
        &self,
        registry: &Registry,
        key: &ServiceAccountKey,
    ) -> Result<Registration, ApiError>;

    async fn deregister(&self, record_id: &str) -> Result<(), ApiError>;
}
