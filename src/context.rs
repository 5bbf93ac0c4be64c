use color_eyre::eyre::{Result, WrapErr};
use google_cloud_auth::credentials::Credentials;

/// GCP connection context for a run.
#[derive(Debug, Clone)]
pub struct GcpContext {
    /// Project that owns the scanner service account.
    pub host_project: String,
    pub auth: AuthMethod,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMethod {
    ApplicationDefault,
}

impl GcpContext {
    pub fn new(host_project: impl Into<String>) -> Self {
        Self {
            host_project: host_project.into(),
            auth: AuthMethod::ApplicationDefault,
        }
    }

    /// Build the credentials handed to every GCP client.
    pub fn create_credentials(&self) -> Result<Credentials> {
        match self.auth {
            AuthMethod::ApplicationDefault => google_cloud_auth::credentials::Builder::default()
                .build()
                .wrap_err("Failed to load Application Default Credentials"),
        }
    }
}
