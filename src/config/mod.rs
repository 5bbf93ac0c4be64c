mod defaults;
pub mod loader;

pub use loader::load;
use serde::Deserialize;

use crate::provider::falcon::FalconCredentials;

pub const HOST_PROJECT_VAR: &str = "GCP_HOST_PROJECT";
pub const FALCON_CLIENT_ID_VAR: &str = "FALCON_CLIENT_ID";
pub const FALCON_CLIENT_SECRET_VAR: &str = "FALCON_CLIENT_SECRET";
pub const FALCON_BASE_URL_VAR: &str = "FALCON_BASE_URL";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GcpConfig {
    /// Account id of the scanner service account (the part before `@`).
    pub service_account_name: String,
    /// Artifact Registry locations searched in every project.
    pub locations: Vec<String>,
    /// Roles granted to the service account on each project with registries.
    pub roles: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FalconConfig {
    pub base_url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub gcp: GcpConfig,
    #[serde(default)]
    pub falcon: FalconConfig,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variables: {}", .0.join(", "))]
    MissingEnvironment(Vec<&'static str>),
}

/// Everything a run needs, after merging the config file with the environment.
#[derive(Debug, Clone)]
pub struct Settings {
    pub host_project: String,
    pub falcon_credentials: FalconCredentials,
    pub falcon_base_url: String,
    pub gcp: GcpConfig,
}

impl Settings {
    /// Resolve settings from the process environment.
    pub fn from_env(config: AppConfig) -> Result<Self, ConfigError> {
        Self::resolve(config, |name| std::env::var(name).ok())
    }

    /// Resolve settings using `lookup` to read variables.
    ///
    /// Empty values count as missing. Every missing variable is reported at once.
    pub fn resolve(
        config: AppConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut missing = Vec::new();
        let mut require = |name: &'static str| {
            let value = read(name);
            if value.is_none() {
                missing.push(name);
            }
            value
        };

        let host_project = require(HOST_PROJECT_VAR);
        let client_id = require(FALCON_CLIENT_ID_VAR);
        let client_secret = require(FALCON_CLIENT_SECRET_VAR);

        let (Some(host_project), Some(client_id), Some(client_secret)) =
            (host_project, client_id, client_secret)
        else {
            return Err(ConfigError::MissingEnvironment(missing));
        };

        let falcon_base_url = read(FALCON_BASE_URL_VAR).unwrap_or(config.falcon.base_url);

        Ok(Self {
            host_project,
            falcon_credentials: FalconCredentials::new(client_id, client_secret),
            falcon_base_url: falcon_base_url.trim_end_matches('/').to_string(),
            gcp: config.gcp,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_resolve_complete_environment() {
        let settings = Settings::resolve(
            AppConfig::default(),
            env(&[
                ("GCP_HOST_PROJECT", "host"),
                ("FALCON_CLIENT_ID", "id"),
                ("FALCON_CLIENT_SECRET", "secret"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.host_project, "host");
        assert_eq!(settings.falcon_credentials.client_id(), "id");
        assert_eq!(settings.falcon_base_url, "https://api.crowdstrike.com");
        assert_eq!(settings.gcp, GcpConfig::default());
    }

    #[test]
    fn test_resolve_reports_every_missing_variable() {
        let err = Settings::resolve(
            AppConfig::default(),
            env(&[("FALCON_CLIENT_ID", "id"), ("FALCON_CLIENT_SECRET", "  ")]),
        )
        .unwrap_err();

        assert_eq!(
            err,
            ConfigError::MissingEnvironment(vec!["GCP_HOST_PROJECT", "FALCON_CLIENT_SECRET"])
        );
        assert_eq!(
            err.to_string(),
            "Missing required environment variables: GCP_HOST_PROJECT, FALCON_CLIENT_SECRET"
        );
    }

    #[test]
    fn test_base_url_from_environment_wins() {
        let mut config = AppConfig::default();
        config.falcon.base_url = "https://api.us-2.crowdstrike.com".to_string();

        let settings = Settings::resolve(
            config,
            env(&[
                ("GCP_HOST_PROJECT", "host"),
                ("FALCON_CLIENT_ID", "id"),
                ("FALCON_CLIENT_SECRET", "secret"),
                ("FALCON_BASE_URL", "https://api.eu-1.crowdstrike.com/"),
            ]),
        )
        .unwrap();

        assert_eq!(settings.falcon_base_url, "https://api.eu-1.crowdstrike.com");
    }

    #[test]
    fn test_secret_is_not_debug_printed() {
        let settings = Settings::resolve(
            AppConfig::default(),
            env(&[
                ("GCP_HOST_PROJECT", "host"),
                ("FALCON_CLIENT_ID", "id"),
                ("FALCON_CLIENT_SECRET", "hunter2"),
            ]),
        )
        .unwrap();

        assert!(!format!("{settings:?}").contains("hunter2"));
    }
}
