//! Falcon API request and response bodies.

use serde::{Deserialize, Serialize};

use crate::model::{GAR_TYPE, Registration, Registry, ServiceAccountKey};

/// Body of `POST /container-security/entities/registries/v1` for a GAR repository.
#[derive(Debug, Serialize)]
pub struct CreateRegistryRequest<'a> {
    #[serde(rename = "type")]
    pub registry_type: &'static str,
    pub url: String,
    pub url_uniqueness_key: String,
    pub user_defined_alias: String,
    pub credential: Credential<'a>,
}

#[derive(Debug, Serialize)]
pub struct Credential<'a> {
    pub details: CredentialDetails<'a>,
}

#[derive(Debug, Serialize)]
pub struct CredentialDetails<'a> {
    pub project_id: &'a str,
    pub scope_name: &'a str,
    pub service_account_json: &'a ServiceAccountKey,
}

impl<'a> CreateRegistryRequest<'a> {
    pub fn new(registry: &'a Registry, key: &'a ServiceAccountKey) -> Self {
        Self {
            registry_type: GAR_TYPE,
            url: format!("https://{}/", registry.host()),
            url_uniqueness_key: registry.uniqueness_key(),
            user_defined_alias: registry.alias(),
            credential: Credential {
                details: CredentialDetails {
                    project_id: &registry.project_id,
                    scope_name: &registry.repository_id,
                    service_account_json: key,
                },
            },
        }
    }
}

/// Common envelope of every Falcon response.
#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    pub resources: Option<Vec<T>>,
    pub errors: Option<Vec<ApiErrorEntry>>,
    pub meta: Option<Meta>,
}

impl<T> Envelope<T> {
    pub fn into_resources(self) -> Vec<T> {
        self.resources.unwrap_or_default()
    }

    pub fn total(&self) -> Option<u64> {
        self.meta
            .as_ref()
            .and_then(|meta| meta.pagination.as_ref())
            .map(|pagination| pagination.total)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorEntry {
    pub code: Option<i64>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct Meta {
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total: u64,
}

/// Error messages of a failed response body, joined for display.
pub fn error_message(body: &str) -> String {
    let messages: Vec<String> = serde_json::from_str::<Envelope<serde_json::Value>>(body)
        .ok()
        .and_then(|envelope| envelope.errors)
        .unwrap_or_default()
        .into_iter()
        .map(|entry| match entry.code {
            Some(code) => format!("{code}: {}", entry.message),
            None => entry.message,
        })
        .collect();

    if messages.is_empty() {
        body.trim().to_string()
    } else {
        messages.join("; ")
    }
}

#[derive(Debug, Deserialize)]
pub struct RegistryEntity {
    pub id: String,
    #[serde(rename = "type", default)]
    pub registry_type: String,
    #[serde(default)]
    pub url: String,
    pub url_uniqueness_key: Option<String>,
    pub user_defined_alias: Option<String>,
}

impl From<RegistryEntity> for Registration {
    fn from(entity: RegistryEntity) -> Self {
        Self {
            id: entity.id,
            registry_type: entity.registry_type,
            url: entity.url,
            url_uniqueness_key: entity.url_uniqueness_key,
            alias: entity.user_defined_alias,
        }
    }
}
