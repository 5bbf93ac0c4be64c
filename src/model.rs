//! Domain models shared by the GCP and Falcon sides.
//!
//! - [`Registry`] - One Artifact Registry docker repository
//! - [`ServiceAccount`] / [`ServiceAccountKey`] - The scanner identity and its key
//! - [`Registration`] - A Falcon image registry integration record

use std::fmt;

use serde::{Deserialize, Serialize};

/// Falcon registry type for Google Artifact Registry.
pub const GAR_TYPE: &str = "gar";

const GAR_HOST_SUFFIX: &str = "-docker.pkg.dev";

/// An Artifact Registry docker repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Registry {
    pub project_id: String,
    pub location: String,
    pub repository_id: String,
}

impl Registry {
    pub fn new(
        project_id: impl Into<String>,
        location: impl Into<String>,
        repository_id: impl Into<String>,
    ) -> Self {
        Self {
            project_id: project_id.into(),
            location: location.into(),
            repository_id: repository_id.into(),
        }
    }

    /// Docker host serving this repository, e.g. `us-docker.pkg.dev`.
    pub fn host(&self) -> String {
        format!("{}{GAR_HOST_SUFFIX}", self.location)
    }

    /// `<location>-docker.pkg.dev/<project>/<repository>`
    pub fn url(&self) -> String {
        format!("{}/{}", self.host(), self.uniqueness_key())
    }

    /// Key that tells repositories on the same host apart in Falcon.
    pub fn uniqueness_key(&self) -> String {
        format!("{}/{}", self.project_id, self.repository_id)
    }

    pub fn alias(&self) -> String {
        format!("GAR-{}-{}", self.project_id, self.repository_id)
    }
}

impl fmt::Display for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// The scanner service account in the host project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAccount {
    pub email: String,
    /// Whether this run created the account.
    pub created: bool,
}

impl ServiceAccount {
    pub fn email_for(account_id: &str, project_id: &str) -> String {
        format!("{account_id}@{project_id}.iam.gserviceaccount.com")
    }

    /// IAM policy member string for this account.
    pub fn member(&self) -> String {
        format!("serviceAccount:{}", self.email)
    }
}

/// A service account JSON key, as handed to Falcon.
///
/// Only the fields Falcon needs are kept. The private key never shows up in
/// `Debug` output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub key_type: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub project_id: String,
}

impl ServiceAccountKey {
    /// Parse a key file as produced by `CreateServiceAccountKey`.
    pub fn from_json(data: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(data)
    }
}

impl fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("key_type", &self.key_type)
            .field("private_key_id", &self.private_key_id)
            .field("private_key", &"<redacted>")
            .field("client_email", &self.client_email)
            .field("client_id", &self.client_id)
            .field("project_id", &self.project_id)
            .finish()
    }
}

/// A registry integration record in Falcon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub id: String,
    pub registry_type: String,
    pub url: String,
    pub url_uniqueness_key: Option<String>,
    pub alias: Option<String>,
}

impl Registration {
    /// The registry URL this record stands for, normalized for comparison
    /// with [`Registry::url`].
    ///
    /// Falcon stores GAR records as a host URL plus a `project/repository`
    /// uniqueness key; records without a key are identified by their URL.
    pub fn identity(&self) -> String {
        let url = normalize_url(&self.url);
        match self
            .url_uniqueness_key
            .as_deref()
            .map(|key| key.trim_matches('/'))
            .filter(|key| !key.is_empty())
        {
            Some(key) => {
                let host = url.split('/').next().unwrap_or_default();
                format!("{host}/{}", key.to_lowercase())
            }
            None => url,
        }
    }

    /// Whether this record is a Google Artifact Registry integration.
    pub fn is_gar(&self) -> bool {
        let url = normalize_url(&self.url);
        let host = url.split('/').next().unwrap_or_default();
        self.registry_type.eq_ignore_ascii_case(GAR_TYPE)
            && host.len() > GAR_HOST_SUFFIX.len()
            && host.ends_with(GAR_HOST_SUFFIX)
    }

    /// Human-readable label for progress output.
    pub fn label(&self) -> String {
        let alias = self.alias.as_deref().unwrap_or("Unknown");
        format!("{alias} ({})", self.url)
    }
}

/// Normalize a registry URL for identity comparison: no scheme, no trailing
/// slashes, lowercase.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim().to_lowercase();
    let stripped = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .unwrap_or(&url);
    stripped.trim_end_matches('/').to_string()
}
