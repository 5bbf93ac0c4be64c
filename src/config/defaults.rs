use crate::config::{FalconConfig, GcpConfig};

pub const SERVICE_ACCOUNT_NAME: &str = "crowdstrike-registry-scanner";

pub const FALCON_BASE_URL: &str = "https://api.crowdstrike.com";

const LOCATIONS: &[&str] = &[
    "us",
    "europe",
    "asia",
    "us-central1",
    "us-east1",
    "us-west1",
    "europe-west1",
    "asia-east1",
];

const ROLES: &[&str] = &["roles/artifactregistry.reader", "roles/storage.objectViewer"];

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            service_account_name: SERVICE_ACCOUNT_NAME.to_string(),
            locations: LOCATIONS.iter().map(ToString::to_string).collect(),
            roles: ROLES.iter().map(ToString::to_string).collect(),
        }
    }
}

impl Default for FalconConfig {
    fn default() -> Self {
        Self {
            base_url: FALCON_BASE_URL.to_string(),
        }
    }
}
