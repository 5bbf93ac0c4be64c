//! In-memory collaborators for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use google_cloud_gax::error::rpc::Code;

use super::Orchestrator;
use crate::model::{Registration, Registry, ServiceAccount, ServiceAccountKey};
use crate::provider::error::tests::gcp_error;
use crate::provider::{AccountProvisioner, ApiError, ProjectSource, RegistrationApi, RegistrySource};

const LOCATIONS: [&str; 2] = ["us", "europe"];

type Failure = (Code, &'static str);

pub fn orchestrator(
    gcp: &Arc<FakeGcp>,
    accounts: &Arc<FakeAccounts>,
    falcon: &Arc<FakeFalcon>,
) -> Orchestrator {
    Orchestrator::new(
        gcp.clone(),
        gcp.clone(),
        accounts.clone(),
        falcon.clone(),
        LOCATIONS.iter().map(ToString::to_string).collect(),
    )
}

#[derive(Default)]
pub struct FakeGcp {
    projects: Vec<String>,
    registries: HashMap<(String, String), Vec<String>>,
    failures: HashMap<String, Failure>,
    location_failures: HashMap<(String, String), Failure>,
    calls: Mutex<HashMap<String, usize>>,
}

impl FakeGcp {
    pub fn with_project(mut self, project_id: &str) -> Self {
        self.projects.push(project_id.to_string());
        self
    }

    pub fn with_registries(mut self, project_id: &str, location: &str, repos: &[&str]) -> Self {
        self.registries
            .entry((project_id.to_string(), location.to_string()))
            .or_default()
            .extend(repos.iter().map(ToString::to_string));
        self
    }

    /// Every registry listing in `project_id` fails with the given status.
    pub fn with_failure(mut self, project_id: &str, code: Code, message: &'static str) -> Self {
        self.failures
            .insert(project_id.to_string(), (code, message));
        self
    }

    /// Only the listing of `location` in `project_id` fails.
    pub fn with_location_failure(
        mut self,
        project_id: &str,
        location: &str,
        code: Code,
        message: &'static str,
    ) -> Self {
        self.location_failures
            .insert((project_id.to_string(), location.to_string()), (code, message));
        self
    }

    pub fn calls_for(&self, project_id: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .get(project_id)
            .copied()
            .unwrap_or_default()
    }
}

#[async_trait]
impl ProjectSource for FakeGcp {
    async fn list_projects(&self) -> Result<Vec<String>, ApiError> {
        Ok(self.projects.clone())
    }
}

#[async_trait]
impl RegistrySource for FakeGcp {
    async fn list_registries(
        &self,
        project_id: &str,
        location: &str,
    ) -> Result<Vec<Registry>, ApiError> {
        *self
            .calls
            .lock()
            .unwrap()
            .entry(project_id.to_string())
            .or_default() += 1;

        let key = (project_id.to_string(), location.to_string());
        if let Some((code, message)) = self
            .failures
            .get(project_id)
            .or_else(|| self.location_failures.get(&key))
        {
            return Err(gcp_error(*code, message));
        }

        Ok(self
            .registries
            .get(&key)
            .into_iter()
            .flatten()
            .map(|repo| Registry::new(project_id, location, repo))
            .collect())
    }
}

pub struct FakeAccounts {
    exists: Mutex<bool>,
    ensured: Mutex<bool>,
    deleted: Mutex<bool>,
    granted: Mutex<Vec<String>>,
    keys_created: Mutex<usize>,
    grant_failures: HashMap<String, Failure>,
    delete_failure: Option<Failure>,
}

impl Default for FakeAccounts {
    fn default() -> Self {
        Self {
            exists: Mutex::new(true),
            ensured: Mutex::new(false),
            deleted: Mutex::new(false),
            granted: Mutex::new(Vec::new()),
            keys_created: Mutex::new(0),
            grant_failures: HashMap::new(),
            delete_failure: None,
        }
    }
}

impl FakeAccounts {
    pub fn without_account(self) -> Self {
        *self.exists.lock().unwrap() = false;
        self
    }

    pub fn with_grant_failure(mut self, project_id: &str, code: Code, message: &'static str) -> Self {
        self.grant_failures
            .insert(project_id.to_string(), (code, message));
        self
    }

    pub fn with_delete_failure(mut self, code: Code, message: &'static str) -> Self {
        self.delete_failure = Some((code, message));
        self
    }

    pub fn ensured(&self) -> bool {
        *self.ensured.lock().unwrap()
    }

    pub fn granted(&self) -> Vec<String> {
        self.granted.lock().unwrap().clone()
    }

    pub fn keys_created(&self) -> usize {
        *self.keys_created.lock().unwrap()
    }

    pub fn deleted(&self) -> bool {
        *self.deleted.lock().unwrap()
    }
}

fn account() -> ServiceAccount {
    ServiceAccount {
        email: ServiceAccount::email_for("scanner", "host"),
        created: false,
    }
}

#[async_trait]
impl AccountProvisioner for FakeAccounts {
    async fn ensure_account(&self) -> Result<ServiceAccount, ApiError> {
        let mut exists = self.exists.lock().unwrap();
        let created = !*exists;
        *exists = true;
        *self.ensured.lock().unwrap() = true;
        Ok(ServiceAccount {
            created,
            ..account()
        })
    }

    async fn create_key(&self, account: &ServiceAccount) -> Result<ServiceAccountKey, ApiError> {
        let mut count = self.keys_created.lock().unwrap();
        *count += 1;
        Ok(ServiceAccountKey {
            key_type: "service_account".to_string(),
            private_key_id: format!("key-{count}"),
            private_key: "secret".to_string(),
            client_email: account.email.clone(),
            client_id: "1234".to_string(),
            project_id: "host".to_string(),
        })
    }

    async fn grant(
        &self,
        project_id: &str,
        _account: &ServiceAccount,
    ) -> Result<Vec<String>, ApiError> {
        if let Some((code, message)) = self.grant_failures.get(project_id) {
            return Err(gcp_error(*code, message));
        }
        let mut granted = self.granted.lock().unwrap();
        if granted.iter().any(|p| p == project_id) {
            return Ok(Vec::new());
        }
        granted.push(project_id.to_string());
        Ok(vec!["roles/artifactregistry.reader".to_string()])
    }

    async fn delete_account(&self) -> Result<bool, ApiError> {
        if let Some((code, message)) = &self.delete_failure {
            return Err(gcp_error(*code, message));
        }
        let mut exists = self.exists.lock().unwrap();
        let existed = *exists;
        *exists = false;
        *self.deleted.lock().unwrap() |= existed;
        Ok(existed)
    }
}

#[derive(Default)]
pub struct FakeFalcon {
    records: Mutex<Vec<Registration>>,
    next_id: Mutex<usize>,
    rejected: HashSet<String>,
    failing_removals: HashSet<String>,
    failing_listing: bool,
    rejected_credentials: bool,
}

impl FakeFalcon {
    pub fn with_record(self, record: Registration) -> Self {
        self.records.lock().unwrap().push(record);
        self
    }

    /// Registering the registry at `url` fails with HTTP 400.
    pub fn with_rejected(mut self, url: &str) -> Self {
        self.rejected.insert(url.to_string());
        self
    }

    pub fn with_failing_removal(mut self, id: &str) -> Self {
        self.failing_removals.insert(id.to_string());
        self
    }

    /// Listing registrations fails with HTTP 500.
    pub fn with_failing_listing(mut self) -> Self {
        self.failing_listing = true;
        self
    }

    pub fn with_rejected_credentials(mut self) -> Self {
        self.rejected_credentials = true;
        self
    }

    pub fn records(&self) -> Vec<Registration> {
        self.records.lock().unwrap().clone()
    }

    fn check_credentials(&self) -> Result<(), ApiError> {
        if self.rejected_credentials {
            return Err(ApiError::FalconAuthentication {
                status: 401,
                message: "access denied, authorization failed".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl RegistrationApi for FakeFalcon {
    async fn list_registrations(&self) -> Result<Vec<Registration>, ApiError> {
        self.check_credentials()?;
        if self.failing_listing {
            return Err(ApiError::Falcon {
                status: 500,
                message: "500: internal error".to_string(),
            });
        }
        Ok(self.records())
    }

    async fn register(
        &self,
        registry: &Registry,
        _key: &ServiceAccountKey,
    ) -> Result<Registration, ApiError> {
        self.check_credentials()?;
        if self.rejected.contains(&registry.url()) {
            return Err(ApiError::Falcon {
                status: 400,
                message: "400: invalid registry credentials".to_string(),
            });
        }

        let mut next_id = self.next_id.lock().unwrap();
        *next_id += 1;
        let record = Registration {
            id: format!("reg-{next_id}"),
            registry_type: "gar".to_string(),
            url: format!("https://{}/", registry.host()),
            url_uniqueness_key: Some(registry.uniqueness_key()),
            alias: Some(registry.alias()),
        };
        self.records.lock().unwrap().push(record.clone());
        Ok(record)
    }

    async fn deregister(&self, record_id: &str) -> Result<(), ApiError> {
        self.check_credentials()?;
        if self.failing_removals.contains(record_id) {
            return Err(ApiError::Falcon {
                status: 500,
                message: "500: internal error".to_string(),
            });
        }
        self.records.lock().unwrap().retain(|r| r.id != record_id);
        Ok(())
    }
}
