//! Scanner service account lifecycle and project IAM bindings.

use async_trait::async_trait;
use google_cloud_auth::credentials::Credentials;
use google_cloud_iam_admin_v1::client::Iam;
use google_cloud_iam_admin_v1::model;
use google_cloud_iam_v1::model::{Binding, GetPolicyOptions, Policy};
use google_cloud_resourcemanager_v3::client::Projects;
use tracing::{debug, info};

use crate::model::{ServiceAccount, ServiceAccountKey};
use crate::provider::{AccountProvisioner, ApiError, ErrorKind};

const DISPLAY_NAME: &str = "CrowdStrike Registry Scanner";
const DESCRIPTION: &str = "Service account for CrowdStrike container registry scanning";

/// Policy version that keeps conditional bindings intact on write.
const POLICY_VERSION: i32 = 3;

#[derive(Clone, Debug)]
pub struct ServiceAccountProvisioner {
    iam: Iam,
    projects: Projects,
    host_project: String,
    account_id: String,
    roles: Vec<String>,
}

impl ServiceAccountProvisioner {
    pub async fn new(
        credentials: Credentials,
        host_project: impl Into<String>,
        account_id: impl Into<String>,
        roles: Vec<String>,
    ) -> color_eyre::Result<Self> {
        let iam = Iam::builder()
            .with_credentials(credentials.clone())
            .build()
            .await?;
        let projects = Projects::builder()
            .with_credentials(credentials)
            .build()
            .await?;

        Ok(Self {
            iam,
            projects,
            host_project: host_project.into(),
            account_id: account_id.into(),
            roles,
        })
    }

    fn email(&self) -> String {
        ServiceAccount::email_for(&self.account_id, &self.host_project)
    }

    fn resource_name(&self) -> String {
        format!(
            "projects/{}/serviceAccounts/{}",
            self.host_project,
            self.email()
        )
    }

    async fn find_or_create(&self) -> Result<ServiceAccount, ApiError> {
        match self
            .iam
            .get_service_account()
            .set_name(self.resource_name())
            .send()
            .await
        {
            Ok(existing) => {
                info!(email = %existing.email, "Found existing service account");
                return Ok(ServiceAccount {
                    email: existing.email,
                    created: false,
                });
            }
            Err(err) => {
                let err = ApiError::from(err);
                if err.kind() != ErrorKind::NotFound {
                    return Err(err);
                }
            }
        }

        info!(email = %self.email(), "Creating new service account");
        let account = model::ServiceAccount::new()
            .set_display_name(DISPLAY_NAME)
            .set_description(DESCRIPTION);

        match self
            .iam
            .create_service_account()
            .set_name(format!("projects/{}", self.host_project))
            .set_account_id(&self.account_id)
            .set_service_account(account)
            .send()
            .await
        {
            Ok(created) => Ok(ServiceAccount {
                email: created.email,
                created: true,
            }),
            Err(err) => {
                let err = ApiError::from(err);
                if err.kind() == ErrorKind::AlreadyExists {
                    debug!("Service account appeared concurrently, reusing it");
                    return Ok(ServiceAccount {
                        email: self.email(),
                        created: false,
                    });
                }
                Err(err)
            }
        }
    }
}

#[async_trait]
impl AccountProvisioner for ServiceAccountProvisioner {
    async fn ensure_account(&self) -> Result<ServiceAccount, ApiError> {
        info!(project = %self.host_project, "Managing service account");
        self.find_or_create().await
    }

    async fn create_key(&self, account: &ServiceAccount) -> Result<ServiceAccountKey, ApiError> {
        let key = self
            .iam
            .create_service_account_key()
            .set_name(format!(
                "projects/{}/serviceAccounts/{}",
                self.host_project, account.email
            ))
            .send()
            .await?;
        let key = ServiceAccountKey::from_json(&key.private_key_data)?;
        info!(email = %account.email, key_id = %key.private_key_id, "Created service account key");
        Ok(key)
    }

    async fn grant(
        &self,
        project_id: &str,
        account: &ServiceAccount,
    ) -> Result<Vec<String>, ApiError> {
        let resource = format!("projects/{project_id}");

        let mut policy = self
            .projects
            .get_iam_policy()
            .set_resource(&resource)
            .set_options(GetPolicyOptions::new().set_requested_policy_version(POLICY_VERSION))
            .send()
            .await?;

        let added = bind_member(&mut policy, &account.member(), &self.roles);
        if added.is_empty() {
            debug!(project = %project_id, "All role bindings already present");
            return Ok(added);
        }

        self.projects
            .set_iam_policy()
            .set_resource(resource)
            .set_policy(policy)
            .send()
            .await?;

        Ok(added)
    }

    async fn delete_account(&self) -> Result<bool, ApiError> {
        match self
            .iam
            .delete_service_account()
            .set_name(self.resource_name())
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) => {
                let err = ApiError::from(err);
                if err.kind() == ErrorKind::NotFound {
                    Ok(false)
                } else {
                    Err(err)
                }
            }
        }
    }
}

/// Add `member` to an unconditional binding for each role.
///
/// Returns the roles whose bindings changed.
fn bind_member(policy: &mut Policy, member: &str, roles: &[String]) -> Vec<String> {
    let mut added = Vec::new();
    for role in roles {
        let binding = policy
            .bindings
            .iter_mut()
            .find(|binding| binding.role == *role && binding.condition.is_none());

        match binding {
            Some(binding) if binding.members.iter().any(|m| m == member) => continue,
            Some(binding) => binding.members.push(member.to_string()),
            None => policy
                .bindings
                .push(Binding::new().set_role(role).set_members([member])),
        }
        added.push(role.clone());
    }

    if !added.is_empty() && policy.version < POLICY_VERSION {
        policy.version = POLICY_VERSION;
    }
    added
}
