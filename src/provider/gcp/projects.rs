use async_trait::async_trait;
use google_cloud_auth::credentials::Credentials;
use google_cloud_gax::paginator::ItemPaginator;
use google_cloud_resourcemanager_v3::client::Projects;
use tracing::{debug, warn};

use crate::provider::{ApiError, ProjectSource};

/// Only projects in this state can host registries worth scanning.
const ACTIVE_PROJECTS: &str = "state:ACTIVE";

#[derive(Clone, Debug)]
pub struct ProjectEnumerator {
    client: Projects,
}

impl ProjectEnumerator {
    pub async fn new(credentials: Credentials) -> color_eyre::Result<Self> {
        let client = Projects::builder()
            .with_credentials(credentials)
            .build()
            .await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ProjectSource for ProjectEnumerator {
    async fn list_projects(&self) -> Result<Vec<String>, ApiError> {
        let mut items = self
            .client
            .search_projects()
            .set_query(ACTIVE_PROJECTS)
            .by_item();

        let mut projects = Vec::new();
        while let Some(item) = items.next().await {
            match item {
                Ok(project) => {
                    debug!(project = %project.project_id, "Found project");
                    projects.push(project.project_id);
                }
                Err(err) => {
                    let err = ApiError::from(err);
                    if err.is_fatal() {
                        return Err(err);
                    }
                    warn!(%err, collected = projects.len(), "Project listing failed, continuing with the projects found so far");
                    break;
                }
            }
        }
        Ok(projects)
    }
}
