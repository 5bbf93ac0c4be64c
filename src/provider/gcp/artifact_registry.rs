use async_trait::async_trait;
use google_cloud_artifactregistry_v1::client::ArtifactRegistry;
use google_cloud_artifactregistry_v1::model::repository::Format;
use google_cloud_auth::credentials::Credentials;
use google_cloud_gax::paginator::ItemPaginator;
use tracing::debug;

use crate::model::Registry;
use crate::provider::{ApiError, RegistrySource};

#[derive(Clone, Debug)]
pub struct RegistryDiscoverer {
    client: ArtifactRegistry,
}

impl RegistryDiscoverer {
    pub async fn new(credentials: Credentials) -> color_eyre::Result<Self> {
        let client = ArtifactRegistry::builder()
            .with_credentials(credentials)
            .build()
            .await?;
        Ok(Self { client })
    }
}

#[async_trait]
impl RegistrySource for RegistryDiscoverer {
    async fn list_registries(
        &self,
        project_id: &str,
        location: &str,
    ) -> Result<Vec<Registry>, ApiError> {
        let parent = format!("projects/{project_id}/locations/{location}");

        let mut items = self
            .client
            .list_repositories()
            .set_parent(parent)
            .by_item();

        let mut registries = Vec::new();
        while let Some(repository) = items.next().await.transpose()? {
            let Some(repository_id) = repository.name.rsplit('/').next() else {
                continue;
            };
            if !matches!(repository.format, Format::Docker) {
                debug!(repository = %repository.name, format = ?repository.format, "Skipping non-docker repository");
                continue;
            }
            registries.push(Registry::new(project_id, location, repository_id));
        }
        Ok(registries)
    }
}
