use std::time::Duration;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use tracing::debug;

use super::auth::{AccessToken, FalconCredentials, TokenResponse};
use super::model::{CreateRegistryRequest, Envelope, RegistryEntity, error_message};
use crate::model::{Registration, Registry, ServiceAccountKey};
use crate::provider::{ApiError, RegistrationApi};

const USER_AGENT: &str = concat!("gar-registrar/", env!("CARGO_PKG_VERSION"));
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const TOKEN_PATH: &str = "/oauth2/token";
const QUERY_PATH: &str = "/container-security/queries/registries/v1";
const ENTITIES_PATH: &str = "/container-security/entities/registries/v1";

/// Ids per list page and per details request.
const PAGE_SIZE: usize = 100;

/// Falcon registry API client.
///
/// A bearer token is fetched on first use and reused until shortly before it
/// expires.
#[derive(Debug)]
pub struct FalconClient {
    http: reqwest::Client,
    base_url: String,
    credentials: FalconCredentials,
    token: Mutex<Option<AccessToken>>,
}

impl FalconClient {
    pub fn new(base_url: impl Into<String>, credentials: FalconCredentials) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            token: Mutex::new(None),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    async fn token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref().filter(|token| token.is_fresh()) {
            return Ok(token.value().to_string());
        }

        debug!(client_id = %self.credentials.client_id(), "Requesting Falcon access token");
        let response = self
            .http
            .post(self.url(TOKEN_PATH))
            .form(&self.credentials.form())
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::FalconAuthentication {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let token = AccessToken::new(response.json::<TokenResponse>().await?);
        let value = token.value().to_string();
        *cached = Some(token);
        Ok(value)
    }

    /// Send an authenticated request and turn non-2xx responses into errors.
    async fn send(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let token = self.token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        if status == StatusCode::UNAUTHORIZED {
            *self.token.lock().await = None;
        }
        let body = response.text().await.unwrap_or_default();
        Err(ApiError::Falcon {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<Envelope<T>, ApiError> {
        Ok(self.send(request).await?.json().await?)
    }

    async fn list_ids(&self) -> Result<Vec<String>, ApiError> {
        let mut ids = Vec::new();
        loop {
            let request = self
                .http
                .get(self.url(QUERY_PATH))
                .query(&[("limit", PAGE_SIZE), ("offset", ids.len())]);
            let envelope: Envelope<String> = self.send_json(request).await?;

            let total = envelope.total();
            let page = envelope.into_resources();
            let page_len = page.len();
            ids.extend(page);

            let done = match total {
                Some(total) => ids.len() as u64 >= total,
                None => page_len < PAGE_SIZE,
            };
            if done || page_len == 0 {
                break;
            }
        }
        Ok(ids)
    }

    async fn details(&self, ids: &[String]) -> Result<Vec<Registration>, ApiError> {
        let query: Vec<(&str, &str)> = ids.iter().map(|id| ("ids", id.as_str())).collect();
        let request = self.http.get(self.url(ENTITIES_PATH)).query(&query);
        let envelope: Envelope<RegistryEntity> = self.send_json(request).await?;
        Ok(envelope
            .into_resources()
            .into_iter()
            .map(Registration::from)
            .collect())
    }
}

#[async_trait]
impl RegistrationApi for FalconClient {
    async fn list_registrations(&self) -> Result<Vec<Registration>, ApiError> {
        let ids = self.list_ids().await?;
        debug!(count = ids.len(), "Listed Falcon registry ids");

        let mut registrations = Vec::with_capacity(ids.len());
        for batch in ids.chunks(PAGE_SIZE) {
            registrations.extend(self.details(batch).await?);
        }
        Ok(registrations)
    }

    async fn register(
        &self,
        registry: &Registry,
        key: &ServiceAccountKey,
    ) -> Result<Registration, ApiError> {
        let body = CreateRegistryRequest::new(registry, key);
        let request = self.http.post(self.url(ENTITIES_PATH)).json(&body);
        let envelope: Envelope<RegistryEntity> = self.send_json(request).await?;

        let registration = envelope
            .into_resources()
            .into_iter()
            .next()
            .map_or_else(
                || Registration {
                    id: String::new(),
                    registry_type: body.registry_type.to_string(),
                    url: body.url.clone(),
                    url_uniqueness_key: Some(body.url_uniqueness_key.clone()),
                    alias: Some(body.user_defined_alias.clone()),
                },
                Registration::from,
            );
        Ok(registration)
    }

    async fn deregister(&self, record_id: &str) -> Result<(), ApiError> {
        let request = self
            .http
            .delete(self.url(ENTITIES_PATH))
            .query(&[("ids", record_id)]);
        self.send(request).await?;
        Ok(())
    }
}
