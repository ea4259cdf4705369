use crate::config::toml_config::Endpoints;
use crate::core::packager::decode_project_json;
use crate::core::ProjectFetcher;
use crate::domain::model::{FetchedProject, ProjectId, ProjectMetadata};
use crate::utils::backoff::Backoff;
use crate::utils::error::{HarvestError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

pub fn build_http_client(timeout: Duration, user_agent: &str, proxy: Option<&str>) -> Result<Client> {
    let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
    if let Some(proxy) = proxy {
        builder = builder.proxy(reqwest::Proxy::all(proxy)?);
    }
    Ok(builder.build()?)
}

pub struct ScratchClient {
    client: Client,
    endpoints: Endpoints,
}

impl ScratchClient {
    pub fn new(client: Client, endpoints: Endpoints) -> Self {
        Self { client, endpoints }
    }

    fn metadata_url(&self, id: ProjectId) -> String {
        format!("{}/projects/{}", self.endpoints.api_base.trim_end_matches('/'), id)
    }

    fn token_url(&self, id: ProjectId, token: &str) -> String {
        format!(
            "{}/{}?token={}",
            self.endpoints.projects_base.trim_end_matches('/'),
            id,
            token
        )
    }

    fn fallback_url(&self, id: ProjectId) -> String {
        self.endpoints
            .fallback_template
            .replace("{id}", &id.to_string())
    }

    /// `Err(ProjectNotFound)` on 404; any other failure yields `Ok(None)` so the
    /// download can still go through the fallback URL.
    pub async fn project_metadata(&self, id: ProjectId) -> Result<Option<ProjectMetadata>> {
        let url = self.metadata_url(id);
        tracing::debug!("📡 Metadata request: {}", url);

        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("Metadata for {} unavailable: {}", id, e);
                return Ok(None);
            }
        };

        match response.status() {
            StatusCode::NOT_FOUND => Err(HarvestError::ProjectNotFound { id }),
            status if status.is_success() => match response.json::<ProjectMetadata>().await {
                Ok(meta) => Ok(Some(meta)),
                Err(e) => {
                    tracing::debug!("Metadata for {} is not parseable: {}", id, e);
                    Ok(None)
                }
            },
            status => {
                tracing::debug!("Metadata for {} answered {}", id, status);
                Ok(None)
            }
        }
    }

    async fn get_body(&self, url: &str) -> Result<Vec<u8>> {
        tracing::debug!("📡 Project request: {}", url);
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(HarvestError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ProjectFetcher for ScratchClient {
    async fn fetch(&self, id: ProjectId) -> Result<FetchedProject> {
        let metadata = self.project_metadata(id).await?;
        let token = metadata
            .as_ref()
            .and_then(|meta| meta.project_token.as_deref())
            .filter(|token| !token.is_empty());

        let body = match token {
            Some(token) => match self.get_body(&self.token_url(id, token)).await {
                Ok(body) => body,
                Err(HarvestError::HttpStatus { status, .. }) => {
                    tracing::debug!("Token download of {} answered {}, using fallback", id, status);
                    self.get_body(&self.fallback_url(id)).await?
                }
                Err(e) => return Err(e),
            },
            None => self.get_body(&self.fallback_url(id)).await?,
        };

        let json = decode_project_json(id, &body)?;
        Ok(FetchedProject { id, json, metadata })
    }
}

/// Runs `fetch` up to `attempts` times, sleeping between retryable failures.
pub async fn fetch_with_retry<F: ProjectFetcher + ?Sized>(
    fetcher: &F,
    id: ProjectId,
    attempts: u32,
    mut backoff: Backoff,
) -> Result<FetchedProject> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match fetcher.fetch(id).await {
            Ok(project) => return Ok(project),
            Err(e) if e.is_retryable() && attempt < attempts => {
                let delay = backoff.next_delay();
                tracing::debug!(
                    "[{}] attempt {}/{} failed: {} (retrying in {:?})",
                    id,
                    attempt,
                    attempts,
                    e,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
