//! GitHub Container Registry implementation.
use crate::config::AppSettings;
use crate::registry::client::{build_client, join_url, response_body};
use crate::registry::container_registry::{ContainerRegistry, RegistryError, Result};
use crate::registry::image_version::ImageVersion;
use chrono::{DateTime, Utc};
use log::{debug, error, warn};
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
use serde::Deserialize;
use serde_json::Value;

pub const GHCR_REGISTRY_NAME: &str = "GitHub Container Registry";

const GITHUB_API_ACCEPT: &str = "application/vnd.github.v3+json";

#[derive(Debug, Deserialize)]
struct ContainerMetadata {
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct PackageVersionMetadata {
    container: ContainerMetadata,
}

#[derive(Debug, Deserialize)]
struct PackageVersion {
    id: u64,
    name: String,
    created_at: DateTime<Utc>,
    metadata: PackageVersionMetadata,
}

/// Registry backed by the GitHub packages API.
///
/// The versions endpoint is requested once; further pages the provider may
/// offer are not followed, so very large packages are truncated to the first
/// page returned by the API.
pub struct GhcrRegistry {
    token: String,
    container_name: String,
    api_url: String,
    client: Client,
}

impl GhcrRegistry {
    /// Create a new GHCR registry client
    ///
    /// # Arguments
    /// * `token` - GitHub personal access token with package read/delete scopes
    /// * `container_name` - Name of the container package
    /// * `settings` - Application settings
    /// * `user_agent` - User agent sent with every request
    pub fn new(
        token: impl Into<String>,
        container_name: impl Into<String>,
        settings: &AppSettings,
        user_agent: &str,
    ) -> Result<Self> {
        let client = build_client(user_agent, &settings.http)?;

        Ok(Self {
            token: token.into(),
            container_name: container_name.into(),
            api_url: settings.ghcr.api_url.clone(),
            client,
        })
    }

    fn versions_url(&self) -> String {
        join_url(
            &self.api_url,
            &format!("user/packages/container/{}/versions", self.container_name),
        )
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(AUTHORIZATION, format!("token {}", self.token))
            .header(ACCEPT, GITHUB_API_ACCEPT)
    }

    fn log_rate_limit(headers: &HeaderMap) {
        let remaining = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok());
        let reset_at = headers
            .get("x-ratelimit-reset")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<i64>().ok())
            .and_then(|secs| DateTime::from_timestamp(secs, 0));

        if let (Some(remaining), Some(reset_at)) = (remaining, reset_at) {
            debug!("{} requests remaining until {}", remaining, reset_at);
        }
    }

    fn parse_versions(body: &str) -> Result<Vec<ImageVersion>> {
        let raw: Vec<Value> = serde_json::from_str(body).map_err(|e| {
            RegistryError::ParseError(format!("Invalid GHCR versions response: {}", e))
        })?;

        raw.into_iter()
            .map(|entry| {
                let version: PackageVersion = serde_json::from_value(entry.clone())
                    .map_err(|e| {
                        RegistryError::ParseError(format!("Invalid GHCR package version: {}", e))
                    })?;
                Ok(ImageVersion::new(
                    version.id.to_string(),
                    version.name,
                    version.created_at,
                    version.metadata.container.tags,
                )
                .with_metadata(entry))
            })
            .collect()
    }
}

impl ContainerRegistry for GhcrRegistry {
    fn registry_name(&self) -> &str {
        GHCR_REGISTRY_NAME
    }

    fn list_versions(&mut self) -> Result<Vec<ImageVersion>> {
        let url = self.versions_url();
        debug!("Listing package versions from {}", url);

        let response = self.authorized(self.client.get(&url)).send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response_body(response);
            error!("GitHub API returned status code: {}", status);
            error!("{}", body);
            return Err(RegistryError::from_status(GHCR_REGISTRY_NAME, status, body));
        }

        Self::log_rate_limit(response.headers());

        let body = response.text()?;
        let versions = Self::parse_versions(&body)?;

        debug!("Found {} images in {}", versions.len(), GHCR_REGISTRY_NAME);

        Ok(versions)
    }

    fn delete_version(&mut self, version_id: &str) -> bool {
        let url = join_url(&self.versions_url(), version_id);
        debug!("Deleting package version {} via {}", version_id, url);

        match self.authorized(self.client.delete(&url)).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                let status = response.status();
                warn!(
                    "Failed to delete version {}: {} - {}",
                    version_id,
                    status,
                    response_body(response)
                );
                false
            }
            Err(e) => {
                warn!("Failed to delete version {}: {}", version_id, e);
                false
            }
        }
    }
}
