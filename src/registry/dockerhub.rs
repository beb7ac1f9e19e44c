//! Docker Hub registry implementation.
use crate::config::AppSettings;
use crate::registry::client::{build_client, join_url, response_body};
use crate::registry::container_registry::{ContainerRegistry, RegistryError, Result};
use crate::registry::image_version::ImageVersion;
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use reqwest::blocking::{Client, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DOCKER_HUB_REGISTRY_NAME: &str = "Docker Hub";

#[derive(Debug, Serialize)]
struct TokenRequest<'a> {
    identifier: &'a str,
    secret: &'a str,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    #[serde(alias = "token")]
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TagPage {
    #[serde(default)]
    next: Option<String>,
    #[serde(default)]
    results: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RepositoryTag {
    name: String,
    #[serde(default)]
    digest: Option<String>,
    last_updated: DateTime<Utc>,
    #[serde(default)]
    tag_status: Option<String>,
}

/// Registry backed by the Docker Hub v2 API.
///
/// Docker Hub exchanges the username and password for a bearer token. The
/// exchange happens on first use and the token is kept for the lifetime of
/// the instance; it is never refreshed, so a run that outlives the token's
/// expiry will start failing with authentication errors.
pub struct DockerHubRegistry {
    username: String,
    password: String,
    container_name: String,
    api_url: String,
    page_size: u32,
    client: Client,
    auth_token: Option<String>,
}

impl DockerHubRegistry {
    /// Create a new Docker Hub registry client
    ///
    /// # Arguments
    /// * `username` - Docker Hub username, also used as the repository namespace
    /// * `password` - Docker Hub password or personal access token
    /// * `container_name` - Repository name within the namespace
    /// * `settings` - Application settings
    /// * `user_agent` - User agent sent with every request
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        container_name: impl Into<String>,
        settings: &AppSettings,
        user_agent: &str,
    ) -> Result<Self> {
        let client = build_client(user_agent, &settings.http)?;

        Ok(Self {
            username: username.into(),
            password: password.into(),
            container_name: container_name.into(),
            api_url: settings.dockerhub.api_url.clone(),
            page_size: settings.dockerhub.page_size,
            client,
            auth_token: None,
        })
    }

    fn repository_url(&self) -> String {
        join_url(
            &self.api_url,
            &format!("repositories/{}/{}/", self.username, self.container_name),
        )
    }

    fn tags_url(&self) -> String {
        format!("{}tags/", self.repository_url())
    }

    /// Return the cached bearer token, exchanging credentials on first use.
    fn auth_token(&mut self) -> Result<String> {
        if let Some(token) = &self.auth_token {
            return Ok(token.clone());
        }

        let url = join_url(&self.api_url, "auth/token");
        debug!("Exchanging Docker Hub credentials at {}", url);

        let response = self
            .client
            .post(&url)
            .json(&TokenRequest {
                identifier: &self.username,
                secret: &self.password,
            })
            .send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response_body(response);
            error!("Docker Hub auth failed: {}", status);
            error!("{}", body);
            return Err(RegistryError::AuthenticationRejected {
                registry: DOCKER_HUB_REGISTRY_NAME.to_string(),
                status,
                body,
            });
        }

        let body = response.text()?;
        let token: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            RegistryError::ParseError(format!("Invalid Docker Hub token response: {}", e))
        })?;

        self.auth_token = Some(token.access_token.clone());
        Ok(token.access_token)
    }

    fn authorized(request: RequestBuilder, token: &str) -> RequestBuilder {
        request.bearer_auth(token)
    }

    fn ensure_repository_exists(&self, token: &str) -> Result<()> {
        let response = Self::authorized(self.client.get(self.repository_url()), token).send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response_body(response);
            error!("Docker Hub repository not found: {}", status);
            error!("{}", body);
            return Err(RegistryError::from_status(
                DOCKER_HUB_REGISTRY_NAME,
                status,
                body,
            ));
        }

        Ok(())
    }

    fn fetch_tag_page(&self, token: &str, page: u32) -> Result<TagPage> {
        let response = Self::authorized(self.client.get(self.tags_url()), token)
            .query(&[("page_size", self.page_size), ("page", page)])
            .send()?;
        let status = response.status();

        if !status.is_success() {
            let body = response_body(response);
            error!("Docker Hub API error: {}", status);
            error!("{}", body);
            return Err(RegistryError::from_status(
                DOCKER_HUB_REGISTRY_NAME,
                status,
                body,
            ));
        }

        let body = response.text()?;
        serde_json::from_str(&body).map_err(|e| {
            RegistryError::ParseError(format!("Invalid Docker Hub tag page {}: {}", page, e))
        })
    }

    /// Convert one entry of a tag listing into an image version.
    ///
    /// The digest doubles as the id since Docker Hub has no version ids. An
    /// entry named `latest` counts as untagged unless its status is `active`.
    fn parse_tag(entry: Value) -> Result<ImageVersion> {
        let tag: RepositoryTag = serde_json::from_value(entry.clone()).map_err(|e| {
            RegistryError::ParseError(format!("Invalid Docker Hub tag entry: {}", e))
        })?;

        let id = tag
            .digest
            .filter(|d| !d.is_empty())
            .unwrap_or_else(|| tag.name.clone());

        let tags = if tag.name != "latest" || tag.tag_status.as_deref() == Some("active") {
            vec![tag.name.clone()]
        } else {
            Vec::new()
        };

        Ok(ImageVersion::new(id, tag.name, tag.last_updated, tags).with_metadata(entry))
    }

    fn has_next_page(next: Option<&str>) -> bool {
        next.is_some_and(|n| !n.is_empty())
    }
}

impl ContainerRegistry for DockerHubRegistry {
    fn registry_name(&self) -> &str {
        DOCKER_HUB_REGISTRY_NAME
    }

    fn list_versions(&mut self) -> Result<Vec<ImageVersion>> {
        let token = self.auth_token()?;
        self.ensure_repository_exists(&token)?;

        let mut versions = Vec::new();
        let mut page = 1;

        loop {
            debug!("Fetching Docker Hub tag page {}", page);
            let tag_page = self.fetch_tag_page(&token, page)?;

            for entry in tag_page.results {
                versions.push(Self::parse_tag(entry)?);
            }

            if !Self::has_next_page(tag_page.next.as_deref()) {
                break;
            }
            page += 1;
        }

        debug!(
            "Found {} images in {}",
            versions.len(),
            DOCKER_HUB_REGISTRY_NAME
        );

        Ok(versions)
    }

    fn delete_version(&mut self, version_id: &str) -> bool {
        let token = match self.auth_token() {
            Ok(token) => token,
            Err(e) => {
                warn!("Cannot delete {}: {}", version_id, e);
                return false;
            }
        };

        // The delete endpoint only accepts tag names, so map the id back first.
        let versions = match self.list_versions() {
            Ok(versions) => versions,
            Err(e) => {
                warn!("Cannot resolve {} to a tag name: {}", version_id, e);
                return false;
            }
        };

        // Tags sharing a digest share an id, and deleting the wrong one could
        // remove a tagged image.
        let matches: Vec<&str> = versions
            .iter()
            .filter(|v| v.id() == version_id)
            .map(|v| v.name())
            .collect();
        let tag_name = match matches.as_slice() {
            [] => {
                info!("Version {} not found", version_id);
                return false;
            }
            [name] => name.to_string(),
            names => {
                warn!(
                    "Refusing to delete {}: it resolves to several tags ({})",
                    version_id,
                    names.join(", ")
                );
                return false;
            }
        };

        let url = format!("{}{}/", self.tags_url(), tag_name);
        debug!("Deleting tag {} via {}", tag_name, url);

        match Self::authorized(self.client.delete(&url), &token).send() {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                let status = response.status();
                warn!(
                    "Failed to delete tag {}: {} - {}",
                    tag_name,
                    status,
                    response_body(response)
                );
                false
            }
            Err(e) => {
                warn!("Failed to delete tag {}: {}", tag_name, e);
                false
            }
        }
    }
}
