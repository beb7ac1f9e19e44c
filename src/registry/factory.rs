//! Registry construction from a registry-type tag and the available credentials.
use crate::config::{AppSettings, Credentials};
use crate::registry::container_registry::{ContainerRegistry, RegistryError, Result};
use crate::registry::dockerhub::{DOCKER_HUB_REGISTRY_NAME, DockerHubRegistry};
use crate::registry::ghcr::{GHCR_REGISTRY_NAME, GhcrRegistry};
use log::info;
use std::fmt;
use std::str::FromStr;

/// The registry variants regprune knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegistryKind {
    Ghcr,
    DockerHub,
}

impl RegistryKind {
    pub const ALL: [RegistryKind; 2] = [RegistryKind::Ghcr, RegistryKind::DockerHub];

    /// The name the registry reports through `ContainerRegistry::registry_name`.
    pub fn display_name(&self) -> &'static str {
        match self {
            RegistryKind::Ghcr => GHCR_REGISTRY_NAME,
            RegistryKind::DockerHub => DOCKER_HUB_REGISTRY_NAME,
        }
    }
}

impl fmt::Display for RegistryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for RegistryKind {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "ghcr" | "github" => Ok(RegistryKind::Ghcr),
            "dockerhub" | "docker" | "hub" => Ok(RegistryKind::DockerHub),
            _ => Err(RegistryError::UnsupportedRegistry(s.to_string())),
        }
    }
}

/// Create a registry instance for `kind` from the supplied credentials.
///
/// # Returns
/// * `Result<Box<dyn ContainerRegistry>>` - The registry, or
///   `RegistryError::CredentialMissing` when its credentials are not set
pub fn create_registry(
    kind: RegistryKind,
    container_name: &str,
    credentials: &Credentials,
    settings: &AppSettings,
    user_agent: &str,
) -> Result<Box<dyn ContainerRegistry>> {
    match kind {
        RegistryKind::Ghcr => {
            let token = credentials.ghcr_token.as_deref().ok_or_else(|| {
                RegistryError::CredentialMissing(
                    "GHCR_TOKEN environment variable is required for GitHub Container Registry"
                        .to_string(),
                )
            })?;
            Ok(Box::new(GhcrRegistry::new(
                token,
                container_name,
                settings,
                user_agent,
            )?))
        }
        RegistryKind::DockerHub => {
            let (Some(username), Some(password)) = (
                credentials.docker_username.as_deref(),
                credentials.docker_password.as_deref(),
            ) else {
                return Err(RegistryError::CredentialMissing(
                    "DOCKER_USERNAME and DOCKER_PASSWORD environment variables are required for Docker Hub"
                        .to_string(),
                ));
            };
            Ok(Box::new(DockerHubRegistry::new(
                username,
                password,
                container_name,
                settings,
                user_agent,
            )?))
        }
    }
}

/// Create every registry whose credentials are available.
///
/// Registries with missing credentials are skipped. Fails only when no
/// registry at all could be created.
pub fn create_all_registries(
    container_name: &str,
    credentials: &Credentials,
    settings: &AppSettings,
    user_agent: &str,
) -> Result<Vec<Box<dyn ContainerRegistry>>> {
    let mut registries = Vec::new();

    for kind in RegistryKind::ALL {
        match create_registry(kind, container_name, credentials, settings, user_agent) {
            Ok(registry) => registries.push(registry),
            Err(RegistryError::CredentialMissing(reason)) => {
                info!("Skipping {}: {}", kind, reason);
            }
            Err(e) => return Err(e),
        }
    }

    if registries.is_empty() {
        return Err(RegistryError::NoRegistriesAvailable);
    }

    Ok(registries)
}
