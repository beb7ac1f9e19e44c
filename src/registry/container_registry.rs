use crate::registry::image_version::ImageVersion;
use reqwest::StatusCode;
use thiserror::Error;

/// Error types for registry operations
#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("{registry} rejected the supplied credentials ({status}): {body}")]
    AuthenticationRejected {
        registry: String,
        status: StatusCode,
        body: String,
    },

    #[error("{registry} API returned status code {status}: {body}")]
    Unavailable {
        registry: String,
        status: StatusCode,
        body: String,
    },

    #[error("Failed to parse registry response: {0}")]
    ParseError(String),

    #[error("{0}")]
    CredentialMissing(String),

    #[error("Unsupported registry type: {0}. Supported types: ghcr, dockerhub")]
    UnsupportedRegistry(String),

    #[error("No registries available. Please set the required environment variables.")]
    NoRegistriesAvailable,
}

impl RegistryError {
    /// Classify a non-success listing response.
    ///
    /// 401 and 403 mean the credentials were refused; anything else is treated
    /// as the provider being unavailable.
    pub fn from_status(registry: &str, status: StatusCode, body: String) -> Self {
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            RegistryError::AuthenticationRejected {
                registry: registry.to_string(),
                status,
                body,
            }
        } else {
            RegistryError::Unavailable {
                registry: registry.to_string(),
                status,
                body,
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, RegistryError>;

/// Trait defining the common interface for container registries
pub trait ContainerRegistry {
    /// Human-readable registry label used for reporting.
    fn registry_name(&self) -> &str;

    /// List every version currently visible for the configured container.
    ///
    /// Pagination is followed until the provider reports no further pages.
    /// A failure on any request aborts the listing; partial results are never
    /// returned.
    ///
    /// # Returns
    /// * `Result<Vec<ImageVersion>>` - All versions, in provider order
    fn list_versions(&mut self) -> Result<Vec<ImageVersion>>;

    /// Delete exactly one version.
    ///
    /// # Arguments
    /// * `version_id` - The id of a version previously returned by `list_versions`
    ///
    /// # Returns
    /// * `bool` - True if the registry confirmed the deletion. Unknown ids,
    ///   rejected requests and transport errors are logged and yield false.
    fn delete_version(&mut self, version_id: &str) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_classifies_auth_failures() {
        for status in [StatusCode::UNAUTHORIZED, StatusCode::FORBIDDEN] {
            let err = RegistryError::from_status("GHCR", status, String::new());
            assert!(matches!(err, RegistryError::AuthenticationRejected { .. }));
        }

        for status in [StatusCode::NOT_FOUND, StatusCode::INTERNAL_SERVER_ERROR] {
            let err = RegistryError::from_status("GHCR", status, "boom".to_string());
            assert!(matches!(err, RegistryError::Unavailable { .. }));
            assert!(err.to_string().contains("boom"));
        }
    }
}
