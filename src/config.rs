use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors raised while loading the settings file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read settings file '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings file '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid URL for {field}: {value} ({source})")]
    InvalidUrl {
        field: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// Configuration for regprune loaded from environment variables.
///
/// Supports both REGPRUNE_* and shorter unprefixed fallbacks.
/// When both are present, REGPRUNE_* takes precedence.
#[derive(Debug, Clone)]
pub struct Config {
    /// Log level for the application (default: INFO)
    pub log_level: LevelFilter,

    /// Optional path to a JSON settings file
    pub settings_file: Option<String>,

    /// User agent string for HTTP requests (default: regprune/<version>)
    pub user_agent: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: LevelFilter::Info,
            settings_file: None,
            user_agent: format!("regprune/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(level) = Self::get_env_with_fallback("REGPRUNE_LOG_LEVEL", "LOG_LEVEL") {
            config.log_level = Self::parse_log_level(&level);
        }

        if let Ok(path) =
            Self::get_env_with_fallback("REGPRUNE_SETTINGS_FILE", "PRUNE_SETTINGS_FILE")
            && !path.trim().is_empty()
        {
            config.settings_file = Some(path);
        }

        if let Ok(ua) = env::var("REGPRUNE_USER_AGENT") {
            config.user_agent = ua;
        }

        config
    }

    /// Get environment variable with fallback to alternative name.
    /// Primary takes precedence over fallback.
    fn get_env_with_fallback(primary: &str, fallback: &str) -> Result<String, env::VarError> {
        env::var(primary).or_else(|_| env::var(fallback))
    }

    /// Parse log level string to LevelFilter.
    ///
    /// Supports: TRACE, DEBUG, INFO, WARN, ERROR, OFF (case-insensitive)
    pub(crate) fn parse_log_level(level: &str) -> LevelFilter {
        match level.to_uppercase().as_str() {
            "TRACE" => LevelFilter::Trace,
            "DEBUG" => LevelFilter::Debug,
            "INFO" => LevelFilter::Info,
            "WARN" | "WARNING" => LevelFilter::Warn,
            "ERROR" => LevelFilter::Error,
            "OFF" => LevelFilter::Off,
            _ => {
                eprintln!("Warning: Invalid log level '{}', using INFO", level);
                LevelFilter::Info
            }
        }
    }

    /// Effective log level once the `--verbose` flag is taken into account.
    pub fn effective_log_level(&self, verbose: bool) -> LevelFilter {
        if verbose {
            self.log_level.max(LevelFilter::Debug)
        } else {
            self.log_level
        }
    }
}

/// Registry credentials, read once at startup.
///
/// Empty values are treated as absent.
#[derive(Clone, Default)]
pub struct Credentials {
    pub ghcr_token: Option<String>,
    pub docker_username: Option<String>,
    pub docker_password: Option<String>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build credentials from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.is_empty());
        Self {
            ghcr_token: non_empty("GHCR_TOKEN"),
            docker_username: non_empty("DOCKER_USERNAME"),
            docker_password: non_empty("DOCKER_PASSWORD"),
        }
    }
}

// Secrets stay out of debug output.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("ghcr_token", &self.ghcr_token.as_ref().map(|_| "***"))
            .field("docker_username", &self.docker_username)
            .field("docker_password", &self.docker_password.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Settings for the GitHub Container Registry API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GhcrSettings {
    /// Base URL of the GitHub REST API
    pub api_url: String,
}

impl Default for GhcrSettings {
    fn default() -> Self {
        Self {
            api_url: "https://api.github.com".to_string(),
        }
    }
}

/// Settings for the Docker Hub API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerHubSettings {
    /// Base URL of the Docker Hub v2 API
    pub api_url: String,

    /// Number of tags requested per page when listing
    pub page_size: u32,
}

impl Default for DockerHubSettings {
    fn default() -> Self {
        Self {
            api_url: "https://hub.docker.com/v2".to_string(),
            page_size: 100,
        }
    }
}

/// Settings shared by every HTTP client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpSettings {
    /// Request timeout in seconds; the transport default applies when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Whether TLS certificates are verified
    pub verify_ssl: bool,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: None,
            verify_ssl: true,
        }
    }
}

/// Application settings, optionally loaded from a JSON file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub ghcr: GhcrSettings,
    pub dockerhub: DockerHubSettings,
    pub http: HttpSettings,
}

impl AppSettings {
    /// Load settings from a JSON file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let settings: Self =
            serde_json::from_str(&contents).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from `path` when given, otherwise fall back to defaults.
    pub fn load_or_default(path: Option<&str>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("ghcr.api_url", &self.ghcr.api_url),
            ("dockerhub.api_url", &self.dockerhub.api_url),
        ] {
            Url::parse(value).map_err(|source| ConfigError::InvalidUrl {
                field,
                value: value.clone(),
                source,
            })?;
        }

        if self.dockerhub.page_size == 0 {
            return Err(ConfigError::Invalid(
                "dockerhub.page_size must be at least 1".to_string(),
            ));
        }

        if let Some(timeout) = self.http.timeout_secs
            && (timeout <= 0.0 || Duration::try_from_secs_f64(timeout).is_err())
        {
            return Err(ConfigError::Invalid(format!(
                "http.timeout_secs must be a positive number of seconds, got {}",
                timeout
            )));
        }

        Ok(())
    }
}
