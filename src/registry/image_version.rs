use chrono::{DateTime, Utc};
use serde_json::Value;

/// One version of a container image as reported by a registry.
///
/// Instances are built fresh on every listing and are not modified afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageVersion {
    id: String,
    name: String,
    created_at: DateTime<Utc>,
    tags: Vec<String>,
    metadata: Value,
}

impl ImageVersion {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        created_at: DateTime<Utc>,
        tags: Vec<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at,
            tags,
            metadata: Value::Null,
        }
    }

    /// Attach the registry-native payload this version was parsed from.
    pub fn with_metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }

    /// Identifier unique within one registry listing.
    ///
    /// GHCR: the package version id. Docker Hub: the content digest, or the
    /// tag name when the registry reports no digest.
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// When this version was published.
    ///
    /// Docker Hub has no creation time for tags, so its `last_updated` value
    /// is used instead. Re-pushing a tag therefore makes it look newer.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    /// Raw registry payload, kept for diagnostics only.
    pub fn metadata(&self) -> &Value {
        &self.metadata
    }

    pub fn is_tagged(&self) -> bool {
        !self.tags.is_empty()
    }

    /// Short human-readable tag summary, e.g. ` (tags: v1, latest)` or ` (untagged)`.
    pub fn tag_info(&self) -> String {
        if self.is_tagged() {
            format!(" (tags: {})", self.tags.join(", "))
        } else {
            " (untagged)".to_string()
        }
    }
}
