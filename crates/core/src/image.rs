//! Image reference value type flowing through the pipeline.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fully-qualified pointer to a container image: a registry/repository path
/// plus a tag or digest, e.g. `registry.example.com/myapp/web:latest`.
///
/// References are immutable once created. Operations that change where an
/// image lives ([`ImageReference::relocated`]) derive a *new* reference
/// instead of mutating the original.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageReference(String);

impl ImageReference {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    /// Build a reference from a repository path and a tag.
    pub fn from_repository_tag(repository: &str, tag: &str) -> Self {
        Self(format!("{repository}:{tag}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Final path segment of the reference, tag included.
    ///
    /// `registry.example.com/myapp/web:latest` → `web:latest`.
    pub fn basename(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The reference this image will have after being copied into
    /// `push_registry`: `<push-registry>/<basename>`.
    pub fn relocated(&self, push_registry: &str) -> ImageReference {
        ImageReference(format!(
            "{}/{}",
            push_registry.trim_end_matches('/'),
            self.basename()
        ))
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ImageReference {
    fn from(reference: String) -> Self {
        Self(reference)
    }
}

impl AsRef<str> for ImageReference {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
