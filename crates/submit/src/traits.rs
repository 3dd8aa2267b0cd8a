//! Seams between the pipeline and its outbound collaborators.

use std::fmt;

use async_trait::async_trait;

use buildwatch_core::ImageReference;

use crate::error::SubmitError;

/// Opaque identifier of a scheduled analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisId(String);

impl AnalysisId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AnalysisId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Submits an image to the remote analysis service.
///
/// Fire-and-forget: the call returns as soon as the analysis is scheduled,
/// it never waits for the analysis itself.
#[async_trait]
pub trait AnalysisSubmitter: Send + Sync {
    async fn submit(&self, image: &ImageReference) -> Result<AnalysisId, SubmitError>;
}

/// Copies an image into the configured push registry, returning the
/// reference it is reachable under afterwards.
#[async_trait]
pub trait ImageRelocator: Send + Sync {
    async fn relocate(&self, image: &ImageReference) -> Result<ImageReference, SubmitError>;
}
