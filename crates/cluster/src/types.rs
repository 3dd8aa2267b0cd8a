//! REST resource models for the cluster image and build APIs.
//!
//! Only the fields the pipeline reads are modeled; everything else on the
//! wire is ignored.

use std::fmt;

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub name: String,
}

// ── Image streams ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageStreamList {
    #[serde(default)]
    pub items: Vec<ImageStream>,
}

/// A repository of built images plus the tags currently pointing into it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageStream {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: ImageStreamStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageStreamStatus {
    /// Pullable repository path for this stream.
    #[serde(default)]
    pub docker_image_repository: String,
    #[serde(default)]
    pub tags: Vec<NamedTagEvents>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NamedTagEvents {
    pub tag: String,
}

// ── Builds ────────────────────────────────────────────────────────────

/// A build object as carried on the watch stream.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Build {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub status: BuildStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStatus {
    #[serde(default)]
    pub phase: BuildPhase,
    /// Where the build pushed its output image. Only meaningful once the
    /// build reaches the `Complete` phase.
    #[serde(default)]
    pub output_docker_image_reference: Option<String>,
}

/// Build lifecycle phase. `Complete` is the single terminal success state;
/// every other phase is ignored by the pipeline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum BuildPhase {
    New,
    Pending,
    Running,
    Complete,
    Failed,
    Error,
    Cancelled,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let phase = match self {
            BuildPhase::New => "New",
            BuildPhase::Pending => "Pending",
            BuildPhase::Running => "Running",
            BuildPhase::Complete => "Complete",
            BuildPhase::Failed => "Failed",
            BuildPhase::Error => "Error",
            BuildPhase::Cancelled => "Cancelled",
            BuildPhase::Unknown => "Unknown",
        };
        write!(f, "{phase}")
    }
}

/// One line of the watch stream: an event type plus the affected build.
#[derive(Debug, Clone, Deserialize)]
pub struct WatchEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub object: Build,
}
