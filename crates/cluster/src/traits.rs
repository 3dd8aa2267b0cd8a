//! Seams between the pipeline and the cluster API.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::ClusterError;
use crate::types::{Build, ImageStream};

/// Unbounded stream of builds as they change in the cluster.
pub type BuildStream = BoxStream<'static, Result<Build, ClusterError>>;

/// Enumerates the image streams of a namespace, without events.
#[async_trait]
pub trait ImageStreamLister: Send + Sync {
    async fn list_image_streams(
        &self,
        namespace: &str,
    ) -> Result<Vec<ImageStream>, ClusterError>;
}

/// Long-lived subscription to build lifecycle events in a namespace.
///
/// The returned stream never ends under normal operation. A stream that
/// yields an error or terminates means the watch itself was lost, which
/// callers must treat as fatal to their unit.
#[async_trait]
pub trait BuildEventSource: Send + Sync {
    async fn watch_builds(&self, namespace: &str) -> Result<BuildStream, ClusterError>;
}
