//! Pipeline producers: the one-shot existing-image backfill and the
//! long-lived build event watch.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use tracing::{debug, info, warn};

use buildwatch_cluster::{BuildEventSource, BuildPhase, ImageStreamLister};
use buildwatch_core::ImageReference;

use crate::queue::QueueSender;

/// Enqueue every tagged image already present in the namespace's image
/// streams, then return.
///
/// Runs exactly once. A listing failure ends this producer without
/// affecting the rest of the pipeline.
pub async fn existing_images(
    lister: Arc<dyn ImageStreamLister>,
    namespace: &str,
    queue: QueueSender,
) -> Result<()> {
    let streams = lister
        .list_image_streams(namespace)
        .await
        .context("listing image streams")?;

    for stream in streams {
        debug!(stream = %stream.metadata.name, "listing tags");
        for tag in &stream.status.tags {
            let reference = ImageReference::from_repository_tag(
                &stream.status.docker_image_repository,
                &tag.tag,
            );
            info!(image = %reference, "queueing already existing image for analysis");
            queue.push(reference)?;
        }
    }

    info!("finished queueing existing images, all of them were scheduled for analysis");
    Ok(())
}

/// Watch build events and enqueue the output image of every build that
/// reaches the `Complete` phase.
///
/// This is the pipeline's long-running read loop: it suspends while
/// waiting for the next event and only returns when the watch itself is
/// lost, which is an error. The supervisor treats this unit's death as
/// fatal to the process.
pub async fn build_events(
    source: Arc<dyn BuildEventSource>,
    namespace: &str,
    queue: QueueSender,
) -> Result<()> {
    info!("starting event producer");
    let mut stream = source.watch_builds(namespace).await.context("opening build watch")?;

    while let Some(build) = stream.next().await {
        let build = build.context("reading build watch stream")?;

        if build.status.phase != BuildPhase::Complete {
            debug!(
                build = %build.metadata.name,
                phase = %build.status.phase,
                "ignoring build event, not in completed phase"
            );
            continue;
        }

        let Some(reference) = build.status.output_docker_image_reference else {
            warn!(build = %build.metadata.name, "completed build has no output image reference");
            continue;
        };

        let reference = ImageReference::new(reference);
        info!(
            image = %reference,
            build = %build.metadata.name,
            "queueing image from build event for further processing"
        );
        queue.push(reference)?;
    }

    bail!("build watch stream ended")
}
