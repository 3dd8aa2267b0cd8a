//! Wires configuration and collaborators into the running pipeline.

use std::sync::Arc;

use tracing::{error, info};

use buildwatch_cluster::{BuildEventSource, ImageStreamLister};
use buildwatch_core::Config;
use buildwatch_submit::{AnalysisSubmitter, ImageRelocator};

use crate::producer;
use crate::queue::work_queue;
use crate::supervisor::Supervisor;
use crate::worker::SubmissionWorker;

/// The pipeline's external collaborators, behind their trait seams.
///
/// `relocator` is `Some` exactly when a push registry is configured.
pub struct Collaborators {
    pub lister: Arc<dyn ImageStreamLister>,
    pub events: Arc<dyn BuildEventSource>,
    pub relocator: Option<Arc<dyn ImageRelocator>>,
    pub submitter: Arc<dyn AnalysisSubmitter>,
}

/// The assembled producer/worker/supervisor pipeline.
pub struct Pipeline {
    config: Arc<Config>,
    collaborators: Collaborators,
}

impl Pipeline {
    pub fn new(config: Arc<Config>, collaborators: Collaborators) -> Self {
        Self {
            config,
            collaborators,
        }
    }

    /// Start every unit and supervise them forever.
    ///
    /// Never returns success: the returned error describes why the
    /// process must die (dead unit, shutdown signal).
    pub async fn run(self) -> anyhow::Error {
        let Collaborators {
            lister,
            events,
            relocator,
            submitter,
        } = self.collaborators;
        let config = self.config;

        let (queue_tx, queue_rx) = work_queue();
        let mut supervisor = Supervisor::new(config.pipeline.liveness_interval);

        // One-shot backfill of already-built images. Deliberately
        // untracked: finishing is its success state.
        if config.pipeline.analyze_existing {
            let queue = queue_tx.clone();
            let namespace = config.namespace.clone();
            tokio::spawn(async move {
                if let Err(e) = producer::existing_images(lister, &namespace, queue).await {
                    error!(error = %e, "existing-image producer failed");
                }
            });
        }

        // The long-lived event watch. Its death is a liveness failure.
        {
            let queue = queue_tx.clone();
            let namespace = config.namespace.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = producer::build_events(events, &namespace, queue).await {
                    error!(error = %e, "event producer failed");
                }
            });
            supervisor.track("event-producer", handle);
        }

        info!(
            workers = config.pipeline.workers,
            "starting submission workers"
        );
        for id in 0..config.pipeline.workers {
            let worker = SubmissionWorker::new(
                id,
                queue_rx.clone(),
                relocator.clone(),
                submitter.clone(),
            );
            supervisor.track(format!("worker-{id}"), tokio::spawn(worker.run()));
        }

        // Producers own the sending side from here on; once they are all
        // gone the queue closes and idle workers exit, which the
        // supervisor reports as a structural failure.
        drop(queue_tx);

        supervisor.run().await
    }
}
