//! Submission worker: pulls references off the work queue and submits
//! each for analysis, optionally relocating the image first.

use std::sync::Arc;

use tracing::{error, info, warn};

use buildwatch_core::ImageReference;
use buildwatch_submit::{AnalysisId, AnalysisSubmitter, ImageRelocator, SubmitError};

use crate::queue::QueueReceiver;

/// One member of the fixed-size submission pool.
///
/// Workers are independent: they share nothing but the queue. A failure
/// while handling one reference is logged and swallowed so the next item
/// is picked up; one bad image must not stop the line.
pub struct SubmissionWorker {
    id: usize,
    queue: QueueReceiver,
    relocator: Option<Arc<dyn ImageRelocator>>,
    submitter: Arc<dyn AnalysisSubmitter>,
}

impl SubmissionWorker {
    pub fn new(
        id: usize,
        queue: QueueReceiver,
        relocator: Option<Arc<dyn ImageRelocator>>,
        submitter: Arc<dyn AnalysisSubmitter>,
    ) -> Self {
        Self {
            id,
            queue,
            relocator,
            submitter,
        }
    }

    /// Consume the queue until it closes.
    pub async fn run(self) {
        info!(worker = self.id, "submission worker started");

        while let Some(reference) = self.queue.pop().await {
            info!(worker = self.id, image = %reference, "handling analysis of image");
            match self.process(&reference).await {
                Ok(analysis_id) => {
                    info!(
                        worker = self.id,
                        image = %reference,
                        analysis_id = %analysis_id,
                        "successfully submitted image for analysis"
                    );
                }
                Err(e) => {
                    error!(
                        worker = self.id,
                        image = %reference,
                        error = %e,
                        "failed to submit image for analysis"
                    );
                }
            }
        }

        // Queue closed: every producer is gone. The supervisor decides
        // what a finished worker means for the process.
        warn!(worker = self.id, "work queue closed, submission worker exiting");
    }

    async fn process(&self, reference: &ImageReference) -> Result<AnalysisId, SubmitError> {
        let submitted = match &self.relocator {
            Some(relocator) => relocator.relocate(reference).await?,
            None => reference.clone(),
        };
        self.submitter.submit(&submitted).await
    }
}
