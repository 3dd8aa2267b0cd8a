//! Shared work queue between producers and submission workers.
//!
//! An unbounded multi-producer FIFO whose receiving side is shared by any
//! number of workers. The channel hands each reference to exactly one
//! consumer; producers never block.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};

use buildwatch_core::ImageReference;

/// Pushing onto a queue whose consumers are all gone. A producer seeing
/// this has nowhere to put discovered work and must die loudly rather
/// than drop it.
#[derive(Debug, Error)]
#[error("work queue closed: all consumers are gone")]
pub struct QueueClosed;

/// Create a connected sender/receiver pair.
pub fn work_queue() -> (QueueSender, QueueReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        QueueSender { tx },
        QueueReceiver {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle. Cheap to clone; dropping the last sender closes the
/// queue once drained.
#[derive(Clone)]
pub struct QueueSender {
    tx: mpsc::UnboundedSender<ImageReference>,
}

impl QueueSender {
    pub fn push(&self, reference: ImageReference) -> Result<(), QueueClosed> {
        self.tx.send(reference).map_err(|_| QueueClosed)
    }
}

/// Consumer handle shared by all workers.
#[derive(Clone)]
pub struct QueueReceiver {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<ImageReference>>>,
}

impl QueueReceiver {
    /// Wait for the next reference. Returns `None` once every sender is
    /// dropped and the queue is drained.
    pub async fn pop(&self) -> Option<ImageReference> {
        self.rx.lock().await.recv().await
    }
}
