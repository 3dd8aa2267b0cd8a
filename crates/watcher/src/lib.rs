//! Producer/consumer pipeline turning cluster build events into analysis
//! submissions.
//!
//! Producers discover image references and push them onto a shared work
//! queue; a fixed pool of submission workers pulls references off and
//! submits them, optionally relocating each image into a push registry
//! first. A supervisor polls the liveness of every long-lived unit and
//! fails the whole process the moment one dies.

pub mod pipeline;
pub mod producer;
pub mod queue;
pub mod supervisor;
pub mod worker;

pub use pipeline::{Collaborators, Pipeline};
pub use queue::{work_queue, QueueClosed, QueueReceiver, QueueSender};
pub use supervisor::Supervisor;
pub use worker::SubmissionWorker;
