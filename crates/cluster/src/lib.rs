pub mod client;
pub mod error;
pub mod traits;
pub mod types;

pub use client::ClusterClient;
pub use error::ClusterError;
pub use traits::{BuildEventSource, BuildStream, ImageStreamLister};
pub use types::{Build, BuildPhase, BuildStatus, ImageStream, WatchEvent};
