pub mod analysis;
pub mod error;
pub mod skopeo;
pub mod traits;

pub use analysis::AnalysisClient;
pub use error::SubmitError;
pub use skopeo::SkopeoRelocator;
pub use traits::{AnalysisId, AnalysisSubmitter, ImageRelocator};
