//! Submission and relocation error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("analysis api error: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("copy failed (exit code {code:?}): {stderr}")]
    Copy { code: Option<i32>, stderr: String },

    #[error("failed to spawn copy command: {0}")]
    Spawn(String),

    #[error("client build error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for SubmitError {
    fn from(e: reqwest::Error) -> Self {
        SubmitError::Connection(e.to_string())
    }
}
