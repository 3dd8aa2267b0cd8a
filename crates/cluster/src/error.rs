//! Cluster client error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("connection error: {0}")]
    Connection(String),

    #[error("api error: status {status}: {body}")]
    Api { status: u16, body: String },

    #[error("token error: {0}")]
    Token(String),

    #[error("watch stream error: {0}")]
    Stream(String),

    #[error("client build error: {0}")]
    Client(String),
}

impl From<reqwest::Error> for ClusterError {
    fn from(e: reqwest::Error) -> Self {
        ClusterError::Connection(e.to_string())
    }
}
