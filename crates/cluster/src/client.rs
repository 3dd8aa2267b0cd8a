//! HTTP client for the cluster image and build APIs.
//!
//! Speaks the OpenShift-style REST surface with a bearer token: plain GET
//! for image stream listing, and `?watch=true` for the build watch, which
//! the server answers with an unbounded body of newline-delimited JSON
//! events.

use std::fs;

use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use tracing::{debug, info, warn};

use buildwatch_core::config::ClusterConfig;

use crate::error::ClusterError;
use crate::traits::{BuildEventSource, BuildStream, ImageStreamLister};
use crate::types::{ImageStream, ImageStreamList, WatchEvent};

/// REST client for the cluster API server.
#[derive(Debug)]
pub struct ClusterClient {
    base_url: String,
    token: String,
    http: reqwest::Client,
}

impl ClusterClient {
    /// Build a client from connection config.
    ///
    /// The bearer token comes from config when set, otherwise from the
    /// service account token file.
    pub fn new(config: &ClusterConfig) -> Result<Self, ClusterError> {
        let token = match &config.token {
            Some(token) => token.clone(),
            None => fs::read_to_string(&config.token_file)
                .map_err(|e| {
                    ClusterError::Token(format!(
                        "failed to read {}: {e}",
                        config.token_file.display()
                    ))
                })?
                .trim()
                .to_string(),
        };

        if token.is_empty() {
            return Err(ClusterError::Token("cluster token is empty".to_string()));
        }

        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|e| ClusterError::Client(e.to_string()))?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    /// The bearer token this client authenticates with.
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Parse one line of a watch body. Malformed lines are logged and skipped
/// rather than treated as loss of the stream.
fn parse_watch_line(line: &str) -> Option<WatchEvent> {
    if line.is_empty() {
        return None;
    }
    match serde_json::from_str::<WatchEvent>(line) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!(error = %e, "skipping malformed watch line");
            None
        }
    }
}

#[async_trait]
impl ImageStreamLister for ClusterClient {
    async fn list_image_streams(
        &self,
        namespace: &str,
    ) -> Result<Vec<ImageStream>, ClusterError> {
        let url = format!(
            "{}/apis/image.openshift.io/v1/namespaces/{namespace}/imagestreams",
            self.base_url
        );
        debug!(url = %url, "listing image streams");

        let resp = self
            .http
            .get(&url)
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let list: ImageStreamList = resp.json().await?;
        debug!(count = list.items.len(), "image streams listed");
        Ok(list.items)
    }
}

#[async_trait]
impl BuildEventSource for ClusterClient {
    async fn watch_builds(&self, namespace: &str) -> Result<BuildStream, ClusterError> {
        let url = format!(
            "{}/apis/build.openshift.io/v1/namespaces/{namespace}/builds",
            self.base_url
        );
        info!(url = %url, "opening build watch");

        let resp = self
            .http
            .get(&url)
            .query(&[("watch", "true")])
            .bearer_auth(&self.token)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClusterError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // Accumulate body chunks and emit one build per complete line.
        struct State {
            bytes: BoxStream<'static, Result<bytes::Bytes, reqwest::Error>>,
            buffer: String,
        }

        let state = State {
            bytes: Box::pin(resp.bytes_stream()),
            buffer: String::new(),
        };

        let events = stream::unfold(state, |mut state| async move {
            loop {
                // Drain complete lines already buffered.
                while let Some(newline) = state.buffer.find('\n') {
                    let line = state.buffer[..newline].trim_end_matches('\r').to_string();
                    state.buffer.drain(..=newline);
                    if let Some(event) = parse_watch_line(&line) {
                        debug!(
                            event = %event.event_type,
                            build = %event.object.metadata.name,
                            "watch event"
                        );
                        return Some((Ok(event.object), state));
                    }
                }

                match state.bytes.next().await {
                    Some(Ok(chunk)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    }
                    Some(Err(e)) => {
                        return Some((Err(ClusterError::Stream(e.to_string())), state));
                    }
                    None => return None,
                }
            }
        });

        Ok(Box::pin(events))
    }
}
