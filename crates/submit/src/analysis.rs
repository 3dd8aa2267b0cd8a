//! Client for the remote analysis service.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use buildwatch_core::config::{AnalysisConfig, RegistryConfig};
use buildwatch_core::ImageReference;

use crate::error::SubmitError;
use crate::traits::{AnalysisId, AnalysisSubmitter};

/// Submits images to the analysis service over its REST API.
///
/// Registry credentials travel with every submission so the service can
/// pull the image from wherever it lives.
pub struct AnalysisClient {
    base_url: String,
    registry_user: Option<String>,
    registry_password: Option<String>,
    registry_verify_tls: bool,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AnalysisResponse {
    analysis_id: String,
}

impl AnalysisClient {
    pub fn new(
        analysis: &AnalysisConfig,
        registry: &RegistryConfig,
    ) -> Result<Self, SubmitError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!analysis.verify_tls)
            .build()
            .map_err(|e| SubmitError::Client(e.to_string()))?;

        Ok(Self {
            base_url: normalize_host(&analysis.api_host),
            registry_user: registry.user.clone(),
            registry_password: registry.password.clone(),
            registry_verify_tls: registry.dst_verify_tls,
            http,
        })
    }

    fn query_params(&self, image: &ImageReference) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("image", image.as_str().to_string()),
            ("nowait", "true".to_string()),
            ("verify_tls", self.registry_verify_tls.to_string()),
        ];
        if let Some(user) = &self.registry_user {
            params.push(("registry_user", user.clone()));
        }
        if let Some(password) = &self.registry_password {
            params.push(("registry_password", password.clone()));
        }
        params
    }
}

/// Apply a scheme when the configured host has none.
fn normalize_host(host: &str) -> String {
    let host = host.trim_end_matches('/');
    if host.starts_with("http://") || host.starts_with("https://") {
        host.to_string()
    } else {
        format!("https://{host}")
    }
}

#[async_trait]
impl AnalysisSubmitter for AnalysisClient {
    async fn submit(&self, image: &ImageReference) -> Result<AnalysisId, SubmitError> {
        let url = format!("{}/api/v1/analyze", self.base_url);
        debug!(image = %image, url = %url, "submitting image for analysis");

        let resp = self
            .http
            .post(&url)
            .query(&self.query_params(image))
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(SubmitError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: AnalysisResponse = resp.json().await?;
        Ok(AnalysisId::new(parsed.analysis_id))
    }
}
