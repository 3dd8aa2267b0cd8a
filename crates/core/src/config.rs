//! Immutable runtime configuration.
//!
//! Built once at startup from CLI flags and environment, validated, then
//! shared by reference with every pipeline component. There is no ambient
//! global configuration object.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Conventional in-cluster API endpoint.
pub const DEFAULT_CLUSTER_URL: &str = "https://kubernetes.default.svc";

/// Conventional service account token location when running in-cluster.
pub const DEFAULT_TOKEN_FILE: &str = "/var/run/secrets/kubernetes.io/serviceaccount/token";

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("pass-token is disjoint with an explicit registry password")]
    PassTokenWithPassword,

    #[error("workers count must be at least 1")]
    NoWorkers,
}

// ── Top-level config ──────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Config {
    /// Namespace whose builds and image streams are watched.
    pub namespace: String,
    pub cluster: ClusterConfig,
    pub analysis: AnalysisConfig,
    pub registry: RegistryConfig,
    pub pipeline: PipelineConfig,
}

impl Config {
    /// Reject conflicting settings before any pipeline unit is started.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registry.pass_token && self.registry.password.is_some() {
            return Err(ConfigError::PassTokenWithPassword);
        }
        if self.pipeline.workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        Ok(())
    }
}

/// Connection parameters for the cluster API.
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    /// Base URL of the cluster API server.
    pub url: String,
    /// Bearer token; when unset, `token_file` is read instead.
    pub token: Option<String>,
    /// Service account token file fallback.
    pub token_file: PathBuf,
    /// Verify the API server's TLS certificate.
    pub verify_tls: bool,
}

/// Connection parameters for the remote analysis service.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Analysis service host, with or without an explicit scheme.
    pub api_host: String,
    /// Verify the analysis service's TLS certificate.
    pub verify_tls: bool,
}

/// Registry credentials and relocation target.
///
/// Credentials are used by the analysis service to pull images and, when
/// `push_registry` is set, by the copy into that registry.
#[derive(Clone)]
pub struct RegistryConfig {
    pub user: Option<String>,
    pub password: Option<String>,
    /// Use the cluster token as the registry password. Disjoint with an
    /// explicit `password`; resolved after validation.
    pub pass_token: bool,
    /// Copy images into this registry before submission.
    pub push_registry: Option<String>,
    /// Verify TLS of the source registry during a copy.
    pub src_verify_tls: bool,
    /// Verify TLS of the destination registry during a copy and of
    /// analysis-side pulls.
    pub dst_verify_tls: bool,
}

// Manual Debug: the password must never reach log output.
impl fmt::Debug for RegistryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegistryConfig")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("pass_token", &self.pass_token)
            .field("push_registry", &self.push_registry)
            .field("src_verify_tls", &self.src_verify_tls)
            .field("dst_verify_tls", &self.dst_verify_tls)
            .finish()
    }
}

/// Pipeline sizing and supervision parameters.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Number of submission workers.
    pub workers: usize,
    /// Backfill images already present in the namespace's image streams.
    pub analyze_existing: bool,
    /// Supervisor liveness poll interval.
    pub liveness_interval: Duration,
}
