//! buildwatch: watch a namespace for completed image builds and submit
//! the resulting images to the analysis service.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use buildwatch::pipeline::{Collaborators, Pipeline};
use buildwatch_cluster::ClusterClient;
use buildwatch_core::config::{
    load_dotenv, AnalysisConfig, ClusterConfig, PipelineConfig, RegistryConfig,
    DEFAULT_CLUSTER_URL, DEFAULT_TOKEN_FILE,
};
use buildwatch_core::Config;
use buildwatch_submit::{AnalysisClient, ImageRelocator, SkopeoRelocator};

// ── CLI ─────────────────────────────────────────────────────────────

/// Watch a namespace for completed image builds and submit every
/// resulting image to the analysis service.
#[derive(Parser, Debug)]
#[command(name = "buildwatch", version, about)]
struct Cli {
    /// Namespace to watch for builds and image streams.
    #[arg(short = 'n', long, env = "BUILDWATCH_NAMESPACE")]
    namespace: String,

    /// Host of the analysis service API.
    #[arg(short = 'a', long, env = "BUILDWATCH_API_HOST")]
    api_host: String,

    /// Cluster API base URL.
    #[arg(long, env = "BUILDWATCH_CLUSTER_URL", default_value = DEFAULT_CLUSTER_URL)]
    cluster_url: String,

    /// Cluster bearer token; when unset, --cluster-token-file is read.
    #[arg(long, env = "BUILDWATCH_CLUSTER_TOKEN")]
    cluster_token: Option<String>,

    /// Service account token file.
    #[arg(long, env = "BUILDWATCH_CLUSTER_TOKEN_FILE", default_value = DEFAULT_TOKEN_FILE)]
    cluster_token_file: PathBuf,

    /// Do not check TLS certificates of the analysis service or the
    /// cluster API.
    #[arg(short = 'T', long, env = "BUILDWATCH_NO_TLS_VERIFY")]
    no_tls_verify: bool,

    /// Do not check registry TLS certificates when copying images or when
    /// the analysis service pulls them.
    #[arg(short = 'R', long, env = "BUILDWATCH_NO_REGISTRY_TLS_VERIFY")]
    no_registry_tls_verify: bool,

    /// Use the cluster token as the registry password (disjoint with
    /// --registry-password).
    #[arg(short = 'p', long, env = "BUILDWATCH_PASS_TOKEN")]
    pass_token: bool,

    /// Registry user for analysis-side pulls and push-registry copies.
    #[arg(short = 'u', long, env = "BUILDWATCH_REGISTRY_USER")]
    registry_user: Option<String>,

    /// Registry password.
    #[arg(long, env = "BUILDWATCH_REGISTRY_PASSWORD")]
    registry_password: Option<String>,

    /// Copy images into this registry before submission and submit the
    /// copy instead of the original.
    #[arg(short = 'r', long, env = "BUILDWATCH_PUSH_REGISTRY")]
    push_registry: Option<String>,

    /// Also submit images already built in the namespace's image streams.
    #[arg(long, env = "BUILDWATCH_ANALYZE_EXISTING")]
    analyze_existing: bool,

    /// Number of submission workers.
    #[arg(long, env = "BUILDWATCH_WORKERS", default_value_t = 1)]
    workers: usize,

    /// Supervisor liveness poll interval in seconds.
    #[arg(long, env = "BUILDWATCH_LIVENESS_INTERVAL", default_value_t = 5)]
    liveness_interval: u64,

    /// Be verbose about what is going on.
    #[arg(short = 'v', long, env = "BUILDWATCH_VERBOSE")]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Config {
        Config {
            namespace: self.namespace,
            cluster: ClusterConfig {
                url: self.cluster_url,
                token: self.cluster_token,
                token_file: self.cluster_token_file,
                verify_tls: !self.no_tls_verify,
            },
            analysis: AnalysisConfig {
                api_host: self.api_host,
                verify_tls: !self.no_tls_verify,
            },
            registry: RegistryConfig {
                user: self.registry_user,
                password: self.registry_password,
                pass_token: self.pass_token,
                push_registry: self.push_registry,
                src_verify_tls: !self.no_registry_tls_verify,
                dst_verify_tls: !self.no_registry_tls_verify,
            },
            pipeline: PipelineConfig {
                workers: self.workers,
                analyze_existing: self.analyze_existing,
                liveness_interval: Duration::from_secs(self.liveness_interval),
            },
        }
    }
}

// ── main ────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

#[tokio::main]
async fn main() {
    load_dotenv();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if let Err(e) = run(cli).await {
        error!(error = %e, "build watcher terminated");
    }

    // Designed to run forever: reaching this point means the pipeline is
    // gone, and the exit status tells the process manager to restart us.
    std::process::exit(1);
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = cli.into_config();
    config.validate().context("invalid configuration")?;

    info!(
        namespace = %config.namespace,
        api_host = %config.analysis.api_host,
        "build watcher is watching the namespace and submitting resulting images for analysis"
    );

    let cluster = ClusterClient::new(&config.cluster).context("building cluster client")?;

    // Validated above: pass_token excludes an explicit password.
    if config.registry.pass_token {
        config.registry.password = Some(cluster.token().to_string());
    }

    let relocator = config.registry.push_registry.as_ref().map(|push_registry| {
        Arc::new(SkopeoRelocator::new(push_registry.clone(), &config.registry))
            as Arc<dyn ImageRelocator>
    });
    let submitter = Arc::new(
        AnalysisClient::new(&config.analysis, &config.registry)
            .context("building analysis client")?,
    );

    let cluster = Arc::new(cluster);
    let collaborators = Collaborators {
        lister: cluster.clone(),
        events: cluster,
        relocator,
        submitter,
    };

    Err(Pipeline::new(Arc::new(config), collaborators).run().await)
}
