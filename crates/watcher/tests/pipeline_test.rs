//! End-to-end pipeline tests against in-memory collaborators.
//!
//! These exercise the full producer → queue → worker → supervisor wiring
//! with fakes behind the collaborator traits: no cluster, no registry, no
//! analysis service.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::time::timeout;

use buildwatch::pipeline::{Collaborators, Pipeline};
use buildwatch_cluster::types::{
    Build, BuildStatus, ImageStream, ImageStreamStatus, NamedTagEvents, ObjectMeta,
};
use buildwatch_cluster::{
    BuildEventSource, BuildPhase, BuildStream, ClusterError, ImageStreamLister,
};
use buildwatch_core::config::{
    AnalysisConfig, ClusterConfig, PipelineConfig, RegistryConfig,
};
use buildwatch_core::{Config, ImageReference};
use buildwatch_submit::{AnalysisId, AnalysisSubmitter, ImageRelocator, SubmitError};

const TIMEOUT: Duration = Duration::from_secs(5);
const SETTLE: Duration = Duration::from_millis(200);
const POLL: Duration = Duration::from_millis(10);

// ── Fakes ───────────────────────────────────────────────────────────

struct StaticStreams(Vec<ImageStream>);

#[async_trait]
impl ImageStreamLister for StaticStreams {
    async fn list_image_streams(
        &self,
        _namespace: &str,
    ) -> Result<Vec<ImageStream>, ClusterError> {
        Ok(self.0.clone())
    }
}

/// Yields the given builds, then keeps the watch open forever.
struct StaticEvents(Vec<Build>);

#[async_trait]
impl BuildEventSource for StaticEvents {
    async fn watch_builds(&self, _namespace: &str) -> Result<BuildStream, ClusterError> {
        let items: Vec<Result<Build, ClusterError>> = self.0.iter().cloned().map(Ok).collect();
        Ok(Box::pin(futures::stream::iter(items).chain(futures::stream::pending())))
    }
}

/// Records every submission; optionally fails for one specific reference.
#[derive(Default)]
struct RecordingSubmitter {
    submitted: Mutex<Vec<ImageReference>>,
    fail_on: Option<String>,
}

impl RecordingSubmitter {
    fn failing_on(reference: &str) -> Self {
        Self {
            submitted: Mutex::new(Vec::new()),
            fail_on: Some(reference.to_string()),
        }
    }

    async fn snapshot(&self) -> Vec<ImageReference> {
        self.submitted.lock().await.clone()
    }

    async fn wait_for(&self, count: usize) -> Vec<ImageReference> {
        let deadline = tokio::time::Instant::now() + TIMEOUT;
        loop {
            let submitted = self.snapshot().await;
            if submitted.len() >= count {
                return submitted;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {count} submissions, have {}",
                submitted.len()
            );
            tokio::time::sleep(POLL).await;
        }
    }
}

#[async_trait]
impl AnalysisSubmitter for RecordingSubmitter {
    async fn submit(&self, image: &ImageReference) -> Result<AnalysisId, SubmitError> {
        self.submitted.lock().await.push(image.clone());
        if self.fail_on.as_deref() == Some(image.as_str()) {
            return Err(SubmitError::Connection("synthetic failure".into()));
        }
        Ok(AnalysisId::new(format!("analysis-{}", image.basename())))
    }
}

/// A submitter whose first call kills the worker that made it.
struct PanickingSubmitter;

#[async_trait]
impl AnalysisSubmitter for PanickingSubmitter {
    async fn submit(&self, _image: &ImageReference) -> Result<AnalysisId, SubmitError> {
        panic!("submitter blew up");
    }
}

/// In-memory stand-in for the skopeo copy.
struct PrefixRelocator {
    push_registry: String,
}

#[async_trait]
impl ImageRelocator for PrefixRelocator {
    async fn relocate(&self, image: &ImageReference) -> Result<ImageReference, SubmitError> {
        Ok(image.relocated(&self.push_registry))
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

fn complete_build(name: &str, output: &str) -> Build {
    build_with_phase(name, BuildPhase::Complete, Some(output))
}

fn build_with_phase(name: &str, phase: BuildPhase, output: Option<&str>) -> Build {
    Build {
        metadata: ObjectMeta { name: name.into() },
        status: BuildStatus {
            phase,
            output_docker_image_reference: output.map(Into::into),
        },
    }
}

fn test_config(workers: usize, analyze_existing: bool) -> Arc<Config> {
    Arc::new(Config {
        namespace: "apps".into(),
        cluster: ClusterConfig {
            url: "https://cluster.test".into(),
            token: Some("test-token".into()),
            token_file: PathBuf::from("/nonexistent"),
            verify_tls: true,
        },
        analysis: AnalysisConfig {
            api_host: "analysis.test".into(),
            verify_tls: true,
        },
        registry: RegistryConfig {
            user: None,
            password: None,
            pass_token: false,
            push_registry: None,
            src_verify_tls: true,
            dst_verify_tls: true,
        },
        pipeline: PipelineConfig {
            workers,
            analyze_existing,
            liveness_interval: Duration::from_millis(50),
        },
    })
}

fn spawn_pipeline(
    config: Arc<Config>,
    events: Vec<Build>,
    streams: Vec<ImageStream>,
    relocator: Option<Arc<dyn ImageRelocator>>,
    submitter: Arc<dyn AnalysisSubmitter>,
) -> tokio::task::JoinHandle<anyhow::Error> {
    let pipeline = Pipeline::new(
        config,
        Collaborators {
            lister: Arc::new(StaticStreams(streams)),
            events: Arc::new(StaticEvents(events)),
            relocator,
            submitter,
        },
    );
    tokio::spawn(pipeline.run())
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn every_discovered_image_is_submitted_exactly_once() {
    let total = 20;
    let builds: Vec<Build> = (0..total)
        .map(|i| complete_build(&format!("b-{i}"), &format!("registry.svc/apps/img{i}:v1")))
        .collect();
    let submitter = Arc::new(RecordingSubmitter::default());

    spawn_pipeline(test_config(3, false), builds, vec![], None, submitter.clone());

    let submitted = submitter.wait_for(total).await;
    let distinct: HashSet<String> = submitted
        .iter()
        .map(|r| r.as_str().to_string())
        .collect();
    assert_eq!(distinct.len(), total);

    // No duplicates trickle in afterwards.
    tokio::time::sleep(SETTLE).await;
    assert_eq!(submitter.snapshot().await.len(), total);
}

#[tokio::test]
async fn one_failed_submission_does_not_block_later_items() {
    let builds = vec![
        complete_build("b-1", "registry.svc/apps/bad:v1"),
        complete_build("b-2", "registry.svc/apps/good:v1"),
    ];
    let submitter = Arc::new(RecordingSubmitter::failing_on("registry.svc/apps/bad:v1"));

    // A single worker, so the failing item is handled before the good one.
    spawn_pipeline(test_config(1, false), builds, vec![], None, submitter.clone());

    let submitted = submitter.wait_for(2).await;
    assert_eq!(submitted[0].as_str(), "registry.svc/apps/bad:v1");
    assert_eq!(submitted[1].as_str(), "registry.svc/apps/good:v1");
}

#[tokio::test]
async fn push_registry_changes_the_submitted_reference() {
    let builds = vec![complete_build("b-1", "registry.internal/apps/web:v5")];
    let submitter = Arc::new(RecordingSubmitter::default());
    let relocator = Arc::new(PrefixRelocator {
        push_registry: "quay.example.com/mirror".into(),
    });

    spawn_pipeline(
        test_config(1, false),
        builds,
        vec![],
        Some(relocator),
        submitter.clone(),
    );

    let submitted = submitter.wait_for(1).await;
    assert_eq!(submitted[0].as_str(), "quay.example.com/mirror/web:v5");
}

#[tokio::test]
async fn without_push_registry_the_original_reference_is_submitted() {
    let builds = vec![complete_build("b-1", "registry.internal/apps/web:v5")];
    let submitter = Arc::new(RecordingSubmitter::default());

    spawn_pipeline(test_config(1, false), builds, vec![], None, submitter.clone());

    let submitted = submitter.wait_for(1).await;
    assert_eq!(submitted[0].as_str(), "registry.internal/apps/web:v5");
}

#[tokio::test]
async fn non_complete_builds_never_reach_the_queue() {
    let builds = vec![
        build_with_phase("b-1", BuildPhase::New, Some("r/a:1")),
        build_with_phase("b-2", BuildPhase::Running, Some("r/b:1")),
        build_with_phase("b-3", BuildPhase::Failed, Some("r/c:1")),
        build_with_phase("b-4", BuildPhase::Cancelled, Some("r/d:1")),
    ];
    let submitter = Arc::new(RecordingSubmitter::default());

    spawn_pipeline(test_config(2, false), builds, vec![], None, submitter.clone());

    tokio::time::sleep(SETTLE).await;
    assert!(submitter.snapshot().await.is_empty());
}

#[tokio::test]
async fn existing_images_are_backfilled_alongside_events() {
    let streams = vec![ImageStream {
        metadata: ObjectMeta { name: "web".into() },
        status: ImageStreamStatus {
            docker_image_repository: "registry.svc/apps/web".into(),
            tags: vec![
                NamedTagEvents { tag: "latest".into() },
                NamedTagEvents { tag: "v2".into() },
            ],
        },
    }];
    let builds = vec![complete_build("b-1", "registry.svc/apps/api:v1")];
    let submitter = Arc::new(RecordingSubmitter::default());

    spawn_pipeline(test_config(2, true), builds, streams, None, submitter.clone());

    let submitted = submitter.wait_for(3).await;
    let seen: HashSet<String> = submitted.iter().map(|r| r.as_str().to_string()).collect();
    assert!(seen.contains("registry.svc/apps/web:latest"));
    assert!(seen.contains("registry.svc/apps/web:v2"));
    assert!(seen.contains("registry.svc/apps/api:v1"));
}

#[tokio::test]
async fn a_dead_worker_tears_down_the_whole_pipeline() {
    let builds = vec![complete_build("b-1", "r/a:1")];

    let pipeline = Pipeline::new(
        test_config(3, false),
        Collaborators {
            lister: Arc::new(StaticStreams(vec![])),
            events: Arc::new(StaticEvents(builds)),
            relocator: None,
            submitter: Arc::new(PanickingSubmitter),
        },
    );

    // Only one worker picks up the poisoned item; its siblings stay idle
    // and alive. The supervisor must still fail the pipeline.
    let err = timeout(TIMEOUT, pipeline.run())
        .await
        .expect("supervisor did not detect the dead worker");
    assert!(err.to_string().contains("worker"));
}
