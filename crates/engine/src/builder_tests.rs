// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::interface::recording::{Call, RecordingInterface};
use chrono::Utc;
use kiln_adapters::{FakeBuildEngine, FakeImageLoader};
use kiln_core::{FakeClock, Vertex, VertexStatus, PUSHING_LAYERS};
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

const TAG: &str = "abc123";

struct Harness {
    _dir: TempDir,
    logger: Arc<FileLogger<FakeClock>>,
    iface: Arc<RecordingInterface>,
    engine: FakeBuildEngine,
    loader: FakeImageLoader,
}

impl Harness {
    fn new(engine: FakeBuildEngine, loader: FakeImageLoader) -> Self {
        let dir = TempDir::new().unwrap();
        let logger = Arc::new(FileLogger::with_clock(dir.path().join("logs"), FakeClock::new()));
        Self { _dir: dir, logger, iface: Arc::new(RecordingInterface::default()), engine, loader }
    }

    fn builder(
        &self,
        settings: BuildSettings,
    ) -> Builder<FakeBuildEngine, FakeImageLoader, FakeClock> {
        let iface: Arc<dyn Interface> = self.iface.clone();
        Builder::new(
            self.engine.clone(),
            self.loader.clone(),
            Arc::clone(&self.logger),
            iface,
            settings,
        )
    }

    /// Log file lines without their timestamps.
    fn log(&self, service: &str) -> Vec<String> {
        let content = std::fs::read_to_string(self.logger.log_path(service)).unwrap_or_default();
        content
            .lines()
            .map(|line| line.split_once("] ").map(|(_, text)| text.to_string()).unwrap_or_default())
            .collect()
    }
}

fn service(name: &str) -> BuildableService {
    BuildableService::new(format!("/repo/{name}"), "Dockerfile", name)
}

fn start(service: &str, image: &str) -> Call {
    Call::Start { service: service.to_string(), image: image.to_string() }
}

#[parameterized(
    no_registry = { None, "api:abc123" },
    registry = { Some("localhost:5000"), "localhost:5000/api:abc123" },
)]
fn image_names(registry: Option<&str>, expected: &str) {
    let mut settings = BuildSettings::new(TAG);
    if let Some(registry) = registry {
        settings = settings.registry(registry);
    }
    assert_eq!(settings.image_name("api"), expected);
}

#[tokio::test]
async fn successful_build_loads_the_image_and_reports_once() {
    let h = Harness::new(
        FakeBuildEngine::new()
            .with_tarball(b"tarball".to_vec())
            .with_exporter_response("containerimage.digest", "sha256:feed"),
        FakeImageLoader::new(),
    );
    let builder = h.builder(BuildSettings::new(TAG));

    builder.build_service(&CancellationToken::new(), &service("api")).await.unwrap();

    assert_eq!(
        h.iface.transitions("api"),
        vec![start("api", "api:abc123"), Call::Succeed("api".into())]
    );
    assert_eq!(h.loader.loaded(), vec![b"tarball".to_vec()]);
    let calls = h.engine.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].had_output);
    assert_eq!(calls[0].request.export, Export::Tarball { image: "api:abc123".into() });
    assert_eq!(calls[0].request.dockerfile, "Dockerfile");

    let log = h.log("api");
    assert_eq!(log.first().map(String::as_str), Some("Starting build of /repo/api"));
    assert!(log.contains(&"exporter: containerimage.digest=sha256:feed".to_string()));
    assert!(log.contains(&"Loaded image".to_string()));
    assert_eq!(log.last().map(String::as_str), Some("Build succeeded!"));
}

#[tokio::test]
async fn engine_failure_is_logged_and_reported() {
    let h = Harness::new(
        FakeBuildEngine::new().fail_image("worker:abc123", "process did not complete successfully"),
        FakeImageLoader::new(),
    );
    let builder = h.builder(BuildSettings::new(TAG));

    let err =
        builder.build_service(&CancellationToken::new(), &service("worker")).await.unwrap_err();

    assert!(matches!(err, BuildError::Engine(EngineError::Build(_))));
    assert_eq!(
        h.iface.transitions("worker"),
        vec![
            start("worker", "worker:abc123"),
            Call::Fail {
                service: "worker".into(),
                error: "process did not complete successfully".into()
            },
        ]
    );
    let log = h.log("worker");
    assert!(log.contains(&"FAILED: process did not complete successfully".to_string()));
    assert_eq!(
        log.last().map(String::as_str),
        Some("Build failed! process did not complete successfully")
    );
    assert!(h.loader.loaded().is_empty());
}

#[tokio::test]
async fn loader_failure_wins_over_the_aborted_stream() {
    let h = Harness::new(
        FakeBuildEngine::new().with_tarball(b"tarball".to_vec()),
        FakeImageLoader::new().failing("no space left on device"),
    );
    let builder = h.builder(BuildSettings::new(TAG));

    let err = builder.build_service(&CancellationToken::new(), &service("api")).await.unwrap_err();

    assert!(matches!(err, BuildError::Load(LoadError::Failed { .. })), "got {err:?}");
    let transitions = h.iface.transitions("api");
    assert_eq!(transitions.len(), 2);
    assert!(matches!(
        &transitions[1],
        Call::Fail { error, .. } if error.contains("no space left on device")
    ));
}

#[tokio::test]
async fn unreachable_engine_fails_before_submitting() {
    let engine = FakeBuildEngine::new().unreachable("connection refused");
    let h = Harness::new(engine, FakeImageLoader::new());
    let builder = h.builder(BuildSettings::new(TAG));

    let err = builder.build_service(&CancellationToken::new(), &service("api")).await.unwrap_err();

    assert!(matches!(err, BuildError::Engine(EngineError::Connect { .. })));
    assert!(h.engine.calls().is_empty());
    let log = h.log("api");
    assert!(log[0].starts_with("Could not connect to build daemon!"), "log: {log:?}");
    assert_eq!(h.iface.transitions("api").iter().filter(|c| c.is_terminal()).count(), 1);
}

#[tokio::test]
async fn push_exports_to_the_registry_and_marks_pushing_once() {
    let pushing = SolveStatus {
        statuses: vec![VertexStatus::new(PUSHING_LAYERS, 0, 0, Utc::now())],
        ..SolveStatus::default()
    };
    let h = Harness::new(
        FakeBuildEngine::new().with_statuses(vec![pushing.clone(), pushing]),
        FakeImageLoader::new(),
    );
    let settings =
        BuildSettings::new(TAG).registry("localhost:5000").registry_insecure(true).push(true);
    let builder = h.builder(settings);

    builder.build_service(&CancellationToken::new(), &service("api")).await.unwrap();

    assert_eq!(
        h.iface.transitions("api"),
        vec![
            start("api", "localhost:5000/api:abc123"),
            Call::Pushing("api".into()),
            Call::Succeed("api".into()),
        ]
    );
    let calls = h.engine.calls();
    assert!(!calls[0].had_output);
    assert_eq!(
        calls[0].request.export,
        Export::Registry { image: "localhost:5000/api:abc123".into(), insecure: true }
    );
    assert!(h.loader.loaded().is_empty());
}

#[tokio::test]
async fn build_args_and_progress_reach_the_engine_and_the_log() {
    let step = SolveStatus {
        vertexes: vec![Vertex {
            digest: "sha256:1".into(),
            name: "[1/2] FROM alpine".into(),
            ..Vertex::default()
        }],
        ..SolveStatus::default()
    };
    let h = Harness::new(FakeBuildEngine::new().with_statuses(vec![step]), FakeImageLoader::new());
    let args = BTreeMap::from([("KILN_ENV".to_string(), "dev".to_string())]);
    let builder = h.builder(BuildSettings::new(TAG).build_args(args.clone()));

    builder.build_service(&CancellationToken::new(), &service("api")).await.unwrap();

    assert_eq!(h.engine.calls()[0].request.build_args, args);
    assert!(h.log("api").contains(&"[1/2] FROM alpine".to_string()));
}

#[tokio::test]
async fn cancellation_is_silent() {
    let h = Harness::new(FakeBuildEngine::new().hang(), FakeImageLoader::new());
    let builder = h.builder(BuildSettings::new(TAG));
    let token = CancellationToken::new();

    let handle = {
        let token = token.clone();
        tokio::spawn(async move { builder.build_service(&token, &service("api")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    token.cancel();
    let result = tokio::time::timeout(Duration::from_secs(5), handle).await.unwrap().unwrap();

    assert!(result.unwrap_err().is_cancelled());
    assert_eq!(h.iface.transitions("api"), vec![start("api", "api:abc123")]);
    assert_eq!(h.engine.cancelled(), vec!["api:abc123".to_string()]);
    assert!(!h.log("api").iter().any(|line| line.contains("Build failed")));
}
