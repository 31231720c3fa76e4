// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::builder::BuildSettings;
use crate::interface::recording::{Call, RecordingInterface};
use crate::interface::{Interface, PlaintextInterface};
use crate::logger::FileLogger;
use kiln_adapters::{FakeBuildEngine, FakeImageLoader};
use kiln_core::FakeClock;
use parking_lot::Mutex;
use std::io::Write;
use std::time::Duration;
use tempfile::TempDir;

struct Harness {
    dir: TempDir,
    iface: Arc<RecordingInterface>,
    engine: FakeBuildEngine,
    loader: FakeImageLoader,
}

impl Harness {
    fn new(engine: FakeBuildEngine) -> Self {
        Self {
            dir: TempDir::new().unwrap(),
            iface: Arc::new(RecordingInterface::default()),
            engine,
            loader: FakeImageLoader::new(),
        }
    }

    fn campaign(&self) -> Campaign<FakeBuildEngine, FakeImageLoader, FakeClock> {
        self.campaign_on(self.iface.clone())
    }

    fn campaign_on(
        &self,
        iface: Arc<dyn Interface>,
    ) -> Campaign<FakeBuildEngine, FakeImageLoader, FakeClock> {
        let logs = self.dir.path().join("logs");
        let logger = Arc::new(FileLogger::with_clock(logs, FakeClock::new()));
        let builder = Builder::new(
            self.engine.clone(),
            self.loader.clone(),
            logger,
            iface,
            BuildSettings::new("t"),
        );
        Campaign::new(builder)
    }

    fn terminal(&self, service: &str) -> Vec<Call> {
        self.iface.transitions(service).into_iter().filter(Call::is_terminal).collect()
    }
}

#[derive(Clone, Default)]
struct SharedOutput(Arc<Mutex<Vec<u8>>>);

impl Write for SharedOutput {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn services(names: &[&str]) -> Vec<BuildableService> {
    names
        .iter()
        .map(|name| BuildableService::new(format!("/repo/{name}"), "Dockerfile", *name))
        .collect()
}

#[tokio::test]
async fn every_service_builds_once() {
    let h = Harness::new(FakeBuildEngine::new().with_tarball(b"tar".to_vec()));
    let outcome = h.campaign().run(services(&["api", "worker"])).await.unwrap();

    assert_eq!(outcome, CampaignOutcome::Succeeded);
    for name in ["api", "worker"] {
        let transitions = h.iface.transitions(name);
        assert!(matches!(&transitions[0], Call::Start { .. }), "{name}: {transitions:?}");
        assert_eq!(h.terminal(name), vec![Call::Succeed(name.to_string())]);
    }
    assert_eq!(h.engine.calls().len(), 2);
}

#[tokio::test]
async fn logged_lines_reach_the_interface() {
    let h = Harness::new(FakeBuildEngine::new());
    h.campaign().run(services(&["api"])).await.unwrap();

    let lines = h.iface.lines("api");
    assert_eq!(lines.first().map(String::as_str), Some("Starting build of /repo/api"));
    assert_eq!(lines.last().map(String::as_str), Some("Build succeeded!"));
}

#[tokio::test]
async fn first_failure_cancels_the_other_jobs() {
    let h = Harness::new(FakeBuildEngine::new().fail_image("worker:t", "boom").hang_image("api:t"));
    let campaign = h.campaign();
    let run = campaign.run(services(&["api", "worker"]));
    let outcome = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();

    assert_eq!(outcome, CampaignOutcome::Failed(1));
    assert!(h.terminal("api").is_empty(), "cancelled jobs are not reported");
    assert!(matches!(&h.terminal("worker")[..], [Call::Fail { .. }]));
    assert_eq!(h.engine.cancelled(), vec!["api:t".to_string()]);
}

#[tokio::test]
async fn keep_going_lets_other_jobs_finish() {
    let h = Harness::new(FakeBuildEngine::new().fail_image("worker:t", "boom"));
    let campaign = h.campaign().keep_going(true);
    let outcome = campaign.run(services(&["api", "web", "worker"])).await.unwrap();

    assert_eq!(outcome, CampaignOutcome::Failed(1));
    assert_eq!(h.terminal("api"), vec![Call::Succeed("api".into())]);
    assert_eq!(h.terminal("web"), vec![Call::Succeed("web".into())]);
    assert!(h.engine.cancelled().is_empty());
}

#[tokio::test]
async fn user_cancel_is_not_a_failure() {
    let h = Harness::new(FakeBuildEngine::new().hang());
    let campaign = h.campaign();
    let run = campaign.run(services(&["api", "web", "worker"]));
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        h.iface.cancel();
    };

    // the runner waits for every leg, so returning in time means the status legs stopped too
    let both = async { tokio::join!(run, cancel) };
    let (outcome, ()) = tokio::time::timeout(Duration::from_secs(5), both).await.unwrap();

    assert_eq!(outcome.unwrap(), CampaignOutcome::Cancelled);
    for name in ["api", "web", "worker"] {
        assert!(h.terminal(name).is_empty());
    }
    let mut cancelled = h.engine.cancelled();
    cancelled.sort();
    assert_eq!(cancelled, vec!["api:t", "web:t", "worker:t"]);
    assert_eq!(h.loader.cancelled(), 3, "every transfer leg observes the cancel");
    assert!(h.loader.loaded().is_empty());
}

#[tokio::test]
async fn plaintext_run_reports_one_success_summary() {
    let h = Harness::new(FakeBuildEngine::new().with_tarball(b"tar".to_vec()));
    let out = SharedOutput::default();
    let iface = Arc::new(PlaintextInterface::with_output(Box::new(out.clone()), FakeClock::new()));

    let outcome = h.campaign_on(iface.clone()).run(services(&["worker", "api"])).await.unwrap();
    iface.close().unwrap();

    assert_eq!(outcome, CampaignOutcome::Succeeded);
    let text = String::from_utf8_lossy(&out.0.lock()).into_owned();
    let summaries: Vec<_> = text.lines().filter(|l| l.starts_with("Successfully built")).collect();
    assert_eq!(summaries, vec!["Successfully built: api, worker"]);
    assert!(!text.contains("FAILED"), "{text}");
    assert!(!text.contains("Failed to build"), "{text}");
    assert_eq!(h.loader.loaded().len(), 2);
}

#[tokio::test]
async fn duplicate_names_fail_before_any_build() {
    let h = Harness::new(FakeBuildEngine::new());
    let mut list = services(&["api"]);
    list.push(BuildableService::new("/other/api", "Dockerfile", "api"));

    let err = h.campaign().run(list).await.unwrap_err();

    assert!(matches!(err, DiscoveryError::Duplicate { .. }));
    assert!(h.iface.calls().is_empty());
    assert!(h.engine.calls().is_empty());
}

#[test]
fn outcomes_display_lowercase() {
    assert_eq!(CampaignOutcome::Failed(2).to_string(), "failed");
    assert_eq!(CampaignOutcome::Cancelled.to_string(), "cancelled");
}
