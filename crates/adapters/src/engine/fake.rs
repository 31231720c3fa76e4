// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scripted build engine for tests

use super::{BuildEngine, EngineError, SolveRequest, SolveResponse};
use crate::pipe::PipeWriter;
use async_trait::async_trait;
use kiln_core::SolveStatus;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Recorded solve call
#[derive(Debug, Clone)]
pub struct SolveCall {
    pub request: SolveRequest,
    pub had_output: bool,
}

#[derive(Default, Clone)]
struct Script {
    statuses: Vec<SolveStatus>,
    tarball: Vec<u8>,
    fail_with: Option<String>,
    hang: bool,
}

#[derive(Default)]
struct FakeEngineState {
    default_script: Script,
    /// Per-image overrides, keyed by image name
    scripts: HashMap<String, Script>,
    unreachable: Option<String>,
    exporter_response: BTreeMap<String, String>,
    calls: Vec<SolveCall>,
    cancelled: Vec<String>,
}

/// Fake build engine for testing
#[derive(Clone, Default)]
pub struct FakeBuildEngine {
    inner: Arc<Mutex<FakeEngineState>>,
}

impl FakeBuildEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status batches sent during every solve
    pub fn with_statuses(self, statuses: Vec<SolveStatus>) -> Self {
        self.inner.lock().default_script.statuses = statuses;
        self
    }

    /// Bytes written to the output stream on tarball exports
    pub fn with_tarball(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.inner.lock().default_script.tarball = bytes.into();
        self
    }

    pub fn with_exporter_response(self, key: &str, value: &str) -> Self {
        self.inner.lock().exporter_response.insert(key.to_string(), value.to_string());
        self
    }

    /// Make every `connect` fail with this message
    pub fn unreachable(self, message: &str) -> Self {
        self.inner.lock().unreachable = Some(message.to_string());
        self
    }

    /// Make the solve for `image` fail after sending its statuses
    pub fn fail_image(self, image: &str, message: &str) -> Self {
        self.script_for(image, |s| s.fail_with = Some(message.to_string()));
        self
    }

    /// Make the solve for `image` block until cancelled
    pub fn hang_image(self, image: &str) -> Self {
        self.script_for(image, |s| s.hang = true);
        self
    }

    /// Make every solve block until cancelled
    pub fn hang(self) -> Self {
        self.inner.lock().default_script.hang = true;
        self
    }

    fn script_for(&self, image: &str, edit: impl FnOnce(&mut Script)) {
        let mut state = self.inner.lock();
        let base = state.default_script.clone();
        edit(state.scripts.entry(image.to_string()).or_insert(base));
    }

    pub fn calls(&self) -> Vec<SolveCall> {
        self.inner.lock().calls.clone()
    }

    /// Images whose solve observed cancellation
    pub fn cancelled(&self) -> Vec<String> {
        self.inner.lock().cancelled.clone()
    }
}

#[async_trait]
impl BuildEngine for FakeBuildEngine {
    async fn connect(&self, _cancel: &CancellationToken) -> Result<(), EngineError> {
        match self.inner.lock().unreachable.clone() {
            Some(message) => Err(EngineError::Connect {
                addr: "fake".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::ConnectionRefused, message),
            }),
            None => Ok(()),
        }
    }

    async fn solve(
        &self,
        request: SolveRequest,
        output: Option<PipeWriter>,
        status: mpsc::Sender<SolveStatus>,
        cancel: CancellationToken,
    ) -> Result<SolveResponse, EngineError> {
        let image = request.export.image().to_string();
        let (script, exporter_response) = {
            let mut state = self.inner.lock();
            state.calls.push(SolveCall { request, had_output: output.is_some() });
            let script =
                state.scripts.get(&image).cloned().unwrap_or_else(|| state.default_script.clone());
            (script, state.exporter_response.clone())
        };

        for batch in script.statuses {
            if status.send(batch).await.is_err() {
                break;
            }
        }
        if script.hang {
            cancel.cancelled().await;
            self.inner.lock().cancelled.push(image);
            if let Some(writer) = output {
                writer.close_with_error("build cancelled");
            }
            return Err(EngineError::Cancelled);
        }
        if let Some(message) = script.fail_with {
            if let Some(writer) = output {
                writer.close_with_error(message.clone());
            }
            return Err(EngineError::Build(message));
        }
        if let Some(writer) = output {
            if !script.tarball.is_empty() {
                let written = tokio::select! {
                    result = writer.write(script.tarball) => result,
                    _ = cancel.cancelled() => {
                        writer.close_with_error("build cancelled");
                        return Err(EngineError::Cancelled);
                    }
                };
                if let Err(e) = written {
                    let err = EngineError::Output(e);
                    writer.close_with_error(err.to_string());
                    return Err(err);
                }
            }
            writer.close();
        }
        Ok(SolveResponse { exporter_response })
    }
}
