// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build engine adapters
//!
//! A [`BuildEngine`] accepts one solve request per call and reports progress
//! on a status channel while it runs. When the request exports to a local
//! tarball, the image bytes are streamed into a [`PipeWriter`].
//!
//! Contract for implementations:
//! - every failure path closes the output writer with the error
//! - the status sender is dropped when `solve` returns
//! - `solve` returns [`EngineError::Cancelled`] promptly once `cancel` fires

mod buildctl;

pub use buildctl::BuildctlEngine;

#[cfg(any(test, feature = "test-support"))]
mod fake;
#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeBuildEngine, SolveCall};

use crate::pipe::{PipeError, PipeWriter};
use async_trait::async_trait;
use kiln_core::SolveStatus;
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Errors from build engine operations
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("cannot reach build engine at {addr}: {source}")]
    Connect { addr: String, source: std::io::Error },
    #[error("unsupported build engine address: {0}")]
    Address(String),
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("{0}")]
    Build(String),
    #[error("image stream aborted: {0}")]
    Output(PipeError),
    #[error("build engine i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("build cancelled")]
    Cancelled,
}

/// Where the built image goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Export {
    /// Push straight to a registry
    Registry { image: String, insecure: bool },
    /// Stream a docker-format tarball into the output pipe
    Tarball { image: String },
}

impl Export {
    pub fn image(&self) -> &str {
        match self {
            Export::Registry { image, .. } | Export::Tarball { image } => image,
        }
    }

    pub fn streams_output(&self) -> bool {
        matches!(self, Export::Tarball { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolveRequest {
    /// Build context directory
    pub context_dir: PathBuf,
    /// Dockerfile name relative to `context_dir`
    pub dockerfile: String,
    pub build_args: BTreeMap<String, String>,
    pub export: Export,
}

/// Result of a successful solve.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SolveResponse {
    /// Exporter metadata such as the image digest
    pub exporter_response: BTreeMap<String, String>,
}

/// Adapter for the remote image build service
#[async_trait]
pub trait BuildEngine: Clone + Send + Sync + 'static {
    /// Check that the engine's control address is reachable.
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), EngineError>;

    /// Run one build to completion.
    ///
    /// `output` is present exactly when the export is [`Export::Tarball`].
    async fn solve(
        &self,
        request: SolveRequest,
        output: Option<PipeWriter>,
        status: mpsc::Sender<SolveStatus>,
        cancel: CancellationToken,
    ) -> Result<SolveResponse, EngineError>;
}
