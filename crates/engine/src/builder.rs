// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build orchestration for one service.
//!
//! A build runs as three legs under [`run_parallel`]:
//!
//! - engine: probe the build engine, submit the solve, log exporter metadata
//! - transfer: feed the image stream into the local loader (tarball exports only)
//! - status: forward progress batches to the [`FileLogger`]
//!
//! The engine and transfer legs share a [`pipe`](kiln_adapters::pipe). Whichever
//! side fails first closes its end with the error, so its partner unblocks with
//! a stream error. That stream error is a consequence, not a cause, and is not
//! reported as the job's failure.

use crate::error::BuildError;
use crate::interface::Interface;
use crate::logger::FileLogger;
use crate::runner::{run_parallel, task, Task};
use kiln_adapters::{
    pipe, BuildEngine, EngineError, Export, ImageLoader, LoadError, PipeReader, PipeWriter,
    SolveRequest,
};
use kiln_core::{BuildJob, BuildableService, Clock, JobState, SolveStatus, SystemClock};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Status batches buffered between the engine and the status leg
const STATUS_BUFFER: usize = 16;

/// Campaign-wide build settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSettings {
    pub build_tag: String,
    /// Registry host, e.g. `localhost:5000`
    pub registry: Option<String>,
    /// Talk plain HTTP to the registry
    pub registry_insecure: bool,
    /// Push to the registry instead of loading locally
    pub push: bool,
    pub build_args: BTreeMap<String, String>,
}

impl BuildSettings {
    pub fn new(build_tag: impl Into<String>) -> Self {
        Self { build_tag: build_tag.into(), ..Self::default() }
    }

    kiln_core::setters! {
        set {
            registry_insecure: bool,
            push: bool,
            build_args: BTreeMap<String, String>,
        }
        option {
            registry: String,
        }
    }

    /// `registry/service:tag`, or `service:tag` without a registry.
    pub fn image_name(&self, service: &str) -> String {
        match &self.registry {
            Some(registry) => format!("{registry}/{service}:{}", self.build_tag),
            None => format!("{service}:{}", self.build_tag),
        }
    }

    fn export(&self, image: &str) -> Export {
        if self.push {
            Export::Registry { image: image.to_string(), insecure: self.registry_insecure }
        } else {
            Export::Tarball { image: image.to_string() }
        }
    }
}

/// Builds services against one engine, loader, logger, and interface.
pub struct Builder<E, L, C: Clock = SystemClock> {
    engine: E,
    loader: L,
    logger: Arc<FileLogger<C>>,
    interface: Arc<dyn Interface>,
    settings: Arc<BuildSettings>,
}

impl<E: Clone, L: Clone, C: Clock> Clone for Builder<E, L, C> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            loader: self.loader.clone(),
            logger: Arc::clone(&self.logger),
            interface: Arc::clone(&self.interface),
            settings: Arc::clone(&self.settings),
        }
    }
}

impl<E, L, C> Builder<E, L, C>
where
    E: BuildEngine,
    L: ImageLoader,
    C: Clock,
{
    pub fn new(
        engine: E,
        loader: L,
        logger: Arc<FileLogger<C>>,
        interface: Arc<dyn Interface>,
        settings: BuildSettings,
    ) -> Self {
        Self { engine, loader, logger, interface, settings: Arc::new(settings) }
    }

    pub fn settings(&self) -> &BuildSettings {
        &self.settings
    }

    pub(crate) fn interface(&self) -> &Arc<dyn Interface> {
        &self.interface
    }

    pub(crate) fn logger(&self) -> &FileLogger<C> {
        &self.logger
    }

    /// Build one service and report its outcome.
    ///
    /// Success and failure are reported to both the interface and the build
    /// log. Cancellation returns [`BuildError::Cancelled`] and reports nothing.
    pub async fn build_service(
        &self,
        cancel: &CancellationToken,
        service: &BuildableService,
    ) -> Result<(), BuildError> {
        let mut job = BuildJob::new(service.clone(), self.settings.image_name(&service.name));
        self.interface.start_job(job.name(), job.image());
        advance(&mut job, JobState::Building);

        let result = run_parallel(cancel, self.legs(&job)).await;
        let name = job.name().to_string();
        match &result {
            Ok(()) => {
                advance(&mut job, JobState::Succeeded);
                self.interface.succeed_job(&name);
                self.log(&name, "Build succeeded!");
            }
            Err(e) if e.is_cancelled() => {
                tracing::info!(service = %name, "build cancelled");
            }
            Err(e) => {
                advance(&mut job, JobState::Failed);
                self.interface.fail_job(&name, e);
                self.log(&name, &format!("Build failed! {e}"));
            }
        }
        result
    }

    fn legs(&self, job: &BuildJob) -> Vec<Task<BuildError>> {
        let service = job.service();
        let export = self.settings.export(job.image());
        let (writer, reader) = if export.streams_output() {
            let (writer, reader) = pipe();
            (Some(writer), Some(reader))
        } else {
            (None, None)
        };
        let request = SolveRequest {
            context_dir: service.dir.clone(),
            dockerfile: service.dockerfile.clone(),
            build_args: self.settings.build_args.clone(),
            export,
        };
        let (status_tx, status_rx) = mpsc::channel(STATUS_BUFFER);

        let mut legs = Vec::with_capacity(3);
        let this = self.clone();
        let name = service.name.clone();
        legs.push(task(move |token| async move {
            this.engine_leg(&name, request, writer, status_tx, token).await
        }));
        if let Some(reader) = reader {
            let this = self.clone();
            let name = service.name.clone();
            legs.push(task(move |token| async move {
                this.transfer_leg(&name, reader, token).await
            }));
        }
        let this = self.clone();
        let name = service.name.clone();
        legs.push(task(move |token| async move { this.status_leg(&name, status_rx, token).await }));
        legs
    }

    async fn engine_leg(
        &self,
        service: &str,
        request: SolveRequest,
        output: Option<PipeWriter>,
        status: mpsc::Sender<SolveStatus>,
        cancel: CancellationToken,
    ) -> Result<(), BuildError> {
        if let Err(e) = self.engine.connect(&cancel).await {
            if let Some(writer) = output {
                writer.close_with_error(e.to_string());
            }
            let err = BuildError::from(e);
            if !err.is_cancelled() {
                self.log(service, &format!("Could not connect to build daemon! {err}"));
            }
            return Err(err);
        }

        self.log(service, &format!("Starting build of {}", request.context_dir.display()));
        match self.engine.solve(request, output, status, cancel).await {
            Ok(response) => {
                for (key, value) in &response.exporter_response {
                    self.log(service, &format!("exporter: {key}={value}"));
                }
                Ok(())
            }
            Err(EngineError::Output(e)) => {
                tracing::debug!(service, error = %e, "image stream closed by the loader");
                Ok(())
            }
            Err(e) => {
                let err = BuildError::from(e);
                if !err.is_cancelled() {
                    self.log(service, &format!("FAILED: {err}"));
                }
                Err(err)
            }
        }
    }

    async fn transfer_leg(
        &self,
        service: &str,
        input: PipeReader,
        cancel: CancellationToken,
    ) -> Result<(), BuildError> {
        match self.loader.load(input, cancel).await {
            Ok(report) => {
                self.log(service, &report);
                Ok(())
            }
            Err(LoadError::Upstream(e)) => {
                tracing::debug!(service, error = %e, "image stream aborted by the engine");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn status_leg(
        &self,
        service: &str,
        mut status: mpsc::Receiver<SolveStatus>,
        cancel: CancellationToken,
    ) -> Result<(), BuildError> {
        let mut pushing = false;
        loop {
            let batch = tokio::select! {
                // drain what the engine already sent before honouring cancel
                biased;
                batch = status.recv() => batch,
                _ = cancel.cancelled() => return Err(BuildError::Cancelled),
            };
            let Some(batch) = batch else {
                return Ok(());
            };
            if !pushing && batch.reports_pushing() {
                pushing = true;
                self.interface.set_pushing(service);
            }
            if let Err(e) = self.logger.process_status(service, &batch) {
                tracing::warn!(service, error = %e, "failed to record build progress");
            }
        }
    }

    fn log(&self, service: &str, message: &str) {
        if let Err(e) = self.logger.log_now(service, message) {
            tracing::warn!(service, error = %e, "failed to write build log");
        }
    }
}

fn advance(job: &mut BuildJob, next: JobState) {
    if let Err(e) = job.advance(next) {
        tracing::warn!(error = %e, "unexpected job transition");
    }
}

#[cfg(test)]
#[path = "builder_tests.rs"]
mod tests;
