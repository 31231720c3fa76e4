// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build engine driven through the `buildctl` client.

use super::{BuildEngine, EngineError, Export, SolveRequest, SolveResponse};
use crate::pipe::PipeWriter;
use async_trait::async_trait;
use kiln_core::{RingBuffer, SolveStatus};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Non-progress stderr lines kept for the failure message
const STDERR_TAIL: usize = 20;
const CHUNK_SIZE: usize = 64 * 1024;

#[derive(Debug, Clone)]
pub struct BuildctlEngine {
    addr: String,
    program: String,
    program_args: Vec<String>,
}

enum Probe {
    Tcp(String),
    Unix(PathBuf),
    Skip,
}

impl BuildctlEngine {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into(), program: "buildctl".to_string(), program_args: Vec::new() }
    }

    /// Run `program args...` in place of `buildctl`; the build arguments follow.
    pub fn with_command(mut self, program: impl Into<String>, args: Vec<String>) -> Self {
        self.program = program.into();
        self.program_args = args;
        self
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    fn probe(&self) -> Result<Probe, EngineError> {
        let Some((scheme, rest)) = self.addr.split_once("://") else {
            return Err(EngineError::Address(self.addr.clone()));
        };
        Ok(match scheme {
            "tcp" => Probe::Tcp(rest.to_string()),
            "unix" => Probe::Unix(PathBuf::from(rest)),
            // docker-container://, kube-pod:// and friends are resolved by buildctl itself
            _ => Probe::Skip,
        })
    }

    pub(crate) fn command_args(&self, request: &SolveRequest, metadata: &Path) -> Vec<String> {
        let context = request.context_dir.display().to_string();
        let mut args = self.program_args.clone();
        args.extend([
            "--addr".to_string(),
            self.addr.clone(),
            "build".to_string(),
            "--frontend".to_string(),
            "dockerfile.v0".to_string(),
            "--local".to_string(),
            format!("context={context}"),
            "--local".to_string(),
            format!("dockerfile={context}"),
            "--opt".to_string(),
            format!("filename={}", request.dockerfile),
        ]);
        for (key, value) in &request.build_args {
            args.push("--opt".to_string());
            args.push(format!("build-arg:{key}={value}"));
        }
        args.extend([
            "--output".to_string(),
            export_spec(&request.export),
            "--progress".to_string(),
            "rawjson".to_string(),
            "--metadata-file".to_string(),
            metadata.display().to_string(),
        ]);
        args
    }
}

pub(crate) fn export_spec(export: &Export) -> String {
    match export {
        Export::Registry { image, insecure } => {
            format!("type=image,name={image},push=true,registry.insecure={insecure}")
        }
        Export::Tarball { image } => format!("type=docker,name={image}"),
    }
}

#[async_trait]
impl BuildEngine for BuildctlEngine {
    async fn connect(&self, cancel: &CancellationToken) -> Result<(), EngineError> {
        let probe = async {
            match self.probe()? {
                Probe::Tcp(host) => tokio::net::TcpStream::connect(host).await.map(drop),
                Probe::Unix(path) => tokio::net::UnixStream::connect(path).await.map(drop),
                Probe::Skip => {
                    tracing::debug!(addr = %self.addr, "no reachability probe for address");
                    Ok(())
                }
            }
            .map_err(|source| EngineError::Connect { addr: self.addr.clone(), source })
        };
        tokio::select! {
            result = probe => result,
            _ = cancel.cancelled() => Err(EngineError::Cancelled),
        }
    }

    async fn solve(
        &self,
        request: SolveRequest,
        output: Option<PipeWriter>,
        status: mpsc::Sender<SolveStatus>,
        cancel: CancellationToken,
    ) -> Result<SolveResponse, EngineError> {
        let metadata = match tempfile::Builder::new().prefix("kiln-metadata-").tempfile() {
            Ok(file) => file,
            Err(e) => return Err(abort(output, EngineError::Io(e))),
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(self.command_args(&request, metadata.path()))
            .stdin(Stdio::null())
            .stdout(if output.is_some() { Stdio::piped() } else { Stdio::null() })
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // keep terminal interrupts away from buildctl; cancellation goes through the token
        #[cfg(unix)]
        cmd.process_group(0);
        tracing::debug!(program = %self.program, image = request.export.image(), "starting solve");
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = EngineError::Spawn { program: self.program.clone(), source };
                return Err(abort(output, err));
            }
        };

        let mut progress = match child.stderr.take() {
            Some(stderr) => tokio::spawn(forward_progress(stderr, status)),
            None => tokio::spawn(async { Vec::new() }),
        };
        let stdout = child.stdout.take();

        let finished = tokio::select! {
            result = drive(&mut child, stdout, output.as_ref(), &mut progress) => Some(result),
            _ = cancel.cancelled() => None,
        };
        let result = match finished {
            Some(result) => result,
            None => {
                progress.abort();
                if let Err(e) = child.kill().await {
                    tracing::warn!(error = %e, "failed to kill buildctl");
                }
                Err(EngineError::Cancelled)
            }
        };

        match result {
            Ok(()) => {
                if let Some(writer) = output {
                    writer.close();
                }
                Ok(read_metadata(metadata.path()).await)
            }
            Err(e) => Err(abort(output, e)),
        }
    }
}

/// Close the output stream with `err` so the reading side stops waiting.
fn abort(output: Option<PipeWriter>, err: EngineError) -> EngineError {
    if let Some(writer) = output {
        writer.close_with_error(err.to_string());
    }
    err
}

async fn drive(
    child: &mut Child,
    stdout: Option<ChildStdout>,
    output: Option<&PipeWriter>,
    progress: &mut JoinHandle<Vec<String>>,
) -> Result<(), EngineError> {
    if let (Some(stdout), Some(writer)) = (stdout, output) {
        if let Err(e) = copy_output(stdout, writer).await {
            progress.abort();
            if let Err(kill) = child.kill().await {
                tracing::warn!(error = %kill, "failed to kill buildctl");
            }
            return Err(e);
        }
    }
    let exit = child.wait().await?;
    let tail = progress.await.unwrap_or_default();
    if exit.success() {
        Ok(())
    } else {
        Err(EngineError::Build(failure_message(&tail, exit)))
    }
}

async fn copy_output(mut stdout: ChildStdout, writer: &PipeWriter) -> Result<(), EngineError> {
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = stdout.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        writer.write(buf[..n].to_vec()).await.map_err(EngineError::Output)?;
    }
}

/// Forward progress lines as status batches; returns the tail of everything else.
async fn forward_progress(stderr: ChildStderr, status: mpsc::Sender<SolveStatus>) -> Vec<String> {
    let mut lines = BufReader::new(stderr).lines();
    let mut tail = RingBuffer::new(STDERR_TAIL);
    let mut forwarding = true;
    loop {
        let line = match lines.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "stopped reading buildctl progress");
                break;
            }
        };
        match serde_json::from_str::<SolveStatus>(&line) {
            Ok(batch) => {
                if forwarding && status.send(batch).await.is_err() {
                    forwarding = false;
                }
            }
            Err(_) if line.trim().is_empty() => {}
            Err(_) => tail.push(line),
        }
    }
    tail.peek(STDERR_TAIL)
}

/// Prefer buildctl's own `error:` line over the raw exit status.
pub(crate) fn failure_message(tail: &[String], exit: ExitStatus) -> String {
    let reported = tail
        .iter()
        .rev()
        .find_map(|line| line.strip_prefix("error: "))
        .or_else(|| tail.last().map(String::as_str));
    match reported {
        Some(line) => line.trim().to_string(),
        None => format!("buildctl exited with {exit}"),
    }
}

async fn read_metadata(path: &Path) -> SolveResponse {
    let raw = match tokio::fs::read(path).await {
        Ok(raw) if !raw.is_empty() => raw,
        Ok(_) => return SolveResponse::default(),
        Err(e) => {
            tracing::debug!(error = %e, "no solve metadata");
            return SolveResponse::default();
        }
    };
    let entries: BTreeMap<String, serde_json::Value> = match serde_json::from_slice(&raw) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!(error = %e, "unreadable solve metadata");
            return SolveResponse::default();
        }
    };
    let exporter_response = entries
        .into_iter()
        .map(|(key, value)| match value {
            serde_json::Value::String(s) => (key, s),
            other => (key, other.to_string()),
        })
        .collect();
    SolveResponse { exporter_response }
}

#[cfg(test)]
#[path = "buildctl_tests.rs"]
mod tests;
