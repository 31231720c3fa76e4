// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Local image-load adapters
//!
//! The loader consumes the tarball stream produced by the build engine and
//! registers it with the local image store.

use crate::pipe::{PipeError, PipeReader};
use async_trait::async_trait;
use std::process::Stdio;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Errors from image load operations
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to start {program}: {source}")]
    Spawn { program: String, source: std::io::Error },
    #[error("image load exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    /// The producing side aborted the stream
    #[error("image stream aborted: {0}")]
    Upstream(PipeError),
    #[error("image load i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("image load cancelled")]
    Cancelled,
}

/// Adapter for loading a tarball stream into the local image store
#[async_trait]
pub trait ImageLoader: Clone + Send + Sync + 'static {
    /// Consume `input` to its end and load it. Returns the loader's report,
    /// e.g. `Loaded image: api:abc`.
    ///
    /// Every failure closes `input` with the error so the producer stops.
    async fn load(&self, input: PipeReader, cancel: CancellationToken) -> Result<String, LoadError>;
}

/// Loads images by piping the stream into a child process such as `docker load`.
#[derive(Debug, Clone)]
pub struct CommandLoader {
    program: String,
    args: Vec<String>,
}

impl Default for CommandLoader {
    fn default() -> Self {
        Self { program: "docker".to_string(), args: vec!["load".to_string()] }
    }
}

impl CommandLoader {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self { program: program.into(), args }
    }

    /// Build from a full argv; `None` when it is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.to_vec()))
    }
}

#[async_trait]
impl ImageLoader for CommandLoader {
    async fn load(
        &self,
        mut input: PipeReader,
        cancel: CancellationToken,
    ) -> Result<String, LoadError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        // a terminal ^C hits the whole foreground group; only `cancel` may stop the load
        #[cfg(unix)]
        cmd.process_group(0);
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(source) => {
                let err = LoadError::Spawn { program: self.program.clone(), source };
                input.close_with_error(err.to_string());
                return Err(err);
            }
        };
        let stdout = collect(child.stdout.take());
        let stderr = collect(child.stderr.take());
        let stdin = child.stdin.take();

        let fed = tokio::select! {
            biased;
            _ = cancel.cancelled() => Fed::Cancelled,
            result = feed(&mut input, stdin) => Fed::Done(result),
            status = child.wait() => Fed::Exited(status),
        };
        let (status, consumed) = match fed {
            Fed::Cancelled => {
                reap(&mut child, &stdout, &stderr).await;
                input.close_with_error("image load cancelled");
                return Err(LoadError::Cancelled);
            }
            Fed::Done(Err(LoadError::Upstream(e))) => {
                reap(&mut child, &stdout, &stderr).await;
                return Err(LoadError::Upstream(e));
            }
            Fed::Exited(status) => (status, false),
            Fed::Done(result) => {
                // a write error means the child went away; its exit status explains why
                if let Err(e) = &result {
                    tracing::debug!(error = %e, "image loader stopped reading");
                }
                let status = tokio::select! {
                    status = child.wait() => status,
                    _ = cancel.cancelled() => {
                        reap(&mut child, &stdout, &stderr).await;
                        input.close_with_error("image load cancelled");
                        return Err(LoadError::Cancelled);
                    }
                };
                (status, result.is_ok())
            }
        };
        let status = match status {
            Ok(status) => status,
            Err(e) => {
                input.close_with_error(e.to_string());
                return Err(LoadError::Io(e));
            }
        };
        let report = stdout.await.unwrap_or_default();
        let stderr = stderr.await.unwrap_or_default();
        if status.success() && consumed {
            return Ok(report.trim().to_string());
        }
        let stderr = match stderr.trim() {
            "" if status.success() => "exited before the image stream ended".to_string(),
            text => text.to_string(),
        };
        let err = LoadError::Failed { status: status.to_string(), stderr };
        input.close_with_error(err.to_string());
        Err(err)
    }
}

enum Fed {
    Cancelled,
    Done(Result<(), LoadError>),
    Exited(std::io::Result<std::process::ExitStatus>),
}

async fn feed(input: &mut PipeReader, stdin: Option<ChildStdin>) -> Result<(), LoadError> {
    let Some(mut stdin) = stdin else {
        return Ok(());
    };
    while let Some(chunk) = input.read().await.map_err(LoadError::Upstream)? {
        stdin.write_all(&chunk).await?;
    }
    stdin.shutdown().await?;
    Ok(())
}

fn collect<R>(stream: Option<R>) -> JoinHandle<String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut text = String::new();
        if let Some(mut stream) = stream {
            let mut raw = Vec::new();
            if stream.read_to_end(&mut raw).await.is_ok() {
                text = String::from_utf8_lossy(&raw).into_owned();
            }
        }
        text
    })
}

/// Kill the child and wait for it to exit.
async fn reap(child: &mut Child, stdout: &JoinHandle<String>, stderr: &JoinHandle<String>) {
    if let Err(e) = child.kill().await {
        tracing::warn!(error = %e, "failed to kill image loader");
    }
    stdout.abort();
    stderr.abort();
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{ImageLoader, LoadError};
    use crate::pipe::PipeReader;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;
    use tokio_util::sync::CancellationToken;

    #[derive(Default)]
    struct FakeLoaderState {
        loaded: Vec<Vec<u8>>,
        fail_with: Option<String>,
        cancelled: usize,
    }

    /// Fake image loader for testing
    #[derive(Clone, Default)]
    pub struct FakeImageLoader {
        inner: Arc<Mutex<FakeLoaderState>>,
    }

    impl FakeImageLoader {
        pub fn new() -> Self {
            Self::default()
        }

        /// Reject every stream with this message without reading it
        pub fn failing(self, message: &str) -> Self {
            self.inner.lock().fail_with = Some(message.to_string());
            self
        }

        /// Streams loaded so far
        pub fn loaded(&self) -> Vec<Vec<u8>> {
            self.inner.lock().loaded.clone()
        }

        /// Loads that ended by cancellation
        pub fn cancelled(&self) -> usize {
            self.inner.lock().cancelled
        }
    }

    #[async_trait]
    impl ImageLoader for FakeImageLoader {
        async fn load(
            &self,
            mut input: PipeReader,
            cancel: CancellationToken,
        ) -> Result<String, LoadError> {
            let fail_with = self.inner.lock().fail_with.clone();
            if let Some(message) = fail_with {
                let status = "exit status: 1".to_string();
                let err = LoadError::Failed { status, stderr: message };
                input.close_with_error(err.to_string());
                return Err(err);
            }
            let mut bytes = Vec::new();
            loop {
                let chunk = tokio::select! {
                    // a cancelled producer also closes the stream; report the cancel
                    biased;
                    _ = cancel.cancelled() => {
                        self.inner.lock().cancelled += 1;
                        input.close_with_error("image load cancelled");
                        return Err(LoadError::Cancelled);
                    }
                    chunk = input.read() => chunk.map_err(LoadError::Upstream)?,
                };
                match chunk {
                    Some(chunk) => bytes.extend(chunk),
                    None => break,
                }
            }
            self.inner.lock().loaded.push(bytes);
            Ok("Loaded image".to_string())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeImageLoader;

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
