// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Diagnostics setup.
//!
//! The full-screen dashboard owns the terminal, so while it runs diagnostics
//! go to a file under the logs directory. Otherwise they go to stderr.

use crate::env;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Kept in a subdirectory: build logs are the `<service>.log` files directly
/// under the logs directory and belong to the build logger alone.
const DIAGNOSTICS_DIR: &str = ".kiln";
const DIAGNOSTICS_FILE: &str = "diagnostics.log";

/// Where dashboard-mode diagnostics are written.
pub fn diagnostics_path(logs_dir: &Path) -> PathBuf {
    logs_dir.join(DIAGNOSTICS_DIR).join(DIAGNOSTICS_FILE)
}

/// Install the global subscriber. Keep the returned guard alive until exit
/// so buffered file output is flushed.
pub fn init(logs_dir: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(env::log_filter())
        .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER));
    match logs_dir {
        Some(logs_dir) => {
            let dir = logs_dir.join(DIAGNOSTICS_DIR);
            std::fs::create_dir_all(&dir)?;
            let appender = tracing_appender::rolling::never(&dir, DIAGNOSTICS_FILE);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .map_err(|e| anyhow::anyhow!(e))?;
            Ok(None)
        }
    }
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
