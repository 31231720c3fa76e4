// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error type that carries a process exit code.
//!
//! Commands return `ExitError` instead of calling `std::process::exit()`,
//! so `main()` drops the diagnostics guard before the process ends.

use std::fmt;

/// Configuration or build failure
pub const EXIT_FAILURE: i32 = 1;
/// The user cancelled the build
pub const EXIT_CANCELLED: i32 = 130;

#[derive(Debug)]
pub struct ExitError {
    pub code: i32,
    /// Printed to stderr unless empty
    pub message: String,
}

impl ExitError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self { code, message: message.into() }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self::new(EXIT_FAILURE, message)
    }

    pub fn cancelled() -> Self {
        Self::new(EXIT_CANCELLED, "")
    }
}

impl fmt::Display for ExitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ExitError {}

/// Exit code and message for an error returned by a command.
pub fn exit_status(err: &anyhow::Error) -> (i32, String) {
    match err.downcast_ref::<ExitError>() {
        Some(exit) => (exit.code, exit.message.clone()),
        None => (EXIT_FAILURE, format!("{err:#}")),
    }
}

#[cfg(test)]
#[path = "exit_error_tests.rs"]
mod tests;
