// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build errors

use kiln_adapters::{EngineError, LoadError};
use thiserror::Error;

/// Why a build job, or one of its legs, stopped.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("{0}")]
    Engine(EngineError),
    #[error("{0}")]
    Load(LoadError),
    /// The build was stopped by the user or by a failing sibling
    #[error("build cancelled")]
    Cancelled,
}

impl BuildError {
    /// Cancellation is never reported as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, BuildError::Cancelled)
    }
}

impl From<EngineError> for BuildError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Cancelled => BuildError::Cancelled,
            other => BuildError::Engine(other),
        }
    }
}

impl From<LoadError> for BuildError {
    fn from(err: LoadError) -> Self {
        match err {
            LoadError::Cancelled => BuildError::Cancelled,
            other => BuildError::Load(other),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
