// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-adapters: external collaborators of the build pipeline

pub mod engine;
pub mod git;
pub mod loader;
pub mod pipe;

pub use engine::{BuildEngine, BuildctlEngine, EngineError, Export, SolveRequest, SolveResponse};
pub use git::{current_tree_hash, GitError};
pub use loader::{CommandLoader, ImageLoader, LoadError};
pub use pipe::{pipe, PipeError, PipeReader, PipeWriter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use engine::{FakeBuildEngine, SolveCall};
#[cfg(any(test, feature = "test-support"))]
pub use loader::FakeImageLoader;
