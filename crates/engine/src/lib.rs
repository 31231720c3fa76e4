// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-engine: the concurrent multi-service build pipeline

pub mod builder;
pub mod campaign;
pub mod error;
pub mod interface;
pub mod logger;
pub mod runner;

pub use builder::{BuildSettings, Builder};
pub use campaign::{Campaign, CampaignOutcome};
pub use error::BuildError;
pub use interface::{
    CancelListener, InteractiveInterface, Interface, InterfaceError, PlaintextInterface, Summary,
};
pub use logger::{FileLogger, LogListener, LoggerError};
pub use runner::{run_parallel, task, Task, TaskFuture};
