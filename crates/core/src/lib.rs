// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln-core: domain types shared by the kiln build pipeline

pub mod macros;

pub mod bytes;
pub mod clock;
pub mod job;
pub mod ring;
pub mod service;
pub mod status;

pub use bytes::human_bytes;
#[cfg(any(test, feature = "test-support"))]
pub use clock::FakeClock;
pub use clock::{Clock, SystemClock};
pub use job::{BuildJob, JobState, TransitionError};
pub use ring::RingBuffer;
pub use service::{discover, ensure_unique, BuildableService, DiscoveryError};
pub use status::{SolveStatus, Vertex, VertexLog, VertexStatus, PUSHING_LAYERS};
