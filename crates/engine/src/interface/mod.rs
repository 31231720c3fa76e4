// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Progress presentation
//!
//! An [`Interface`] tracks the state of every job in a campaign and shows the
//! log lines the [`FileLogger`](crate::FileLogger) broadcasts. Two renderers
//! exist: [`PlaintextInterface`] for pipes and CI, and [`InteractiveInterface`]
//! for a full-screen terminal dashboard.

mod interactive;
mod plaintext;
mod render;

pub use interactive::InteractiveInterface;
pub use plaintext::PlaintextInterface;
pub use render::{render_dashboard, DashboardLine, LineKind};

#[cfg(test)]
pub(crate) mod recording;

use crate::error::BuildError;
use kiln_core::{JobState, RingBuffer};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Callback fired when the user asks to stop the campaign
pub type CancelListener = Arc<dyn Fn() + Send + Sync>;

#[derive(Debug, Error)]
pub enum InterfaceError {
    #[error("not running in a terminal")]
    NotATerminal,
    #[error("terminal error: {0}")]
    Terminal(#[from] std::io::Error),
}

/// Contract shared by both renderers.
///
/// Terminal transitions for a service that was never started are ignored, as
/// is anything after the first terminal transition.
pub trait Interface: Send + Sync {
    fn start_job(&self, service: &str, image: &str);
    fn fail_job(&self, service: &str, err: &BuildError);
    fn succeed_job(&self, service: &str);
    /// The engine started pushing layers to the registry.
    fn set_pushing(&self, service: &str);
    /// One trimmed, non-empty log line.
    fn process_log(&self, service: &str, line: &str);
    fn add_cancel_listener(&self, listener: CancelListener);
    /// Release terminal resources and print the campaign summary.
    fn close(&self) -> Result<(), InterfaceError>;
}

/// Cancel callbacks; firing never holds the lock while a callback runs.
#[derive(Clone, Default)]
pub struct CancelListeners {
    listeners: Arc<Mutex<Vec<CancelListener>>>,
}

impl CancelListeners {
    pub fn add(&self, listener: CancelListener) {
        self.listeners.lock().push(listener);
    }

    pub fn fire(&self) {
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            listener();
        }
    }
}

/// A job as an interface sees it, plus renderer-specific state.
pub struct TrackedJob<T> {
    pub image: String,
    pub state: JobState,
    pub view: T,
}

/// Jobs keyed by service name; iteration is sorted by name.
pub struct JobTable<T> {
    jobs: BTreeMap<String, TrackedJob<T>>,
}

impl<T> Default for JobTable<T> {
    fn default() -> Self {
        Self { jobs: BTreeMap::new() }
    }
}

impl<T> JobTable<T> {
    /// Register a building job. Returns false if the service is already known.
    pub fn start(&mut self, service: &str, image: &str, view: T) -> bool {
        if self.jobs.contains_key(service) {
            tracing::warn!(service, "job started twice");
            return false;
        }
        let job = TrackedJob { image: image.to_string(), state: JobState::Building, view };
        self.jobs.insert(service.to_string(), job);
        true
    }

    /// Move a started job to `next` if that is a legal transition.
    pub fn advance(&mut self, service: &str, next: JobState) -> Option<&mut TrackedJob<T>> {
        let job = self.jobs.get_mut(service)?;
        if !job.state.can_advance_to(next) {
            tracing::debug!(service, from = %job.state, to = %next, "ignored job transition");
            return None;
        }
        job.state = next;
        Some(job)
    }

    pub fn get_mut(&mut self, service: &str) -> Option<&mut TrackedJob<T>> {
        self.jobs.get_mut(service)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrackedJob<T>)> {
        self.jobs.iter().map(|(name, job)| (name.as_str(), job))
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn summary(&self) -> Summary {
        let mut summary = Summary::default();
        for (name, job) in &self.jobs {
            let bucket = match job.state {
                JobState::Succeeded => &mut summary.succeeded,
                JobState::Failed => &mut summary.failed,
                _ => &mut summary.unfinished,
            };
            bucket.push(name.clone());
        }
        summary
    }
}

/// Last log lines of one job, for live display.
pub type LogTail = RingBuffer<String>;

/// End-of-campaign report printed by `close`.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Summary {
    pub succeeded: Vec<String>,
    pub failed: Vec<String>,
    /// Started but never finished, i.e. cancelled
    pub unfinished: Vec<String>,
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut lines = Vec::new();
        if !self.succeeded.is_empty() {
            lines.push(format!("Successfully built: {}", self.succeeded.join(", ")));
        }
        if !self.failed.is_empty() {
            lines.push(format!("Failed to build: {}", self.failed.join(", ")));
        }
        if !self.unfinished.is_empty() {
            lines.push(format!("Cancelled: {}", self.unfinished.join(", ")));
        }
        if !self.failed.is_empty() {
            lines.push("See the logs folder for details.".to_string());
        }
        write!(f, "{}", lines.join("\n"))
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
