// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build job state machine.
//!
//! A `BuildJob` is one service build inside a campaign. Its state only moves
//! forward: `Queued → Building → (Pushing) → Succeeded | Failed`.

use crate::service::BuildableService;
use thiserror::Error;

/// Lifecycle state of a build job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Queued,
    Building,
    /// Sub-state of `Building`, entered once the registry push leg is active
    Pushing,
    Succeeded,
    Failed,
}

impl JobState {
    /// Whether this status is terminal (no further transitions expected)
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Succeeded | JobState::Failed)
    }

    /// Whether `next` is a legal forward move from this state.
    pub fn can_advance_to(&self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Queued, Building)
                | (Queued, Failed)
                | (Building, Pushing)
                | (Building, Succeeded)
                | (Building, Failed)
                | (Pushing, Succeeded)
                | (Pushing, Failed)
        )
    }
}

crate::simple_display! {
    JobState {
        Queued => "queued",
        Building => "building",
        Pushing => "pushing",
        Succeeded => "succeeded",
        Failed => "failed",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("job {service} cannot move from {from} to {to}")]
pub struct TransitionError {
    pub service: String,
    pub from: JobState,
    pub to: JobState,
}

/// One service build within a campaign.
#[derive(Debug, Clone)]
pub struct BuildJob {
    service: BuildableService,
    image: String,
    state: JobState,
}

impl BuildJob {
    pub fn new(service: BuildableService, image: impl Into<String>) -> Self {
        Self { service, image: image.into(), state: JobState::Queued }
    }

    pub fn service(&self) -> &BuildableService {
        &self.service
    }

    pub fn name(&self) -> &str {
        &self.service.name
    }

    /// Full image reference, `registry/name:tag` or `name:tag`
    pub fn image(&self) -> &str {
        &self.image
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Move to `next`, rejecting backwards moves and anything after a
    /// terminal state.
    pub fn advance(&mut self, next: JobState) -> Result<(), TransitionError> {
        if !self.state.can_advance_to(next) {
            return Err(TransitionError {
                service: self.service.name.clone(),
                from: self.state,
                to: next,
            });
        }
        self.state = next;
        Ok(())
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
