// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build campaign: every service of one `kiln build` invocation.

use crate::builder::Builder;
use crate::runner::{run_parallel, task};
use kiln_adapters::{BuildEngine, ImageLoader};
use kiln_core::{ensure_unique, BuildableService, Clock, DiscoveryError, SystemClock};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// How a campaign ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CampaignOutcome {
    Succeeded,
    /// Number of jobs that failed
    Failed(usize),
    /// The user asked to stop.
    Cancelled,
}

kiln_core::simple_display! {
    CampaignOutcome {
        Succeeded => "succeeded",
        Failed(..) => "failed",
        Cancelled => "cancelled",
    }
}

pub struct Campaign<E, L, C: Clock = SystemClock> {
    builder: Builder<E, L, C>,
    keep_going: bool,
}

impl<E, L, C> Campaign<E, L, C>
where
    E: BuildEngine,
    L: ImageLoader,
    C: Clock,
{
    /// Every line the builder logs is also shown on its interface.
    pub fn new(builder: Builder<E, L, C>) -> Self {
        let interface = Arc::clone(builder.interface());
        builder.logger().add_listener(move |service, line| interface.process_log(service, line));
        Self { builder, keep_going: false }
    }

    /// Let the other jobs finish when one fails, instead of cancelling them.
    pub fn keep_going(mut self, keep_going: bool) -> Self {
        self.keep_going = keep_going;
        self
    }

    /// Build all `services` concurrently.
    ///
    /// Names must be unique; a collision is reported before any job starts.
    pub async fn run(
        &self,
        services: Vec<BuildableService>,
    ) -> Result<CampaignOutcome, DiscoveryError> {
        ensure_unique(&services)?;

        let root = CancellationToken::new();
        let user_cancelled = Arc::new(AtomicBool::new(false));
        {
            let root = root.clone();
            let user_cancelled = Arc::clone(&user_cancelled);
            self.builder.interface().add_cancel_listener(Arc::new(move || {
                user_cancelled.store(true, Ordering::SeqCst);
                root.cancel();
            }));
        }

        let failed = Arc::new(AtomicUsize::new(0));
        let tasks = services
            .into_iter()
            .map(|service| {
                let builder = self.builder.clone();
                let failed = Arc::clone(&failed);
                let keep_going = self.keep_going;
                task(move |token| async move {
                    match builder.build_service(&token, &service).await {
                        Ok(()) => Ok(()),
                        Err(e) if e.is_cancelled() => Err(e),
                        Err(e) => {
                            failed.fetch_add(1, Ordering::SeqCst);
                            if keep_going {
                                Ok(())
                            } else {
                                Err(e)
                            }
                        }
                    }
                })
            })
            .collect();

        let result = run_parallel(&root, tasks).await;
        let failed = failed.load(Ordering::SeqCst);
        let outcome = if user_cancelled.load(Ordering::SeqCst) {
            CampaignOutcome::Cancelled
        } else if failed > 0 {
            CampaignOutcome::Failed(failed)
        } else if result.is_err() {
            // only cancellation errors escape without being counted
            CampaignOutcome::Cancelled
        } else {
            CampaignOutcome::Succeeded
        };
        tracing::info!(%outcome, failed, "campaign finished");
        Ok(outcome)
    }
}

#[cfg(test)]
#[path = "campaign_tests.rs"]
mod tests;
