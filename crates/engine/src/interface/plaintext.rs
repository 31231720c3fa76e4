// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Sequential text output for pipes and CI logs.
//!
//! Each job's lines are buffered with an elapsed-time marker and written out
//! in one block when the job succeeds or fails, so concurrent builds never
//! interleave on the console.

use super::{CancelListener, CancelListeners, Interface, InterfaceError, JobTable};
use crate::error::BuildError;
use kiln_core::{Clock, JobState, SystemClock};
use parking_lot::Mutex;
use std::io::Write;
use std::time::Instant;
use tokio::task::JoinHandle;

/// Interrupts that request cancellation before the process is killed outright
pub const INTERRUPTS_BEFORE_EXIT: usize = 3;

/// Exit status when the user forces shutdown
const FORCED_EXIT_CODE: i32 = 130;

#[derive(Default)]
struct BufferedLog {
    text: String,
    first_line: Option<Instant>,
}

pub struct PlaintextInterface<C: Clock = SystemClock> {
    clock: C,
    jobs: Mutex<JobTable<BufferedLog>>,
    out: Mutex<Box<dyn Write + Send>>,
    cancel: CancelListeners,
    interrupts: Mutex<Option<JoinHandle<()>>>,
}

impl PlaintextInterface<SystemClock> {
    /// Print to stdout and cancel on Ctrl-C. Must be called inside a tokio runtime.
    pub fn new() -> Self {
        let iface = Self::with_output(Box::new(std::io::stdout()), SystemClock);
        iface.install_interrupt_handler();
        iface
    }
}

impl<C: Clock> PlaintextInterface<C> {
    pub fn with_output(out: Box<dyn Write + Send>, clock: C) -> Self {
        Self {
            clock,
            jobs: Mutex::new(JobTable::default()),
            out: Mutex::new(out),
            cancel: CancelListeners::default(),
            interrupts: Mutex::new(None),
        }
    }

    /// Fire the cancel listeners on each of the first interrupts, then exit.
    pub fn install_interrupt_handler(&self) {
        let cancel = self.cancel.clone();
        let handle = tokio::spawn(async move {
            for _ in 0..INTERRUPTS_BEFORE_EXIT {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    tracing::warn!(error = %e, "cannot listen for interrupts");
                    return;
                }
                tracing::info!("interrupt received, cancelling builds");
                cancel.fire();
            }
            eprintln!("Forcing shutdown.");
            std::process::exit(FORCED_EXIT_CODE);
        });
        if let Some(previous) = self.interrupts.lock().replace(handle) {
            previous.abort();
        }
    }

    fn emit(&self, text: &str) {
        let mut out = self.out.lock();
        if let Err(e) = out.write_all(text.as_bytes()).and_then(|()| out.flush()) {
            tracing::warn!(error = %e, "failed to write build output");
        }
    }
}

impl<C: Clock> Interface for PlaintextInterface<C> {
    fn start_job(&self, service: &str, image: &str) {
        self.jobs.lock().start(service, image, BufferedLog::default());
    }

    fn fail_job(&self, service: &str, err: &BuildError) {
        if err.is_cancelled() {
            // cancelled jobs stay unfinished and print nothing
            return;
        }
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.advance(service, JobState::Failed) else {
            return;
        };
        let report = if job.view.text.is_empty() {
            format!("[{service}] SERVICE FAILED TO BUILD WITHOUT LOGS.\n")
        } else {
            format!(
                concat!(
                    "[{image}] JOB FAILED: {err}\n",
                    "[{service}] LOGS FOR FAILED SERVICE:\n",
                    "{logs}[{service}] END FAILURE LOGS\n\n",
                ),
                image = job.image,
                logs = job.view.text,
                err = err,
                service = service,
            )
        };
        self.emit(&report);
    }

    fn succeed_job(&self, service: &str) {
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.advance(service, JobState::Succeeded) else {
            return;
        };
        let report = if job.view.text.is_empty() {
            format!("[{service}] Service built.\n")
        } else {
            format!(
                concat!(
                    "[{image}] Logs for successfully built service:\n",
                    "{logs}[{service}] End of logs.\n\n",
                ),
                image = job.image,
                logs = job.view.text,
                service = service,
            )
        };
        self.emit(&report);
    }

    fn set_pushing(&self, service: &str) {
        self.jobs.lock().advance(service, JobState::Pushing);
    }

    fn process_log(&self, service: &str, line: &str) {
        let now = self.clock.now();
        let mut jobs = self.jobs.lock();
        let Some(job) = jobs.get_mut(service) else {
            tracing::debug!(service, "log line for unknown job");
            return;
        };
        if job.state.is_terminal() {
            return;
        }
        let first = *job.view.first_line.get_or_insert(now);
        let elapsed = now.saturating_duration_since(first).as_secs_f64();
        job.view.text.push_str(&format!("[t+{elapsed:.2}s] {line}\n"));
    }

    fn add_cancel_listener(&self, listener: CancelListener) {
        self.cancel.add(listener);
    }

    fn close(&self) -> Result<(), InterfaceError> {
        if let Some(handle) = self.interrupts.lock().take() {
            handle.abort();
        }
        let summary = self.jobs.lock().summary().to_string();
        if !summary.is_empty() {
            self.emit(&format!("{summary}\n"));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "plaintext_tests.rs"]
mod tests;
