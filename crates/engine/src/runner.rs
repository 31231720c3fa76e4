// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parallel task runner.
//!
//! Every task receives a token derived from the caller's. The first task to
//! fail cancels that token for all of them; the runner then waits for every
//! task to return and reports the first error.
//!
//! Tasks must select on their token around every blocking call. A task that
//! ignores cancellation keeps the runner waiting until it returns on its own.

use std::future::Future;
use std::pin::Pin;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

pub type TaskFuture<E> = Pin<Box<dyn Future<Output = Result<(), E>> + Send>>;

/// A cancelable unit of work.
pub type Task<E> = Box<dyn FnOnce(CancellationToken) -> TaskFuture<E> + Send>;

/// Box an async closure as a [`Task`].
pub fn task<E, F, Fut>(f: F) -> Task<E>
where
    F: FnOnce(CancellationToken) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
{
    Box::new(move |token| Box::pin(f(token)))
}

/// Run `tasks` concurrently under a child of `parent`.
///
/// Returns the first error observed. A panicking task cancels the others and
/// the panic resumes on the caller once they have all returned.
pub async fn run_parallel<E>(parent: &CancellationToken, tasks: Vec<Task<E>>) -> Result<(), E>
where
    E: Send + 'static,
{
    let token = parent.child_token();
    let mut set = JoinSet::new();
    for task in tasks {
        set.spawn(task(token.clone()));
    }

    let mut first_error = None;
    let mut panic = None;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                token.cancel();
                first_error.get_or_insert(e);
            }
            Err(join_error) if join_error.is_panic() => {
                token.cancel();
                panic.get_or_insert(join_error.into_panic());
            }
            Err(join_error) => {
                tracing::debug!(error = %join_error, "task aborted");
            }
        }
    }

    if let Some(payload) = panic {
        std::panic::resume_unwind(payload);
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
#[path = "runner_tests.rs"]
mod tests;
