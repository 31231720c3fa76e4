// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-service build logs.
//!
//! Writes human-readable timestamped lines to `<dir>/<service>.log`. The file
//! is truncated the first time a service logs anything in this run.
//!
//! In-flight progress (layer transfers and the like) is kept as a block at the
//! end of the file that is rewritten in place on every update, so the file
//! shows completed steps permanently and current progress at the bottom:
//!
//! ```text
//! [2026-03-01 10:00:00.120] [2/3] RUN make
//! [2026-03-01 10:00:02.480] 0123456789ab 2.00KB/2.00KB   <- completed
//! [2026-03-01 10:00:02.510] 89abcdef0123 512.00B/4.00KB  <- in flight
//! ```

use chrono::{DateTime, Local};
use kiln_core::{Clock, SolveStatus, SystemClock};
use parking_lot::Mutex;
use std::collections::hash_map::Entry;
use std::collections::{HashMap, HashSet};
use std::fs::{self, File};
use std::io::{Seek, SeekFrom, Write};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";
const INTERNAL_VERTEX: &str = "[internal]";

/// Observer of every line written, called with `(service, line)`.
pub type LogListener = Arc<dyn Fn(&str, &str) + Send + Sync>;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("build logger is closed")]
    Closed,
    #[error("could not make the logs directory at {}: {source}", path.display())]
    CreateDir { path: PathBuf, source: std::io::Error },
    #[error("could not write to {service}'s logs: {source}")]
    Write { service: String, source: std::io::Error },
}

pub struct FileLogger<C: Clock = SystemClock> {
    dir: PathBuf,
    clock: C,
    state: Mutex<LoggerState>,
}

#[derive(Default)]
struct LoggerState {
    logs: HashMap<String, ServiceLog>,
    listeners: Vec<LogListener>,
    closed: bool,
}

struct ServiceLog {
    file: File,
    /// Latest rendering of each unfinished status, keyed by status id
    in_flight: HashMap<String, Line>,
    /// Bytes of the in-flight block currently at the end of the file
    tail_len: u64,
    seen_vertices: HashSet<String>,
    reported_errors: HashSet<String>,
}

#[derive(Clone)]
struct Line {
    when: DateTime<Local>,
    text: String,
}

impl Line {
    fn render(&self) -> String {
        format!("[{}] {}\n", self.when.format(TIMESTAMP_FORMAT), self.text)
    }
}

/// What one call adds: permanent lines, and the lines listeners hear about.
#[derive(Default)]
struct Update {
    permanent: Vec<Line>,
    announce: Vec<String>,
}

impl Update {
    fn push(&mut self, when: DateTime<Local>, text: String) {
        self.announce.push(text.clone());
        self.permanent.push(Line { when, text });
    }
}

impl FileLogger<SystemClock> {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self::with_clock(dir, SystemClock)
    }
}

impl<C: Clock> FileLogger<C> {
    pub fn with_clock(dir: impl Into<PathBuf>, clock: C) -> Self {
        Self { dir: dir.into(), clock, state: Mutex::new(LoggerState::default()) }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Return the path to a service's log file.
    pub fn log_path(&self, service: &str) -> PathBuf {
        self.dir.join(format!("{service}.log"))
    }

    /// Register an observer for lines written from now on.
    ///
    /// Listeners run synchronously under the logger's lock and must not call
    /// back into the logger. A panicking listener is logged and skipped.
    pub fn add_listener(&self, listener: impl Fn(&str, &str) + Send + Sync + 'static) {
        self.state.lock().listeners.push(Arc::new(listener));
    }

    /// Append `message` to the service's log, one line per message line.
    pub fn log(
        &self,
        service: &str,
        when: DateTime<Local>,
        message: &str,
    ) -> Result<(), LoggerError> {
        self.apply(service, |_| {
            let mut update = Update::default();
            for text in message.lines().map(|l| l.trim_end_matches('\r')) {
                if !text.trim().is_empty() {
                    update.push(when, text.to_string());
                }
            }
            update
        })
    }

    /// [`log`](Self::log) stamped with the logger's clock.
    pub fn log_now(&self, service: &str, message: &str) -> Result<(), LoggerError> {
        self.log(service, self.clock.wall(), message)
    }

    /// Record one batch of build-engine progress.
    pub fn process_status(&self, service: &str, batch: &SolveStatus) -> Result<(), LoggerError> {
        let now = self.clock.wall();
        self.apply(service, |log| {
            let mut update = Update::default();
            for vertex in &batch.vertexes {
                let key = if vertex.digest.is_empty() { &vertex.name } else { &vertex.digest };
                let internal = vertex.name.starts_with(INTERNAL_VERTEX);
                if !internal && log.seen_vertices.insert(key.clone()) {
                    update.push(now, vertex.name.clone());
                }
                if let Some(error) = vertex.error() {
                    if log.reported_errors.insert(key.clone()) {
                        update.push(now, format!("ERROR: {}: {}", vertex.name, error));
                    }
                }
            }

            for status in &batch.statuses {
                let when = status.timestamp.with_timezone(&Local);
                let line = Line { when, text: status.render() };
                if status.is_completed() {
                    log.in_flight.remove(&status.id);
                    update.push(line.when, line.text);
                } else {
                    update.announce.push(line.text.clone());
                    log.in_flight.insert(status.id.clone(), line);
                }
            }

            for entry in &batch.logs {
                let when = entry.timestamp.with_timezone(&Local);
                for text in entry.lines() {
                    update.push(when, text);
                }
            }
            update
        })
    }

    /// Flush and release every open log. Later writes fail with [`LoggerError::Closed`].
    pub fn close(&self) -> Result<(), LoggerError> {
        let mut state = self.state.lock();
        state.closed = true;
        let mut first_error = None;
        for (service, mut log) in state.logs.drain() {
            if let Err(source) = log.file.flush() {
                first_error.get_or_insert(LoggerError::Write { service, source });
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn apply(
        &self,
        service: &str,
        edit: impl FnOnce(&mut ServiceLog) -> Update,
    ) -> Result<(), LoggerError> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(LoggerError::Closed);
        }
        let LoggerState { logs, listeners, .. } = &mut *state;
        let log = match logs.entry(service.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(self.open(service)?),
        };

        let update = edit(log);
        log.write(&update.permanent)
            .map_err(|source| LoggerError::Write { service: service.to_string(), source })?;
        for line in &update.announce {
            notify(listeners, service, line);
        }
        Ok(())
    }

    fn open(&self, service: &str) -> Result<ServiceLog, LoggerError> {
        fs::create_dir_all(&self.dir)
            .map_err(|source| LoggerError::CreateDir { path: self.dir.clone(), source })?;
        let file = File::options()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.log_path(service))
            .map_err(|source| LoggerError::Write { service: service.to_string(), source })?;
        Ok(ServiceLog {
            file,
            in_flight: HashMap::new(),
            tail_len: 0,
            seen_vertices: HashSet::new(),
            reported_errors: HashSet::new(),
        })
    }
}

impl ServiceLog {
    /// Write `permanent` where the in-flight block starts, then re-render the block.
    fn write(&mut self, permanent: &[Line]) -> std::io::Result<()> {
        let end = self.file.seek(SeekFrom::End(0))?;
        let start = end.saturating_sub(self.tail_len);

        let mut out: String = permanent.iter().map(Line::render).collect();
        let tail = self.render_in_flight();
        out.push_str(&tail);

        self.file.seek(SeekFrom::Start(start))?;
        self.file.write_all(out.as_bytes())?;
        self.file.set_len(start + out.len() as u64)?;
        self.tail_len = tail.len() as u64;
        Ok(())
    }

    /// In-flight lines sorted by their status text.
    fn render_in_flight(&self) -> String {
        let mut lines: Vec<&Line> = self.in_flight.values().collect();
        lines.sort_by(|a, b| a.text.cmp(&b.text).then(a.when.cmp(&b.when)));
        lines.into_iter().map(Line::render).collect()
    }
}

fn notify(listeners: &[LogListener], service: &str, line: &str) {
    let line = line.trim();
    if line.is_empty() {
        return;
    }
    for listener in listeners {
        if catch_unwind(AssertUnwindSafe(|| listener(service, line))).is_err() {
            tracing::warn!(service, "log line listener panicked");
        }
    }
}

#[cfg(test)]
#[path = "logger_tests.rs"]
mod tests;
