// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory byte pipe between the build engine and the image loader.
//!
//! Either end can close with an error. The other end observes that error on
//! its next operation instead of a clean end-of-stream, and a blocked
//! `read`/`write` wakes up immediately.

use parking_lot::Mutex;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

/// Chunks buffered between the two ends before `write` blocks.
pub const DEFAULT_PIPE_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipeError {
    /// The other end closed with this message
    #[error("{0}")]
    Aborted(String),
    /// The reader went away without saying why
    #[error("image stream reader closed")]
    ReaderGone,
}

#[derive(Default)]
struct Shared {
    writer_error: Mutex<Option<PipeError>>,
    reader_error: Mutex<Option<PipeError>>,
}

impl Shared {
    fn set_writer_error(&self, err: PipeError) {
        self.writer_error.lock().get_or_insert(err);
    }

    fn set_reader_error(&self, err: PipeError) {
        self.reader_error.lock().get_or_insert(err);
    }
}

/// Create a connected writer/reader pair.
pub fn pipe() -> (PipeWriter, PipeReader) {
    pipe_with_capacity(DEFAULT_PIPE_CAPACITY)
}

pub fn pipe_with_capacity(capacity: usize) -> (PipeWriter, PipeReader) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Arc::new(Shared::default());
    (
        PipeWriter { tx: Some(tx), shared: Arc::clone(&shared), finished: false },
        PipeReader { rx, shared },
    )
}

/// Producing end. Dropping it without [`close`](Self::close) aborts the stream.
pub struct PipeWriter {
    tx: Option<mpsc::Sender<Vec<u8>>>,
    shared: Arc<Shared>,
    finished: bool,
}

impl PipeWriter {
    /// Send one chunk, waiting for buffer space.
    ///
    /// Fails with the reader's error once the reader has closed.
    pub async fn write(&self, chunk: Vec<u8>) -> Result<(), PipeError> {
        if let Some(err) = self.shared.reader_error.lock().clone() {
            return Err(err);
        }
        let Some(tx) = &self.tx else {
            return Err(PipeError::ReaderGone);
        };
        tx.send(chunk)
            .await
            .map_err(|_| self.shared.reader_error.lock().clone().unwrap_or(PipeError::ReaderGone))
    }

    /// Finish the stream; the reader sees end-of-stream after draining.
    pub fn close(mut self) {
        self.finished = true;
        self.tx = None;
    }

    /// Abort the stream; the reader's next `read` returns `message`.
    pub fn close_with_error(mut self, message: impl Into<String>) {
        self.shared.set_writer_error(PipeError::Aborted(message.into()));
        self.finished = true;
        self.tx = None;
    }
}

impl Drop for PipeWriter {
    fn drop(&mut self) {
        if !self.finished {
            let err = PipeError::Aborted("image stream ended unexpectedly".to_string());
            self.shared.set_writer_error(err);
        }
    }
}

/// Consuming end.
pub struct PipeReader {
    rx: mpsc::Receiver<Vec<u8>>,
    shared: Arc<Shared>,
}

impl PipeReader {
    /// Next chunk, `Ok(None)` at a clean end-of-stream, or the writer's error.
    pub async fn read(&mut self) -> Result<Option<Vec<u8>>, PipeError> {
        if let Some(err) = self.shared.writer_error.lock().clone() {
            return Err(err);
        }
        match self.rx.recv().await {
            Some(chunk) => Ok(Some(chunk)),
            None => match self.shared.writer_error.lock().clone() {
                Some(err) => Err(err),
                None => Ok(None),
            },
        }
    }

    /// Abort the stream; the writer's next `write` returns `message`.
    pub fn close_with_error(mut self, message: impl Into<String>) {
        self.shared.set_reader_error(PipeError::Aborted(message.into()));
        self.rx.close();
    }
}

#[cfg(test)]
#[path = "pipe_tests.rs"]
mod tests;
