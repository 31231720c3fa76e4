// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Interface double that records every call.

use super::{CancelListener, CancelListeners, Interface, InterfaceError};
use crate::error::BuildError;
use parking_lot::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Start { service: String, image: String },
    Fail { service: String, error: String },
    Succeed(String),
    Pushing(String),
    Log { service: String, line: String },
    Close,
}

impl Call {
    fn service(&self) -> Option<&str> {
        match self {
            Call::Start { service, .. }
            | Call::Fail { service, .. }
            | Call::Log { service, .. } => {
                Some(service)
            }
            Call::Succeed(service) | Call::Pushing(service) => Some(service),
            Call::Close => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Call::Fail { .. } | Call::Succeed(_))
    }
}

#[derive(Default)]
pub struct RecordingInterface {
    calls: Mutex<Vec<Call>>,
    cancel: CancelListeners,
}

impl RecordingInterface {
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn calls_for(&self, service: &str) -> Vec<Call> {
        self.calls.lock().iter().filter(|c| c.service() == Some(service)).cloned().collect()
    }

    /// Log lines received for `service`, in order.
    pub fn lines(&self, service: &str) -> Vec<String> {
        self.calls_for(service)
            .into_iter()
            .filter_map(|c| match c {
                Call::Log { line, .. } => Some(line),
                _ => None,
            })
            .collect()
    }

    /// Non-log calls for `service`.
    pub fn transitions(&self, service: &str) -> Vec<Call> {
        self.calls_for(service).into_iter().filter(|c| !matches!(c, Call::Log { .. })).collect()
    }

    /// Act like the user pressing Ctrl-C.
    pub fn cancel(&self) {
        self.cancel.fire();
    }

    fn record(&self, call: Call) {
        self.calls.lock().push(call);
    }
}

impl Interface for RecordingInterface {
    fn start_job(&self, service: &str, image: &str) {
        self.record(Call::Start { service: service.to_string(), image: image.to_string() });
    }

    fn fail_job(&self, service: &str, err: &BuildError) {
        self.record(Call::Fail { service: service.to_string(), error: err.to_string() });
    }

    fn succeed_job(&self, service: &str) {
        self.record(Call::Succeed(service.to_string()));
    }

    fn set_pushing(&self, service: &str) {
        self.record(Call::Pushing(service.to_string()));
    }

    fn process_log(&self, service: &str, line: &str) {
        self.record(Call::Log { service: service.to_string(), line: line.to_string() });
    }

    fn add_cancel_listener(&self, listener: CancelListener) {
        self.cancel.add(listener);
    }

    fn close(&self) -> Result<(), InterfaceError> {
        self.record(Call::Close);
        Ok(())
    }
}
