// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build-engine progress events.
//!
//! Field names follow the engine's JSON progress stream (Go-style
//! `PascalCase`, `null` for empty lists, base64 log payloads).

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

/// Status id the engine reports while uploading layers to a registry
pub const PUSHING_LAYERS: &str = "pushing layers";

const DIGEST_PREFIX: &str = "sha256:";
const SHORT_ID_LEN: usize = 12;

/// One batch of progress events.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SolveStatus {
    #[serde(default, deserialize_with = "null_as_default")]
    pub vertexes: Vec<Vertex>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub statuses: Vec<VertexStatus>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub logs: Vec<VertexLog>,
}

impl SolveStatus {
    pub fn is_empty(&self) -> bool {
        self.vertexes.is_empty() && self.statuses.is_empty() && self.logs.is_empty()
    }

    /// Whether any status in the batch marks the start of a registry push.
    pub fn reports_pushing(&self) -> bool {
        self.statuses.iter().any(|s| s.id == PUSHING_LAYERS)
    }
}

/// A discrete build step, e.g. `[2/4] RUN make`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Vertex {
    #[serde(default)]
    pub digest: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
    #[serde(default)]
    pub cached: bool,
    #[serde(default, deserialize_with = "null_as_default")]
    pub error: String,
}

impl Vertex {
    pub fn error(&self) -> Option<&str> {
        (!self.error.is_empty()).then_some(self.error.as_str())
    }
}

/// In-flight progress of one transfer or step.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VertexStatus {
    #[serde(rename = "ID")]
    pub id: String,
    #[serde(default)]
    pub vertex: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub current: i64,
    #[serde(default)]
    pub total: i64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub started: Option<DateTime<Utc>>,
    #[serde(default)]
    pub completed: Option<DateTime<Utc>>,
}

impl VertexStatus {
    pub fn new(id: impl Into<String>, current: i64, total: i64, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            vertex: String::new(),
            name: String::new(),
            current,
            total,
            timestamp,
            started: None,
            completed: None,
        }
    }

    /// Mark this status as finished at its own timestamp.
    pub fn completed(mut self) -> Self {
        self.completed = Some(self.timestamp);
        self
    }

    pub fn is_completed(&self) -> bool {
        self.completed.is_some()
    }

    /// Display id: content digests are cut to a 12-character fingerprint.
    pub fn short_id(&self) -> &str {
        match self.id.strip_prefix(DIGEST_PREFIX) {
            Some(hex) => hex.get(..SHORT_ID_LEN).unwrap_or(hex),
            None => &self.id,
        }
    }

    /// `short-id current/total`, or `short-id current` when the total is unknown.
    pub fn render(&self) -> String {
        if self.total != 0 {
            format!(
                "{} {}/{}",
                self.short_id(),
                crate::human_bytes(self.current),
                crate::human_bytes(self.total)
            )
        } else {
            format!("{} {}", self.short_id(), crate::human_bytes(self.current))
        }
    }
}

/// Raw output a step wrote to stdout/stderr.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct VertexLog {
    #[serde(default)]
    pub vertex: String,
    #[serde(default)]
    pub stream: i64,
    #[serde(default, deserialize_with = "base64_payload")]
    pub data: Vec<u8>,
    pub timestamp: DateTime<Utc>,
}

impl VertexLog {
    /// Non-empty lines of the payload with line endings removed.
    pub fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.data)
            .split('\n')
            .map(|l| l.trim_end_matches('\r').to_string())
            .filter(|l| !l.trim().is_empty())
            .collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn base64_payload<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(encoded) => STANDARD.decode(encoded.as_bytes()).map_err(serde::de::Error::custom),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
#[path = "status_tests.rs"]
mod tests;
