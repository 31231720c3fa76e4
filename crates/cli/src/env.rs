// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the CLI.

use std::collections::BTreeMap;
use std::path::PathBuf;

/// Version string reported by `--version`
pub const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "+", env!("BUILD_GIT_HASH"));

/// Diagnostics filter used when `KILN_LOG` is unset or invalid
pub const DEFAULT_LOG_FILTER: &str = "warn";

/// Project root override: `KILN_ROOT`
pub fn root_override() -> Option<PathBuf> {
    std::env::var("KILN_ROOT").ok().filter(|s| !s.is_empty()).map(PathBuf::from)
}

/// Diagnostics filter directive: `KILN_LOG`
pub fn log_filter() -> String {
    std::env::var("KILN_LOG")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string())
}

/// Values of the named variables that are set, as build arguments.
pub fn build_args(names: &[String]) -> BTreeMap<String, String> {
    forwarded(names, |name| std::env::var(name).ok())
}

fn forwarded(
    names: &[String],
    lookup: impl Fn(&str) -> Option<String>,
) -> BTreeMap<String, String> {
    names.iter().filter_map(|name| lookup(name).map(|value| (name.clone(), value))).collect()
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
