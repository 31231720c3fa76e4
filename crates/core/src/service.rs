// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Service discovery.
//!
//! A service is a directory holding a `Dockerfile` (service `<dir>`) or a
//! `<variant>.Dockerfile` (service `<dir>-<variant>`).

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

const DOCKERFILE: &str = "Dockerfile";
const VARIANT_SUFFIX: &str = ".Dockerfile";

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("cannot read build root {}: {source}", path.display())]
    Root { path: PathBuf, source: std::io::Error },
    #[error("cannot read directory {}: {source}", path.display())]
    Walk { path: PathBuf, source: std::io::Error },
    #[error("service name '{name}' is defined twice: {} and {}", first.display(), second.display())]
    Duplicate { name: String, first: PathBuf, second: PathBuf },
}

/// One buildable unit found in the repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildableService {
    /// Build context directory
    pub dir: PathBuf,
    /// Dockerfile name relative to `dir`
    pub dockerfile: String,
    /// Derived service name, unique within a campaign
    pub name: String,
}

impl BuildableService {
    pub fn new(
        dir: impl Into<PathBuf>,
        dockerfile: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self { dir: dir.into(), dockerfile: dockerfile.into(), name: name.into() }
    }
}

/// Walk `root` and return every service, sorted by name.
///
/// Directories listed in `ignore` (relative to `root`) are pruned entirely.
/// Two services deriving the same name is an error.
pub fn discover(root: &Path, ignore: &[PathBuf]) -> Result<Vec<BuildableService>, DiscoveryError> {
    let root = root
        .canonicalize()
        .map_err(|source| DiscoveryError::Root { path: root.to_path_buf(), source })?;
    let pruned: Vec<PathBuf> = ignore.iter().map(|p| root.join(p)).collect();

    let mut services = Vec::new();
    let mut stack = vec![root];
    while let Some(current) = stack.pop() {
        let entries = std::fs::read_dir(&current)
            .map_err(|source| DiscoveryError::Walk { path: current.clone(), source })?;
        for entry in entries.flatten() {
            let path = entry.path();
            let Ok(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                if !pruned.iter().any(|p| p == &path) {
                    stack.push(path);
                }
            } else if let Some(service) = service_for_file(&current, &path) {
                services.push(service);
            }
        }
    }

    services.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.dir.cmp(&b.dir)));
    ensure_unique(&services)?;
    Ok(services)
}

fn service_for_file(dir: &Path, path: &Path) -> Option<BuildableService> {
    let file_name = path.file_name()?.to_str()?;
    let dir_name = dir.file_name()?.to_str()?;
    if file_name == DOCKERFILE {
        return Some(BuildableService::new(dir, DOCKERFILE, dir_name));
    }
    let variant = file_name.strip_suffix(VARIANT_SUFFIX)?;
    if variant.is_empty() {
        return None;
    }
    Some(BuildableService::new(dir, file_name, format!("{}-{}", dir_name, variant)))
}

/// Reject campaigns where two services share a name.
pub fn ensure_unique(services: &[BuildableService]) -> Result<(), DiscoveryError> {
    let mut seen: HashMap<&str, &Path> = HashMap::new();
    for service in services {
        if let Some(first) = seen.insert(&service.name, &service.dir) {
            return Err(DiscoveryError::Duplicate {
                name: service.name.clone(),
                first: first.to_path_buf(),
                second: service.dir.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
#[path = "service_tests.rs"]
mod tests;
