// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln services`

use crate::color::{paint, Tone};
use crate::config::Project;
use kiln_core::{discover, BuildableService};
use std::path::Path;

pub fn run(project: &Project) -> anyhow::Result<()> {
    let services = discover(&project.root, &project.config.build.ignore_dirs)?;
    if services.is_empty() {
        println!("No services found under {}", project.root.display());
        return Ok(());
    }
    for row in rows(&project.root, &services) {
        println!("{row}");
    }
    Ok(())
}

/// One `name  dir  dockerfile` line per service, names padded to align.
fn rows(root: &Path, services: &[BuildableService]) -> Vec<String> {
    let root = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
    let width = services.iter().map(|s| s.name.len()).max().unwrap_or(0);
    services
        .iter()
        .map(|service| {
            let dir = service.dir.strip_prefix(&root).unwrap_or(&service.dir);
            let dir = if dir.as_os_str().is_empty() { Path::new(".") } else { dir };
            format!(
                "{}  {}  {}",
                paint(Tone::Name, &format!("{:width$}", service.name)),
                paint(Tone::Dim, &dir.display().to_string()),
                service.dockerfile,
            )
        })
        .collect()
}

#[cfg(test)]
#[path = "services_tests.rs"]
mod tests;
