// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dashboard layout, independent of the terminal.

use super::{JobTable, LogTail, TrackedJob};
use kiln_core::JobState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    FailedHeader,
    BuildingHeader,
    Log,
    Blank,
    Footer,
}

/// One screen row, already cut or padded to the screen width.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DashboardLine {
    pub kind: LineKind,
    pub text: String,
}

/// Lay out `jobs` on a `width` x `height` screen.
///
/// Failed jobs come first, then jobs still building, each as a header and
/// its latest log lines. Screen rows are shared evenly between them (at least
/// two rows each) with leftover rows going to the first jobs. Succeeded jobs
/// only count towards the footer on the last row.
pub fn render_dashboard(
    jobs: &JobTable<LogTail>,
    width: usize,
    height: usize,
) -> Vec<DashboardLine> {
    if height == 0 {
        return Vec::new();
    }
    let mut failed = Vec::new();
    let mut building = Vec::new();
    let mut succeeded = 0;
    for (_, job) in jobs.iter() {
        match job.state {
            JobState::Failed => failed.push(job),
            JobState::Succeeded => succeeded += 1,
            _ => building.push(job),
        }
    }
    let total = failed.len() + building.len() + succeeded;

    let body = height - 1;
    let mut lines = Vec::with_capacity(height);
    let shown = failed.len() + building.len();
    if shown > 0 {
        let per_job = (body / shown).max(2);
        let mut remainder = body.saturating_sub(per_job * shown);
        let sections = failed
            .iter()
            .map(|job| (LineKind::FailedHeader, *job))
            .chain(building.iter().map(|job| (LineKind::BuildingHeader, *job)));
        for (kind, job) in sections {
            if lines.len() >= body {
                break;
            }
            lines.push(DashboardLine { kind, text: fit(&header(job), width) });
            let mut wanted = per_job - 1;
            if remainder > 0 {
                wanted += 1;
                remainder -= 1;
            }
            let wanted = wanted.min(body - lines.len());
            for text in job.view.peek(wanted) {
                lines.push(DashboardLine { kind: LineKind::Log, text: fit(&text, width) });
            }
        }
    }
    while lines.len() < body {
        lines.push(DashboardLine { kind: LineKind::Blank, text: fit("", width) });
    }

    let footer = format!(
        "{}/{total} failed, {succeeded}/{total} completed, {}/{total} building",
        failed.len(),
        building.len(),
    );
    lines.push(DashboardLine { kind: LineKind::Footer, text: fit(&footer, width) });
    lines
}

fn header(job: &TrackedJob<LogTail>) -> String {
    format!("[{}] {}", job.state, job.image)
}

/// Cut or pad `text` to exactly `width` characters.
fn fit(text: &str, width: usize) -> String {
    let mut out: String = text.chars().take(width).collect();
    let len = out.chars().count();
    out.extend(std::iter::repeat(' ').take(width - len));
    out
}

#[cfg(test)]
#[path = "render_tests.rs"]
mod tests;
