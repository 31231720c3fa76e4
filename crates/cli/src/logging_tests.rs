// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use kiln_engine::FileLogger;
use yare::parameterized;

#[parameterized(
    kiln = { "kiln" },
    diagnostics = { "diagnostics" },
    dot_kiln = { ".kiln" },
)]
fn diagnostics_never_share_a_build_log(service: &str) {
    let logs = Path::new("/repo/logs");
    let logger = FileLogger::new(logs);
    assert_ne!(diagnostics_path(logs), logger.log_path(service));
}

#[test]
fn diagnostics_live_below_the_logs_dir() {
    let path = diagnostics_path(Path::new("/repo/logs"));
    assert_eq!(path, Path::new("/repo/logs/.kiln/diagnostics.log"));
    assert_ne!(path.parent(), Some(Path::new("/repo/logs")));
}
