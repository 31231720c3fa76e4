// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serial_test::serial;

#[test]
#[serial]
fn rows_align_names_and_show_relative_dirs() {
    std::env::set_var("NO_COLOR", "1");
    let root = Path::new("/repo");
    let services = vec![
        BuildableService::new("/repo/services/api", "Dockerfile", "api"),
        BuildableService::new("/repo/services/api", "debug.Dockerfile", "api-debug"),
        BuildableService::new("/repo", "Dockerfile", "repo"),
    ];
    assert_eq!(
        rows(root, &services),
        vec![
            "api        services/api  Dockerfile",
            "api-debug  services/api  debug.Dockerfile",
            "repo       .  Dockerfile",
        ]
    );
    std::env::remove_var("NO_COLOR");
}
