// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Help and version output.

use crate::prelude::*;

#[test]
fn no_args_prints_usage_and_fails() {
    cli().code(2).stderr_has("Usage:");
}

#[test]
fn help_lists_commands() {
    cli().args(&["--help"]).passes().stdout_has("build").stdout_has("services");
}

#[test]
fn build_help_lists_flags() {
    cli()
        .args(&["build", "--help"])
        .passes()
        .stdout_has("--push")
        .stdout_has("--plaintext")
        .stdout_has("--keep-going")
        .stdout_has("--tag");
}

#[test]
fn version_includes_package_version() {
    cli().args(&["--version"]).passes().stdout_has(env!("CARGO_PKG_VERSION"));
}
