// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln services`

use crate::prelude::*;

#[test]
fn lists_services_and_variants() {
    let temp = Project::with_config("");
    temp.file("services/api/Dockerfile", "FROM scratch\n");
    temp.file("services/api/debug.Dockerfile", "FROM scratch\n");
    temp.file("services/worker/Dockerfile", "FROM scratch\n");

    temp.kiln()
        .args(&["services"])
        .passes()
        .stdout_has("api        services/api  Dockerfile")
        .stdout_has("api-debug  services/api  debug.Dockerfile")
        .stdout_has("worker     services/worker  Dockerfile");
}

#[test]
fn ignored_directories_are_pruned() {
    let temp = Project::with_config("[build]\nignore_dirs = [\"vendor\"]\n");
    temp.file("api/Dockerfile", "FROM scratch\n");
    temp.file("vendor/lib/Dockerfile", "FROM scratch\n");

    temp.kiln().args(&["services"]).passes().stdout_has("api").stdout_lacks("lib");
}

#[test]
fn runs_from_a_nested_directory() {
    let temp = Project::with_config("");
    temp.file("api/Dockerfile", "FROM scratch\n");
    let nested = temp.path().join("api");

    temp.kiln().pwd(&nested).args(&["services"]).passes().stdout_has("api  api  Dockerfile");
}

#[test]
fn duplicate_names_are_a_configuration_error() {
    let temp = Project::with_config("");
    temp.file("a/api/Dockerfile", "FROM scratch\n");
    temp.file("b/api/Dockerfile", "FROM scratch\n");

    temp.kiln().args(&["services"]).code(1).stderr_has("defined twice");
}

#[test]
fn unknown_config_keys_are_rejected() {
    let temp = Project::with_config("[build]\nregistery = \"localhost:5000\"\n");
    temp.kiln().args(&["services"]).code(1).stderr_has("kiln.toml");
}

#[test]
fn missing_config_warns_but_works() {
    let temp = Project::empty();
    temp.file("api/Dockerfile", "FROM scratch\n");
    temp.kiln().args(&["services"]).passes().stdout_has("api").stderr_has("no kiln.toml found");
}
