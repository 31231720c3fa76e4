// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln build` up to the point where the build engine is needed.

use crate::prelude::*;

/// A project with one service and an image loader that needs no docker.
fn project() -> Project {
    let temp = Project::with_config("[build]\nload_command = [\"cat\"]\n");
    temp.file("api/Dockerfile", "FROM scratch\n");
    temp
}

#[test]
fn push_without_registry_is_rejected() {
    project()
        .kiln()
        .args(&["build", "--plaintext", "--tag", "t", "--push"])
        .code(1)
        .stderr_has("--push needs a registry");
}

#[test]
fn bad_registry_scheme_is_rejected() {
    project()
        .kiln()
        .args(&["build", "--plaintext", "--tag", "t", "--registry", "ftp://host"])
        .code(1)
        .stderr_has("unsupported registry");
}

#[test]
fn unknown_service_is_rejected() {
    project()
        .kiln()
        .args(&["build", "--plaintext", "--tag", "t", "nope"])
        .code(1)
        .stderr_has("unknown service 'nope'");
}

#[test]
fn empty_project_has_nothing_to_build() {
    Project::with_config("")
        .kiln()
        .args(&["build", "--plaintext", "--tag", "t"])
        .code(1)
        .stderr_has("no services found");
}

#[test]
fn unreachable_engine_fails_the_job_and_writes_logs() {
    let temp = project();
    temp.kiln()
        .args(&["build", "--plaintext", "--tag", "t"])
        .env("KILN_ENGINE_ADDR", &closed_tcp_addr())
        .code(1)
        .stdout_has("[api:t] JOB FAILED:")
        .stdout_has("Could not connect to build daemon!")
        .stdout_has("Failed to build: api")
        .stdout_has("See the logs folder for details.")
        .stderr_has("1 service failed to build");

    let log = temp.read("logs/api.log");
    assert!(log.contains("Could not connect to build daemon!"), "log: {log}");
    assert!(log.contains("Build failed!"), "log: {log}");
}

#[test]
fn plaintext_can_be_forced_from_the_environment() {
    let temp = project();
    temp.kiln()
        .args(&["build", "--tag", "t", "--registry", "http://localhost:5000"])
        .env("PLAINTEXT_INTERFACE", "1")
        .env("KILN_ENGINE_ADDR", &closed_tcp_addr())
        .code(1)
        .stdout_has("[localhost:5000/api:t] JOB FAILED:");
}
