// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn adapter_cancellation_becomes_build_cancellation() {
    assert!(BuildError::from(EngineError::Cancelled).is_cancelled());
    assert!(BuildError::from(LoadError::Cancelled).is_cancelled());
}

#[test]
fn adapter_failures_keep_their_message() {
    let err = BuildError::from(EngineError::Build("failed to solve: exit code 2".into()));
    assert!(!err.is_cancelled());
    assert_eq!(err.to_string(), "failed to solve: exit code 2");

    let failed = LoadError::Failed { status: "exit status: 1".into(), stderr: "bad tar".into() };
    let err = BuildError::from(failed);
    assert_eq!(err.to_string(), "image load exited with exit status: 1: bad tar");
}
