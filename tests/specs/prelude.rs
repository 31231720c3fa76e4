// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fluent helpers for running `kiln` against scratch projects.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// `kiln` with no project environment.
pub fn cli() -> Cli {
    Cli::new()
}

pub struct Cli {
    cmd: assert_cmd::Command,
}

impl Cli {
    fn new() -> Self {
        let mut cmd = assert_cmd::Command::cargo_bin("kiln").unwrap();
        for var in ["KILN_ROOT", "KILN_LOG", "KILN_ENGINE_ADDR", "PLAINTEXT_INTERFACE", "COLOR"] {
            cmd.env_remove(var);
        }
        cmd.env("NO_COLOR", "1");
        Self { cmd }
    }

    pub fn args(mut self, args: &[&str]) -> Self {
        self.cmd.args(args);
        self
    }

    pub fn env(mut self, key: &str, value: &str) -> Self {
        self.cmd.env(key, value);
        self
    }

    pub fn pwd(mut self, dir: &Path) -> Self {
        self.cmd.current_dir(dir);
        self
    }

    /// Run and require exit status 0.
    pub fn passes(self) -> Run {
        self.code(0)
    }

    /// Run and require a non-zero exit status.
    pub fn fails(mut self) -> Run {
        let run = Run::from(self.cmd.output().unwrap());
        assert_ne!(run.code, Some(0), "expected failure\n{run}");
        run
    }

    /// Run and require a specific exit status.
    pub fn code(mut self, code: i32) -> Run {
        let run = Run::from(self.cmd.output().unwrap());
        assert_eq!(run.code, Some(code), "unexpected exit status\n{run}");
        run
    }
}

pub struct Run {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl From<std::process::Output> for Run {
    fn from(output: std::process::Output) -> Self {
        Self {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}

impl std::fmt::Display for Run {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "status: {:?}\n--- stdout\n{}--- stderr\n{}", self.code, self.stdout, self.stderr)
    }
}

impl Run {
    pub fn stdout_has(self, needle: &str) -> Self {
        assert!(self.stdout.contains(needle), "stdout lacks {needle:?}\n{self}");
        self
    }

    pub fn stdout_lacks(self, needle: &str) -> Self {
        assert!(!self.stdout.contains(needle), "stdout has {needle:?}\n{self}");
        self
    }

    pub fn stderr_has(self, needle: &str) -> Self {
        assert!(self.stderr.contains(needle), "stderr lacks {needle:?}\n{self}");
        self
    }
}

/// A scratch repository.
pub struct Project {
    dir: TempDir,
}

impl Project {
    pub fn empty() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    /// A project with a `kiln.toml`.
    pub fn with_config(config: &str) -> Self {
        let project = Self::empty();
        project.file("kiln.toml", config);
        project
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn file(&self, rel: &str, content: &str) -> PathBuf {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.dir.path().join(rel)).unwrap_or_default()
    }

    /// `kiln` running inside this project.
    pub fn kiln(&self) -> Cli {
        cli().pwd(self.dir.path())
    }
}

/// A loopback TCP address with nothing listening on it.
pub fn closed_tcp_addr() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("tcp://127.0.0.1:{port}")
}
