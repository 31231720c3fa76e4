// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Build tag derived from the git tree.
//!
//! The tag is the tree hash of the repository as it would be committed with
//! every change under the service directories staged. A scratch copy of the
//! index is used so the user's staging area is never touched.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Characters of the tree hash kept in the tag
pub const TAG_LEN: usize = 12;

/// Errors from git operations
#[derive(Debug, Error)]
pub enum GitError {
    #[error("failed to run git: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("git {args} failed: {stderr}")]
    Command { args: String, stderr: String },
}

/// Tree hash of `root`'s repository with `dirs` staged, cut to [`TAG_LEN`].
pub async fn current_tree_hash(root: &Path, dirs: &[PathBuf]) -> Result<String, GitError> {
    let toplevel = PathBuf::from(git(root, &["rev-parse", "--show-toplevel"], None).await?);
    let index = git(&toplevel, &["rev-parse", "--git-path", "index"], None).await?;
    let index = toplevel.join(index);

    let scratch_dir = tempfile::Builder::new().prefix("kiln-index-").tempdir()?;
    let scratch = scratch_dir.path().join("index");
    if index.exists() {
        tokio::fs::copy(&index, &scratch).await?;
    }

    let mut add = vec!["add".to_string(), "-A".to_string(), "--".to_string()];
    if dirs.is_empty() {
        add.push(".".to_string());
    } else {
        add.extend(dirs.iter().map(|d| d.display().to_string()));
    }
    let add: Vec<&str> = add.iter().map(String::as_str).collect();
    git(&toplevel, &add, Some(&scratch)).await?;

    let tree = git(&toplevel, &["write-tree"], Some(&scratch)).await?;
    Ok(tree.chars().take(TAG_LEN).collect())
}

/// Run git in `dir` and return its trimmed stdout.
async fn git(dir: &Path, args: &[&str], index: Option<&Path>) -> Result<String, GitError> {
    let mut cmd = Command::new("git");
    cmd.args(args).current_dir(dir).env_remove("GIT_DIR").env_remove("GIT_WORK_TREE");
    if let Some(index) = index {
        cmd.env("GIT_INDEX_FILE", index);
    }
    let output = cmd.output().await?;
    if !output.status.success() {
        return Err(GitError::Command {
            args: args.join(" "),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

#[cfg(test)]
#[path = "git_tests.rs"]
mod tests;
