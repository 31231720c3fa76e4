// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Project discovery and `kiln.toml`.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_FILE: &str = "kiln.toml";

/// Build engine control address when neither flag nor config sets one
pub const DEFAULT_ENGINE_ADDR: &str = "tcp://127.0.0.1:31652";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {source}", path.display())]
    Read { path: PathBuf, source: std::io::Error },
    #[error("invalid {}: {source}", path.display())]
    Parse { path: PathBuf, source: toml::de::Error },
    #[error("unsupported registry '{0}': expected http://, https://, or a bare host")]
    Registry(String),
    #[error("--push needs a registry: set build.registry in kiln.toml or pass --registry")]
    PushWithoutRegistry,
    #[error("build.load_command must not be empty")]
    EmptyLoadCommand,
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub build: BuildConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BuildConfig {
    /// Directories pruned from discovery, relative to the project root
    pub ignore_dirs: Vec<PathBuf>,
    /// Environment variables forwarded as build arguments when set
    pub build_args: Vec<String>,
    pub registry: Option<String>,
    pub engine_addr: Option<String>,
    /// argv of the local image-load process
    pub load_command: Option<Vec<String>>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            ignore_dirs: Vec::new(),
            build_args: vec!["KILN_ENV".to_string(), "CI".to_string()],
            registry: None,
            engine_addr: None,
            load_command: None,
        }
    }
}

impl Config {
    pub fn parse(path: &Path, text: &str) -> Result<Self, ConfigError> {
        toml::from_str(text)
            .map_err(|source| ConfigError::Parse { path: path.to_path_buf(), source })
    }

    /// Read `<root>/kiln.toml`; a missing file is the default config.
    pub fn load(root: &Path) -> Result<Option<Self>, ConfigError> {
        let path = root.join(CONFIG_FILE);
        match std::fs::read_to_string(&path) {
            Ok(text) => Self::parse(&path, &text).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(ConfigError::Read { path, source }),
        }
    }
}

/// A registry host and whether it speaks plain HTTP.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registry {
    pub host: String,
    pub insecure: bool,
}

impl Registry {
    pub fn parse(value: &str) -> Result<Self, ConfigError> {
        let (host, insecure) = match value.split_once("://") {
            Some(("http", host)) => (host, true),
            Some(("https", host)) => (host, false),
            Some(_) => return Err(ConfigError::Registry(value.to_string())),
            None => (value, false),
        };
        let host = host.trim_end_matches('/');
        if host.is_empty() {
            return Err(ConfigError::Registry(value.to_string()));
        }
        Ok(Self { host: host.to_string(), insecure })
    }
}

/// The repository being built.
#[derive(Debug, Clone)]
pub struct Project {
    pub root: PathBuf,
    pub config: Config,
    /// Whether `kiln.toml` was found
    pub configured: bool,
}

impl Project {
    /// Root is `root_override`, else the nearest ancestor of `cwd` holding
    /// `kiln.toml`, else `cwd` itself.
    pub fn locate(root_override: Option<PathBuf>, cwd: &Path) -> Result<Self, ConfigError> {
        let root = root_override.or_else(|| find_root(cwd)).unwrap_or_else(|| cwd.to_path_buf());
        let config = Config::load(&root)?;
        Ok(Self { root, configured: config.is_some(), config: config.unwrap_or_default() })
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
}

/// Nearest ancestor of `start` (inclusive) that holds a `kiln.toml`.
pub fn find_root(start: &Path) -> Option<PathBuf> {
    start.ancestors().find(|dir| dir.join(CONFIG_FILE).is_file()).map(Path::to_path_buf)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
