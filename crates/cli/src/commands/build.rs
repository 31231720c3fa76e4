// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `kiln build`

use crate::config::{BuildConfig, ConfigError, Project, Registry, DEFAULT_ENGINE_ADDR};
use crate::env;
use crate::exit_error::ExitError;
use anyhow::Context;
use clap::Args;
use kiln_adapters::{current_tree_hash, BuildctlEngine, CommandLoader};
use kiln_core::{discover, BuildableService};
use kiln_engine::{
    BuildSettings, Builder, Campaign, CampaignOutcome, FileLogger, InteractiveInterface, Interface,
    PlaintextInterface,
};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub struct BuildArgs {
    /// Services to build (default: all)
    pub services: Vec<String>,

    /// Push to the registry instead of loading images locally
    #[arg(long)]
    pub push: bool,

    /// Registry to tag and push images to, e.g. http://localhost:5000
    #[arg(long)]
    pub registry: Option<String>,

    /// Build tag (default: git tree hash of the service directories)
    #[arg(short = 't', long)]
    pub tag: Option<String>,

    /// Print sequential text instead of the live dashboard
    #[arg(
        long,
        env = "PLAINTEXT_INTERFACE",
        value_parser = clap::builder::FalseyValueParser::new()
    )]
    pub plaintext: bool,

    /// Keep building the other services when one fails
    #[arg(long)]
    pub keep_going: bool,

    /// Build engine control address
    #[arg(long, env = "KILN_ENGINE_ADDR")]
    pub engine_addr: Option<String>,
}

/// Campaign settings from flags layered over `kiln.toml`.
pub fn resolve_settings(
    config: &BuildConfig,
    args: &BuildArgs,
    tag: String,
    build_args: BTreeMap<String, String>,
) -> Result<BuildSettings, ConfigError> {
    let registry =
        args.registry.as_deref().or(config.registry.as_deref()).map(Registry::parse).transpose()?;
    if args.push && registry.is_none() {
        return Err(ConfigError::PushWithoutRegistry);
    }
    let mut settings = BuildSettings::new(tag).push(args.push).build_args(build_args);
    if let Some(registry) = registry {
        settings = settings.registry(registry.host).registry_insecure(registry.insecure);
    }
    Ok(settings)
}

pub fn resolve_engine_addr(config: &BuildConfig, args: &BuildArgs) -> String {
    args.engine_addr
        .clone()
        .or_else(|| config.engine_addr.clone())
        .unwrap_or_else(|| DEFAULT_ENGINE_ADDR.to_string())
}

pub fn resolve_loader(config: &BuildConfig) -> Result<CommandLoader, ConfigError> {
    match &config.load_command {
        Some(argv) => CommandLoader::from_argv(argv).ok_or(ConfigError::EmptyLoadCommand),
        None => Ok(CommandLoader::default()),
    }
}

/// Keep only the named services, in discovery order; no names keeps all.
pub fn select(
    services: Vec<BuildableService>,
    names: &[String],
) -> Result<Vec<BuildableService>, ExitError> {
    if let Some(unknown) = names.iter().find(|name| !services.iter().any(|s| &s.name == *name)) {
        return Err(ExitError::failed(format!("unknown service '{unknown}'")));
    }
    if names.is_empty() {
        return Ok(services);
    }
    Ok(services.into_iter().filter(|s| names.contains(&s.name)).collect())
}

fn open_interface(dashboard: bool) -> Arc<dyn Interface> {
    if dashboard {
        match InteractiveInterface::new() {
            Ok(iface) => return Arc::new(iface),
            Err(e) => tracing::info!(error = %e, "falling back to plaintext output"),
        }
    }
    Arc::new(PlaintextInterface::new())
}

pub async fn run(project: &Project, args: BuildArgs, dashboard: bool) -> anyhow::Result<()> {
    let config = &project.config.build;
    let services = select(discover(&project.root, &config.ignore_dirs)?, &args.services)?;
    if services.is_empty() {
        return Err(ExitError::failed(format!(
            "no services found under {}",
            project.root.display()
        ))
        .into());
    }

    let tag = match &args.tag {
        Some(tag) => tag.clone(),
        None => {
            let dirs: Vec<_> = services.iter().map(|s| s.dir.clone()).collect();
            current_tree_hash(&project.root, &dirs)
                .await
                .context("cannot compute the build tag, pass --tag to set one")?
        }
    };
    let settings = resolve_settings(config, &args, tag, env::build_args(&config.build_args))?;
    let engine = BuildctlEngine::new(resolve_engine_addr(config, &args));
    let loader = resolve_loader(config)?;
    tracing::info!(
        services = services.len(),
        tag = %settings.build_tag,
        push = settings.push,
        "starting build"
    );

    let interface = open_interface(dashboard);
    let logger = Arc::new(FileLogger::new(project.logs_dir()));
    let builder =
        Builder::new(engine, loader, Arc::clone(&logger), Arc::clone(&interface), settings);
    let outcome = Campaign::new(builder).keep_going(args.keep_going).run(services).await;

    if let Err(e) = interface.close() {
        tracing::warn!(error = %e, "failed to close the build interface");
    }
    if let Err(e) = logger.close() {
        tracing::warn!(error = %e, "failed to close build logs");
    }

    match outcome? {
        CampaignOutcome::Succeeded => Ok(()),
        CampaignOutcome::Failed(failed) => {
            let noun = if failed == 1 { "service" } else { "services" };
            Err(ExitError::failed(format!("{failed} {noun} failed to build")).into())
        }
        CampaignOutcome::Cancelled => {
            // step past the echoed ^C
            println!();
            Err(ExitError::cancelled().into())
        }
    }
}

#[cfg(test)]
#[path = "build_tests.rs"]
mod tests;
