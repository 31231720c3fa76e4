// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! kiln: build every container image in a monorepo

mod color;
mod commands;
mod config;
mod env;
mod exit_error;
mod logging;

use clap::{Parser, Subcommand};
use commands::build::BuildArgs;
use config::Project;
use std::io::IsTerminal;

#[derive(Parser)]
#[command(name = "kiln", version = env::VERSION, styles = color::styles())]
#[command(about = "Build the container images of every service in a repository")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build some (or all, by default) services
    Build(BuildArgs),
    /// List the services that would be built
    Services,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        let (code, message) = exit_error::exit_status(&err);
        if !message.is_empty() {
            eprintln!("Error: {message}");
        }
        std::process::exit(code);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;
    let project = Project::locate(env::root_override(), &cwd)?;

    let dashboard = match &cli.command {
        Command::Build(args) => !args.plaintext && std::io::stdout().is_terminal(),
        Command::Services => false,
    };
    let logs_dir = project.logs_dir();
    let _guard = logging::init(dashboard.then_some(logs_dir.as_path()))?;
    if !project.configured {
        tracing::warn!(
            root = %project.root.display(),
            "no {} found, using the current directory as the project root",
            config::CONFIG_FILE
        );
    }

    match cli.command {
        Command::Build(args) => commands::build::run(&project, args, dashboard).await,
        Command::Services => commands::services::run(&project),
    }
}
