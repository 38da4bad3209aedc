// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! # juju-lint
//!
//! Checks Juju bundles and `juju status` exports against a site policy.
//!
//! ## Commands
//!
//! - `juju-lint lint FILE...` - Lint one or more models
//! - `juju-lint rules show|validate` - Inspect the rules file
//!
//! The rules file is taken from `--config`, `JUJU_LINT_RULES`,
//! `./lint-rules.yaml`, the user config directory or `/etc/juju-lint`.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;

use juju_lint_cli::commands::{self, LintCommand, RulesCommand};

/// Lint Juju models against site policy
#[derive(Parser)]
#[command(name = "juju-lint")]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to the lint rules file (overrides discovery)
    #[arg(
        short,
        long,
        global = true,
        env = "JUJU_LINT_RULES",
        value_name = "FILE"
    )]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, global = true, env = "JUJU_LINT_LOG_LEVEL", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint bundle or status files
    #[command(name = "lint")]
    Lint {
        #[command(flatten)]
        command: LintCommand,
    },

    /// Rules file management
    #[command(name = "rules")]
    Rules {
        #[command(subcommand)]
        command: RulesCommand,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(&cli.log_level)?;

    match cli.command {
        Some(Commands::Lint { command }) => {
            let passed = commands::lint::execute(command, cli.config).await?;
            if !passed {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Commands::Rules { command }) => {
            commands::rules::handle_command(command, cli.config).await
        }
        None => {
            eprintln!("{}", "No command specified. Use --help for usage.".yellow());
            std::process::exit(2);
        }
    }
}

/// Initialize tracing subscriber for logging
fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(level))
        .context("Failed to create log filter")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .init();

    Ok(())
}
