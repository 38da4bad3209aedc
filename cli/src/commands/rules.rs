// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Rules file commands
//!
//! Commands: show, validate

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::Colorize;
use std::path::PathBuf;

use juju_lint_core::infrastructure::RulesLoader;
use juju_lint_core::LintRules;

use crate::commands::lint::load_rules;

#[derive(Debug, Clone, Subcommand)]
pub enum RulesCommand {
    /// Show the effective rules after includes and overrides
    Show {
        /// Show rules file paths checked
        #[arg(long)]
        paths: bool,

        /// Subordinate overrides, e.g. `ntp:host only#nrpe:all`
        #[arg(short = 'o', long = "override-subordinate", value_name = "OVERRIDES")]
        override_subordinate: Option<String>,
    },

    /// Validate a rules file
    Validate {
        /// Path to rules file (default: discover)
        #[arg(value_name = "FILE")]
        file: Option<PathBuf>,
    },
}

pub async fn handle_command(command: RulesCommand, config_override: Option<PathBuf>) -> Result<()> {
    match command {
        RulesCommand::Show {
            paths,
            override_subordinate,
        } => show(config_override, paths, override_subordinate),
        RulesCommand::Validate { file } => validate(file.or(config_override)),
    }
}

fn show(config_override: Option<PathBuf>, show_paths: bool, overrides: Option<String>) -> Result<()> {
    if show_paths {
        println!("{}", "Rules discovery paths:".bold());
        match &config_override {
            Some(path) => println!("  1. --config flag: {}", path.display()),
            None => println!("  1. --config flag: {}", "(not set)".dimmed()),
        }
        println!(
            "  2. {}: {}",
            RulesLoader::ENV_VAR,
            std::env::var(RulesLoader::ENV_VAR)
                .unwrap_or_else(|_| "(not set)".to_string())
                .dimmed()
        );
        println!("  3. ./{}", RulesLoader::FILE_NAME);
        println!("  4. ~/.config/juju-lint/{}", RulesLoader::FILE_NAME);
        println!("  5. /etc/juju-lint/{}", RulesLoader::FILE_NAME);
        println!();
    }

    let (path, rules) = load_rules(config_override, overrides)?;
    println!("{} {}", "Rules file:".bold(), path.display());
    println!();
    let yaml = serde_yaml::to_string(&rules).context("Failed to render rules")?;
    println!("{}", yaml);
    Ok(())
}

fn validate(path: Option<PathBuf>) -> Result<()> {
    println!("Validating lint rules...");
    let (path, rules) = load_rules(path, None).context("Rules validation failed")?;
    println!(
        "{}",
        format!("✓ Rules are valid: {}", path.display()).green()
    );
    println!("  {}", summary(&rules));
    Ok(())
}

fn summary(rules: &LintRules) -> String {
    let known = rules
        .known_charms
        .as_ref()
        .map(|charms| charms.len().to_string())
        .unwrap_or_else(|| "any".to_string());
    format!(
        "known charms: {}, subordinates: {}, config rules: {}, relation rules: {}",
        known,
        rules.subordinates.len(),
        rules.config.values().map(|keys| keys.len()).sum::<usize>(),
        rules.relations.as_ref().map(Vec::len).unwrap_or(0)
    )
}
