// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Lint command
//!
//! Loads the rules once and lints every file on its own blocking task.

use anyhow::{Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use juju_lint_core::infrastructure::RulesLoader;
use juju_lint_core::{CloudType, LintReport, LintRules, LintSettings, Linter};

use crate::output::{render_json, render_text, OutputFormat};

#[derive(Debug, Clone, Args)]
pub struct LintCommand {
    /// Bundle or `juju status --format yaml` files to lint
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<PathBuf>,

    /// Cloud type (openstack, kubernetes); detected from the charms when unset
    #[arg(short = 't', long, env = "JUJU_LINT_CLOUD_TYPE")]
    pub cloud_type: Option<String>,

    /// Subordinate overrides, e.g. `ntp:host only#nrpe:all`
    #[arg(short = 'o', long = "override-subordinate", value_name = "OVERRIDES")]
    pub override_subordinate: Option<String>,

    /// Output format
    #[arg(short = 'F', long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Cloud name shown in reports (default: the file name)
    #[arg(long, env = "JUJU_LINT_CLOUD_NAME")]
    pub name: Option<String>,

    /// Controller name shown in reports
    #[arg(long, env = "JUJU_LINT_CONTROLLER", default_value = "manual")]
    pub controller: String,

    /// Model name shown in reports
    #[arg(long, env = "JUJU_LINT_MODEL", default_value = "manual")]
    pub model: String,

    /// Also print warnings raised while linting
    #[arg(short, long)]
    pub verbose: bool,
}

impl LintCommand {
    fn settings_for(&self, file: &Path, rules_path: &Path) -> LintSettings {
        let name = self.name.clone().unwrap_or_else(|| {
            file.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_else(|| "manual".to_string())
        });
        let cloud_type = self
            .cloud_type
            .as_deref()
            .and_then(|raw| raw.parse::<CloudType>().ok());
        LintSettings::new(name)
            .with_controller(self.controller.clone())
            .with_model(self.model.clone())
            .with_cloud_type(cloud_type)
            .with_rules_name(rules_path.display().to_string())
    }
}

pub fn load_rules(config: Option<PathBuf>, overrides: Option<String>) -> Result<(PathBuf, LintRules)> {
    let path = RulesLoader::resolve(config).context("Failed to locate lint rules")?;
    let rules = RulesLoader::new(&path)
        .with_overrides(overrides)
        .load()
        .with_context(|| format!("Failed to load lint rules from {}", path.display()))?;
    Ok((path, rules))
}

/// Returns `true` when every model passed.
pub async fn execute(command: LintCommand, config: Option<PathBuf>) -> Result<bool> {
    let (rules_path, rules) = load_rules(config, command.override_subordinate.clone())?;
    let rules = Arc::new(rules);
    info!("Lint rules loaded from {}", rules_path.display());

    let mut handles = Vec::with_capacity(command.files.len());
    for file in &command.files {
        let linter = Linter::new(rules.clone(), command.settings_for(file, &rules_path));
        let file = file.clone();
        handles.push(tokio::task::spawn_blocking(move || lint_file(&linter, &file)));
    }

    let mut reports = Vec::with_capacity(handles.len());
    for handle in handles {
        reports.push(handle.await.context("Lint task panicked")??);
    }

    match command.format {
        OutputFormat::Json => println!("{}", render_json(&reports)?),
        OutputFormat::Text => {
            for report in &reports {
                println!("{}", render_text(report, command.verbose));
            }
        }
    }

    Ok(reports.iter().all(LintReport::passed))
}

fn lint_file(linter: &Linter, file: &Path) -> Result<LintReport> {
    debug!("Linting {}", file.display());
    let yaml = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    linter
        .lint_yaml_str(&yaml)
        .with_context(|| format!("Failed to lint {}", file.display()))
}
