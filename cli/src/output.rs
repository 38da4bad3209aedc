// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Report rendering: coloured text for terminals, JSON for tooling.

use anyhow::{Context, Result};
use clap::ValueEnum;
use colored::Colorize;

use juju_lint_core::{DiagnosticLevel, LintReport};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

/// A single report renders as an object, several as an array.
pub fn render_json(reports: &[LintReport]) -> Result<String> {
    let rendered = match reports {
        [report] => serde_json::to_string_pretty(report),
        reports => serde_json::to_string_pretty(reports),
    };
    rendered.context("Failed to serialize lint report")
}

pub fn render_text(report: &LintReport, verbose: bool) -> String {
    let mut lines = vec![format!(
        "{} [{}] [{}/{}] (rules: {})",
        "Lint report".bold(),
        report.name,
        report.controller,
        report.model,
        if report.rules.is_empty() { "-" } else { report.rules.as_str() }
    )];

    if verbose {
        for diagnostic in &report.diagnostics {
            if diagnostic.level == DiagnosticLevel::Warning {
                lines.push(format!("  {} {}", "!".yellow(), diagnostic.message.dimmed()));
            }
        }
    }

    if report.passed() {
        lines.push(format!("  {}", "✓ No policy violations".green()));
    } else {
        for violation in &report.errors {
            lines.push(format!("  {} {}", "✗".red(), violation.to_string().red()));
        }
        lines.push(format!(
            "  {}",
            format!("{} violation(s)", report.errors.len()).red().bold()
        ));
    }
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use juju_lint_core::{LintRules, LintSettings, Linter};
    use std::sync::Arc;

    fn report(rules: &str) -> LintReport {
        let rules = LintRules::from_yaml_str(rules).unwrap();
        Linter::new(Arc::new(rules), LintSettings::new("cloud").with_rules_name("rules.yaml"))
            .lint_yaml_str("applications:\n  ubuntu:\n    charm: cs:ubuntu-18\nrelations: []\n")
            .unwrap()
    }

    #[test]
    fn test_render_text_lists_violations() {
        let text = render_text(&report("known charms: [ntp]\n"), false);
        assert!(text.contains("[cloud] [manual/manual] (rules: rules.yaml)"));
        assert!(text.contains("[unrecognised-charm] Charm 'ubuntu' not recognised"));
        assert!(text.contains("1 violation(s)"));
    }

    #[test]
    fn test_render_text_clean() {
        let text = render_text(&report("known charms: [ubuntu]\n"), false);
        assert!(text.contains("No policy violations"));
    }

    #[test]
    fn test_render_json_single_and_many() {
        let single = report("known charms: [ntp]\n");
        let json: serde_json::Value = serde_json::from_str(&render_json(&[single.clone()]).unwrap()).unwrap();
        assert_eq!(json["name"], "cloud");
        assert_eq!(json["errors"][0]["id"], "unrecognised-charm");

        let many: serde_json::Value =
            serde_json::from_str(&render_json(&[single.clone(), single]).unwrap()).unwrap();
        assert_eq!(many.as_array().unwrap().len(), 2);
    }
}
