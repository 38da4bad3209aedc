// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Linter
//!
//! Runs every rule engine over one model and gathers the violations into a
//! [`LintReport`].
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Orchestrates a single lint pass
//!
//! # Pass order
//!
//! 1. Select the authoritative document and build its topology view
//! 2. Map charms, settle the cloud type, collect cross-model applications
//! 3. Config assertions, subordinate placement, charm inventory, relation rules
//! 4. Space bindings (bundles) or AZ balance and statuses (status documents)
//! 5. Placement and AZ balance findings are reported last
//!
//! A `Linter` holds no per-model state: each pass builds its own view and
//! diagnostics sink, so one instance can lint many models concurrently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::application::az_balance::{check_azs, AzFindings, Unbalanced};
use crate::application::charm_inventory::{
    cmr_applications, resolve_cloud_type, unmapped_applications, CharmChecker,
};
use crate::application::config_assertion::ConfigAssertionEngine;
use crate::application::placement::PlacementEngine;
use crate::application::relation_rules::RelationRuleEngine;
use crate::application::space_check::SpaceChecker;
use crate::application::status_check::StatusChecker;
use crate::domain::cloud::CloudType;
use crate::domain::diagnostics::{Diagnostic, Diagnostics};
use crate::domain::error::LintError;
use crate::domain::rules::LintRules;
use crate::domain::violation::Violation;
use crate::infrastructure::document::{select_main_document, TopologyDocument};
use crate::infrastructure::load_topology;

// ============================================================================
// Settings & Report
// ============================================================================

/// Identifies the linted model and tunes the pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintSettings {
    pub cloud_name: String,
    pub controller: String,
    pub model: String,
    /// Detected from the deployed charms when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloud_type: Option<CloudType>,
    /// Rules file the rules were loaded from, echoed in the report.
    #[serde(default)]
    pub rules_name: String,
}

impl LintSettings {
    pub fn new(cloud_name: impl Into<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            controller: "manual".to_string(),
            model: "manual".to_string(),
            ..Default::default()
        }
    }

    pub fn with_controller(mut self, controller: impl Into<String>) -> Self {
        self.controller = controller.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_cloud_type(mut self, cloud_type: Option<CloudType>) -> Self {
        self.cloud_type = cloud_type;
        self
    }

    pub fn with_rules_name(mut self, rules_name: impl Into<String>) -> Self {
        self.rules_name = rules_name.into();
        self
    }

    fn diagnostics(&self) -> Diagnostics {
        Diagnostics::new(&self.cloud_name, &self.controller, &self.model)
    }
}

/// Outcome of linting one model.
#[derive(Debug, Clone, Serialize)]
pub struct LintReport {
    pub name: String,
    pub controller: String,
    pub model: String,
    pub rules: String,
    pub errors: Vec<Violation>,
    /// Warnings and log lines of the pass; not part of the JSON report.
    #[serde(skip)]
    pub diagnostics: Vec<Diagnostic>,
}

impl LintReport {
    fn empty(settings: &LintSettings) -> Self {
        Self {
            name: settings.cloud_name.clone(),
            controller: settings.controller.clone(),
            model: settings.model.clone(),
            rules: settings.rules_name.clone(),
            errors: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }
}

// ============================================================================
// Linter
// ============================================================================

pub struct Linter {
    rules: Arc<LintRules>,
    settings: LintSettings,
    clock: Option<DateTime<Utc>>,
}

impl Linter {
    pub fn new(rules: Arc<LintRules>, settings: LintSettings) -> Self {
        Self {
            rules,
            settings,
            clock: None,
        }
    }

    /// Pin the reference time used by the status checks.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    pub fn settings(&self) -> &LintSettings {
        &self.settings
    }

    /// Lint a YAML stream, picking its authoritative document first.
    pub fn lint_yaml_str(&self, yaml: &str) -> Result<LintReport, LintError> {
        let document = select_main_document(yaml)?;
        self.lint_document(&document)
    }

    pub fn lint_document(&self, document: &TopologyDocument) -> Result<LintReport, LintError> {
        let mut diagnostics = self.settings.diagnostics();
        let mut report = LintReport::empty(&self.settings);

        if !document.has_applications() {
            diagnostics.warn("Model contains no applications, skipping.");
            report.diagnostics = diagnostics.entries().to_vec();
            return Ok(report);
        }

        let mut pass = Pass {
            diagnostics,
            errors: Vec::new(),
        };
        let view = load_topology(document, &mut pass.diagnostics)?;

        pass.collect(unmapped_applications(document));
        let charms = view.charms();
        let cloud_type = resolve_cloud_type(self.settings.cloud_type.clone(), &charms, &mut pass.diagnostics);
        let cmr_apps = cmr_applications(document, &pass.diagnostics);

        let config = ConfigAssertionEngine::new(&self.rules, cloud_type.as_ref());
        let violations = config.evaluate(document, view.app_to_charm(), &mut pass.diagnostics);
        pass.collect(violations);

        let placement = PlacementEngine::new(&self.rules).evaluate(view.as_ref(), &mut pass.diagnostics)?;

        let charm_checks = CharmChecker::new(&self.rules, cloud_type.as_ref());
        let violations = charm_checks.evaluate(&charms, &cmr_apps, &pass.diagnostics);
        pass.collect(violations);

        if let Some(relation_rules) = &self.rules.relations {
            let violations = RelationRuleEngine::new(relation_rules).evaluate(view.as_ref(), &mut pass.diagnostics);
            pass.collect(violations);
        }

        let mut unbalanced: Vec<Unbalanced> = Vec::new();
        if document.is_bundle() {
            // export-bundle omits bindings entirely when none are customised
            if document.applications().any(|(_, app)| app.bindings.is_some()) {
                let spaces = SpaceChecker::new(&self.rules.space_checks);
                let violations = spaces.evaluate(document, view.app_to_charm(), &mut pass.diagnostics);
                pass.collect(violations);
            } else {
                pass.diagnostics.warn(
                    "Relations detected but explicit bindings not found; Not specifying explicit bindings \
                     may cause problems on models with multiple network spaces.",
                );
            }
            pass.diagnostics
                .debug("Relations data found; assuming a bundle and skipping AZ and status checks.");
        } else {
            pass.diagnostics
                .debug("Bundle relations data not found; skipping space binding checks.");
            match check_azs(document, &mut pass.diagnostics) {
                AzFindings::Checked(apps) => unbalanced = apps,
                invalid => pass.collect(invalid.violations()),
            }
            let now = self.clock.unwrap_or_else(Utc::now);
            let violations = StatusChecker::new(now).evaluate(document, &mut pass.diagnostics);
            pass.collect(violations);
        }

        pass.collect(placement.violations(view.as_ref()));
        pass.collect(unbalanced.iter().map(Unbalanced::violation).collect());

        report.errors = pass.errors;
        report.diagnostics = pass.diagnostics.entries().to_vec();
        Ok(report)
    }
}

/// Mutable state of one lint pass.
struct Pass {
    diagnostics: Diagnostics,
    errors: Vec<Violation>,
}

impl Pass {
    fn collect(&mut self, violations: Vec<Violation>) {
        for violation in violations {
            self.diagnostics.error(violation.message.clone());
            self.errors.push(violation);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::violation::ViolationKind;

    const RULES: &str = r#"
known charms: [ubuntu, ntp]
subordinates:
  ntp:
    where: all
"#;

    const STATUS: &str = r#"
machines:
  "0":
    hardware: availability-zone=zone1
applications:
  ubuntu:
    charm: cs:ubuntu-18
    application-status: {current: active}
    units:
      ubuntu/0:
        machine: "0"
        workload-status: {current: active}
        juju-status: {current: idle}
        subordinates:
          ntp/0:
            workload-status: {current: active}
  ntp:
    charm: cs:ntp-47
    application-status: {current: active}
"#;

    fn linter() -> Linter {
        let rules = LintRules::from_yaml_str(RULES).unwrap();
        Linter::new(Arc::new(rules), LintSettings::new("test").with_rules_name("lint-rules.yaml"))
    }

    #[test]
    fn test_report_metadata() {
        let report = linter().lint_yaml_str(STATUS).unwrap();
        assert_eq!(report.name, "test");
        assert_eq!(report.controller, "manual");
        assert_eq!(report.model, "manual");
        assert_eq!(report.rules, "lint-rules.yaml");

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("errors").is_some());
        assert!(json.get("diagnostics").is_none());
    }

    #[test]
    fn test_single_zone_status_reports_az_count() {
        let report = linter().lint_yaml_str(STATUS).unwrap();
        let kinds: Vec<_> = report.errors.iter().map(Violation::kind).collect();
        assert_eq!(kinds, vec![ViolationKind::AzInvalidNumber]);
        assert!(!report.passed());
    }

    #[test]
    fn test_no_applications_is_empty_report() {
        let report = linter().lint_yaml_str("machines: {}\n").unwrap();
        assert!(report.passed());
        assert!(report
            .diagnostics
            .iter()
            .any(|d| d.message == "Model contains no applications, skipping."));
    }

    #[test]
    fn test_malformed_charm_is_fatal() {
        let yaml = "applications:\n  broken:\n    charm: \"cs:???\"\n";
        assert!(matches!(linter().lint_yaml_str(yaml), Err(LintError::MalformedCharm(_))));
    }
}
