// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Status Checker
//!
//! Flags machines, containers, applications and units of a status document
//! whose workload or agent status is not the healthy one.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Runtime health of a live model
//!
//! Units that have been `executing` for less than an hour are tolerated;
//! the reference clock is passed in so results are reproducible.

use chrono::{DateTime, Duration, NaiveDateTime, Utc};

use crate::domain::diagnostics::Diagnostics;
use crate::domain::violation::{Violation, ViolationKind};
use crate::infrastructure::document::{MachineSpec, StatusInfo, TopologyDocument, UnitSpec};

/// Longest time a unit may stay `executing` before it is reported.
pub const MAX_UNIT_EXECUTION_SECONDS: i64 = 3600;

const EXECUTING: &str = "executing";

/// Parse a Juju `since` timestamp: `23 Mar 2021 10:14:25Z` or RFC 3339.
pub fn parse_since(since: &str) -> Option<DateTime<Utc>> {
    let since = since.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(since) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(since, "%d %b %Y %H:%M:%S%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(since.trim_end_matches('Z'), "%d %b %Y %H:%M:%S")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Kind of entity being checked and what it is expected to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Subject {
    Machine,
    Container,
    Application,
    Unit,
}

impl Subject {
    fn label(&self) -> &'static str {
        match self {
            Subject::Machine => "machine",
            Subject::Container => "container",
            Subject::Application => "application",
            Subject::Unit => "unit",
        }
    }

    fn title(&self) -> &'static str {
        match self {
            Subject::Machine => "Machine",
            Subject::Container => "Container",
            Subject::Application => "Application",
            Subject::Unit => "Unit",
        }
    }

    fn primary_expected(&self) -> &'static [&'static str] {
        match self {
            Subject::Machine | Subject::Container => &["running"],
            Subject::Application | Subject::Unit => &["active", "unknown"],
        }
    }

    fn juju_expected(&self) -> Option<&'static [&'static str]> {
        match self {
            Subject::Machine | Subject::Container => Some(&["started"]),
            Subject::Unit => Some(&["idle"]),
            Subject::Application => None,
        }
    }
}

pub struct StatusChecker {
    now: DateTime<Utc>,
}

impl StatusChecker {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now }
    }

    pub fn evaluate(&self, document: &TopologyDocument, diagnostics: &mut Diagnostics) -> Vec<Violation> {
        let mut violations = Vec::new();

        for (id, machine) in &document.machines {
            let machine = machine.clone().unwrap_or_default();
            self.check_machine(id.as_str(), Subject::Machine, &machine, &mut violations, diagnostics);
        }

        for (name, app) in document.applications() {
            self.check_pair(
                name,
                Subject::Application,
                app.application_status.as_ref(),
                None,
                &mut violations,
                diagnostics,
            );
            for (unit, spec) in app.units.iter().flatten() {
                self.check_unit(unit, spec, &mut violations, diagnostics);
            }
        }
        violations
    }

    fn check_machine(
        &self,
        id: &str,
        subject: Subject,
        machine: &MachineSpec,
        violations: &mut Vec<Violation>,
        diagnostics: &mut Diagnostics,
    ) {
        self.check_pair(
            id,
            subject,
            machine.machine_status.as_ref(),
            machine.juju_status.as_ref(),
            violations,
            diagnostics,
        );
        for (container_id, container) in &machine.containers {
            let container = container.clone().unwrap_or_default();
            self.check_machine(container_id.as_str(), Subject::Container, &container, violations, diagnostics);
        }
    }

    fn check_unit(
        &self,
        unit: &str,
        spec: &UnitSpec,
        violations: &mut Vec<Violation>,
        diagnostics: &mut Diagnostics,
    ) {
        self.check_pair(
            unit,
            Subject::Unit,
            spec.workload_status.as_ref(),
            spec.juju_status.as_ref(),
            violations,
            diagnostics,
        );
    }

    fn check_pair(
        &self,
        name: &str,
        subject: Subject,
        primary: Option<&StatusInfo>,
        juju: Option<&StatusInfo>,
        violations: &mut Vec<Violation>,
        diagnostics: &mut Diagnostics,
    ) {
        let Some(primary) = primary else {
            diagnostics.warn(format!("Could not determine appropriate status key for {}.", name));
            return;
        };
        let what = format!("{} {}", subject.title(), name);
        violations.extend(self.check_status(&what, primary, subject.primary_expected(), diagnostics));

        let Some(expected) = subject.juju_expected() else {
            return;
        };
        match juju {
            Some(juju) => {
                let what = format!("Juju on {} {}", subject.label(), name);
                violations.extend(self.check_status(&what, juju, expected, diagnostics));
            }
            None => diagnostics.warn(format!("Could not determine Juju status for {}.", name)),
        }
    }

    fn check_status(
        &self,
        what: &str,
        status: &StatusInfo,
        expected: &[&str],
        diagnostics: &mut Diagnostics,
    ) -> Option<Violation> {
        let current = status.current.as_deref();
        if current.is_some_and(|current| expected.contains(&current)) {
            return None;
        }
        if current == Some(EXECUTING) && self.recently_started(what, status, diagnostics) {
            return None;
        }

        let since = status.since.as_deref().unwrap_or("unknown");
        let message = status.message.as_deref().unwrap_or("none");
        Some(
            Violation::new(
                ViolationKind::StatusUnexpected,
                format!(
                    "{} has status '{}' (since: {}, message: {}); (We expected: {})",
                    what,
                    current.unwrap_or("unknown"),
                    since,
                    message,
                    expected.join(", ")
                ),
            )
            .with("what", what)
            .with("status_current", current)
            .with("status_since", status.since.as_deref())
            .with("status_msg", status.message.as_deref()),
        )
    }

    fn recently_started(&self, what: &str, status: &StatusInfo, diagnostics: &mut Diagnostics) -> bool {
        let Some(raw) = status.since.as_deref() else {
            return false;
        };
        match parse_since(raw) {
            Some(since) => since > self.now - Duration::seconds(MAX_UNIT_EXECUTION_SECONDS),
            None => {
                diagnostics.warn(format!("Could not parse status timestamp '{}' for {}", raw, what));
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 3, 23, 12, 0, 0).unwrap()
    }

    fn evaluate(yaml: &str) -> (Vec<Violation>, Diagnostics) {
        let document = TopologyDocument::from_yaml_str(yaml).unwrap();
        let mut diagnostics = Diagnostics::default();
        let violations = StatusChecker::new(now()).evaluate(&document, &mut diagnostics);
        (violations, diagnostics)
    }

    const HEALTHY: &str = r#"
machines:
  "0":
    machine-status: {current: running}
    juju-status: {current: started}
    containers:
      0/lxd/0:
        machine-status: {current: running}
        juju-status: {current: started}
applications:
  ubuntu:
    application-status: {current: active}
    units:
      ubuntu/0:
        workload-status: {current: active}
        juju-status: {current: idle}
"#;

    #[test]
    fn test_parse_since_formats() {
        let expected = Utc.with_ymd_and_hms(2021, 3, 23, 10, 14, 25).unwrap();
        assert_eq!(parse_since("23 Mar 2021 10:14:25Z"), Some(expected));
        assert_eq!(parse_since("2021-03-23T10:14:25Z"), Some(expected));
        assert_eq!(parse_since("23 Mar 2021 11:14:25+01:00"), Some(expected));
        assert_eq!(parse_since("yesterday"), None);
    }

    #[test]
    fn test_healthy_model_is_clean() {
        let (violations, diagnostics) = evaluate(HEALTHY);
        assert!(violations.is_empty());
        assert_eq!(diagnostics.warnings().count(), 0);
    }

    #[test]
    fn test_container_status_is_checked() {
        let yaml = HEALTHY.replace(
            "      0/lxd/0:\n        machine-status: {current: running}",
            "      0/lxd/0:\n        machine-status: {current: pending, since: 23 Mar 2021 10:00:00Z}",
        );
        let (violations, _) = evaluate(&yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Container 0/lxd/0 has status 'pending' (since: 23 Mar 2021 10:00:00Z, message: none); (We expected: running)"
        );
        assert_eq!(violations[0].field_str("what"), Some("Container 0/lxd/0"));
    }

    #[test]
    fn test_executing_tolerance() {
        let recent = HEALTHY.replace(
            "juju-status: {current: idle}",
            "juju-status: {current: executing, since: 23 Mar 2021 11:30:00Z}",
        );
        assert!(evaluate(&recent).0.is_empty());

        let stuck = HEALTHY.replace(
            "juju-status: {current: idle}",
            "juju-status: {current: executing, since: 23 Mar 2021 09:00:00Z, message: running hook}",
        );
        let (violations, _) = evaluate(&stuck);
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Juju on unit ubuntu/0 has status 'executing' (since: 23 Mar 2021 09:00:00Z, message: running hook); (We expected: idle)"
        );
        assert_eq!(violations[0].field_str("status_msg"), Some("running hook"));
    }

    #[test]
    fn test_blocked_workload() {
        let yaml = HEALTHY.replace(
            "workload-status: {current: active}",
            "workload-status: {current: blocked, message: missing relation}",
        );
        let (violations, _) = evaluate(&yaml);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind(), ViolationKind::StatusUnexpected);
        assert!(violations[0].message.starts_with("Unit ubuntu/0 has status 'blocked'"));
        assert!(violations[0].message.ends_with("(We expected: active, unknown)"));
    }

    #[test]
    fn test_missing_status_keys_warn() {
        let (violations, diagnostics) = evaluate(
            "machines:\n  \"0\":\n    machine-status: {current: running}\napplications:\n  ubuntu:\n    units:\n      ubuntu/0: {}\n",
        );
        assert!(violations.is_empty());
        assert!(diagnostics.has_warning("Could not determine Juju status for 0."));
        assert!(diagnostics.has_warning("Could not determine appropriate status key for ubuntu."));
        assert!(diagnostics.has_warning("Could not determine appropriate status key for ubuntu/0."));
    }
}
