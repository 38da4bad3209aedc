// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! End-to-end lint passes over status and bundle documents.
//!
//! Each test loads a rules set, lints a complete YAML document through the
//! public `Linter` API and checks the resulting report.

use chrono::{TimeZone, Utc};
use juju_lint_core::infrastructure::RulesLoader;
use juju_lint_core::{LintRules, LintSettings, Linter, ViolationKind};
use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

const NTP_RULES: &str = r#"
known charms: [ubuntu, ntp]
operations mandatory: [ntp]
subordinates:
  ntp:
    where: all
"#;

const NTP_STATUS: &str = r#"
machines:
  "0":
    hardware: arch=amd64 availability-zone=zone1
    machine-status: {current: running}
    juju-status: {current: started}
  "1":
    hardware: arch=amd64 availability-zone=zone2
    machine-status: {current: running}
    juju-status: {current: started}
  "2":
    hardware: arch=amd64 availability-zone=zone3
    machine-status: {current: running}
    juju-status: {current: started}
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
      ubuntu/1:
        machine: "1"
        workload-status: {current: active}
        juju-status: {current: idle}
        subordinates:
          ntp/1:
            workload-status: {current: active}
      ubuntu/2:
        machine: "2"
        workload-status: {current: active}
        juju-status: {current: idle}
        subordinates:
          ntp/2:
            workload-status: {current: active}
  ntp:
    charm: cs:ntp-47
    application-status: {current: active}
"#;

fn linter(rules: &str) -> Linter {
    let rules = LintRules::from_yaml_str(rules).expect("rules parse");
    Linter::new(
        Arc::new(rules),
        LintSettings::new("integration").with_model("lint-test"),
    )
    .with_clock(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
}

#[test]
fn test_ntp_on_every_machine_is_clean() {
    let report = linter(NTP_RULES).lint_yaml_str(NTP_STATUS).unwrap();
    assert!(report.passed(), "unexpected errors: {:?}", report.errors);
}

#[test]
fn test_removed_subordinate_unit_is_reported() {
    let status = NTP_STATUS.replace(
        "        subordinates:\n          ntp/1:\n            workload-status: {current: active}\n",
        "",
    );
    let report = linter(NTP_RULES).lint_yaml_str(&status).unwrap();

    assert_eq!(report.errors.len(), 1);
    let violation = &report.errors[0];
    assert_eq!(violation.kind(), ViolationKind::SubordinateMissing);
    assert_eq!(violation.field_str("subordinate"), Some("ntp"));
    assert_eq!(violation.field_str("principals"), Some("ubuntu"));
    assert_eq!(
        violation.message,
        "Subordinate 'ntp' is missing for application(s): 'ubuntu'"
    );
}

#[test]
fn test_unbalanced_and_unhealthy_status() {
    let status = NTP_STATUS
        .replace("        machine: \"1\"", "        machine: \"0\"")
        .replace(
            "    hardware: arch=amd64 availability-zone=zone3\n    machine-status: {current: running}",
            "    hardware: arch=amd64 availability-zone=zone3\n    machine-status: {current: down}",
        );
    let report = linter(NTP_RULES).lint_yaml_str(&status).unwrap();
    let kinds: Vec<_> = report.errors.iter().map(|v| v.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ViolationKind::StatusUnexpected,
            ViolationKind::SubordinateDuplicate,
            ViolationKind::AzUnbalance,
        ]
    );
    assert_eq!(
        report.errors[0].message,
        "Machine 2 has status 'down' (since: unknown, message: none); (We expected: running)"
    );
    assert_eq!(report.errors[1].field_str("machines"), Some("0"));
    assert_eq!(
        report.errors[2].message,
        "Application 'ubuntu' is unbalanced across AZs: 3 units, deployed as: zone1: 2, zone2: 0, zone3: 1"
    );
}

#[test]
fn test_json_report_shape() {
    // The application keeps its name, so placement still finds `ntp` units.
    let status = NTP_STATUS.replace("cs:ntp-47", "cs:chrony-3");
    let report = linter(NTP_RULES).lint_yaml_str(&status).unwrap();
    let json = serde_json::to_value(&report).unwrap();

    assert_eq!(json["name"], "integration");
    assert_eq!(json["controller"], "manual");
    assert_eq!(json["model"], "lint-test");

    let ids: Vec<&str> = json["errors"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["id"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["unrecognised-charm", "ops-charm-missing"]);
    assert_eq!(json["errors"][0]["charm"], "chrony");
    assert_eq!(json["errors"][0]["tags"][0], "charm");
}

const BUNDLE_RULES: &str = r#"
known charms: [keystone, mysql-innodb-cluster, nrpe]
subordinates:
  nrpe:
    where: all
relations:
  - charm: nrpe
    check:
      - ["*:nrpe-external-master", "nrpe:nrpe-external-master"]
space checks:
  enforce endpoints: ["keystone:shared-db"]
"#;

const BUNDLE: &str = r#"
series: focal
machines:
  "0": {}
  "1": {}
applications:
  keystone:
    charm: ch:keystone
    num_units: 1
    to: ["0"]
    bindings:
      "": internal
      shared-db: internal
      nrpe-external-master: internal
  mysql:
    charm: ch:mysql-innodb-cluster
    num_units: 1
    to: [1]
    bindings:
      "": db
      shared-db: db
      nrpe-external-master: db
  nrpe:
    charm: ch:nrpe
    bindings:
      "": internal
      nrpe-external-master: internal
relations:
  - ["keystone:nrpe-external-master", "nrpe:nrpe-external-master"]
  - ["keystone:shared-db", "mysql:shared-db"]
"#;

#[test]
fn test_bundle_relations_spaces_and_placement() {
    let report = linter(BUNDLE_RULES).lint_yaml_str(BUNDLE).unwrap();
    let kinds: Vec<_> = report.errors.iter().map(|v| v.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            ViolationKind::MissingRelations,
            ViolationKind::SpaceBindingMismatch,
            ViolationKind::SubordinateMissing,
        ]
    );
    assert_eq!(
        report.errors[0].message,
        "Endpoint 'nrpe:nrpe-external-master' is missing relations with: mysql"
    );
    assert_eq!(report.errors[1].field_str("space2"), Some("db"));
    assert_eq!(report.errors[2].field_str("principals"), Some("mysql"));
}

#[test]
fn test_offer_overlay_document_is_skipped() {
    let stream = format!(
        "applications:\n  keystone:\n    charm: ch:keystone\n    offers:\n      keystone:\n        endpoints: [identity-service]\n---\n{}",
        BUNDLE
    );
    let report = linter(BUNDLE_RULES).lint_yaml_str(&stream).unwrap();
    assert_eq!(report.errors.len(), 3);
}

#[test]
fn test_bundle_without_bindings_skips_space_checks() {
    let bundle = "machines:\n  \"0\": {}\napplications:\n  keystone:\n    charm: keystone\n    to: [\"0\"]\nrelations: []\n";
    let report = linter("known charms: [keystone]\n").lint_yaml_str(bundle).unwrap();
    assert!(report.passed());
    assert!(report
        .diagnostics
        .iter()
        .any(|d| d.message.starts_with("Relations detected but explicit bindings not found")));
}

#[test]
fn test_rules_file_with_includes_and_overrides() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("charms.yaml"), "known charms: [ubuntu, ntp]\n").unwrap();
    let rules_path = dir.path().join("lint-rules.yaml");
    fs::write(
        &rules_path,
        "!include charms.yaml\nsubordinates:\n  ntp:\n    where: all\n",
    )
    .unwrap();

    // `on nova-compute` never matches this model, so ntp is no longer required.
    let rules = RulesLoader::new(&rules_path)
        .with_overrides(Some("ntp:on nova-compute".to_string()))
        .load()
        .unwrap();
    let linter = Linter::new(Arc::new(rules), LintSettings::new("integration"));

    let status = NTP_STATUS.replace(
        "        subordinates:\n          ntp/1:\n            workload-status: {current: active}\n",
        "",
    );
    let report = linter.lint_yaml_str(&status).unwrap();
    assert!(report.passed(), "unexpected errors: {:?}", report.errors);
}
