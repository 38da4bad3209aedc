// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Subordinate Placement Engine
//!
//! Evaluates every `subordinates` rule against every machine hosting a
//! principal unit.
//!
//! # Policies
//!
//! | `where` | Enforced on |
//! |---------|-------------|
//! | `all` | every machine |
//! | `all or nothing` | every machine, once the charm is deployed anywhere |
//! | `on <app>` | machines hosting `<app>` |
//! | `all except <app>` | machines not hosting `<app>` |
//! | `host only` | hosts; presence in a container is extraneous |
//! | `metal only` | bare metal; presence elsewhere is extraneous |
//! | `container aware` | every machine, with per-kind application suffixes |
//!
//! Presence is decided by charm, so `nrpe-host` satisfies a rule for `nrpe`.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::LintError;
use crate::domain::machine::{is_container, is_metal};
use crate::domain::rules::{LintRules, Placement, SubordinateRule};
use crate::domain::topology::TopologyView;
use crate::domain::violation::{Violation, ViolationKind};

/// What sits on one machine.
#[derive(Debug, Clone, Default)]
struct MachineContents {
    principals: BTreeSet<String>,
    subordinates: BTreeSet<String>,
}

/// Placement findings, keyed by subordinate charm.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementFindings {
    /// charm → principal applications lacking it
    pub missing: BTreeMap<String, BTreeSet<String>>,
    /// charm → principal applications that must not have it
    pub extraneous: BTreeMap<String, BTreeSet<String>>,
    /// charm → machines where it is deployed more than once
    pub duplicates: BTreeMap<String, BTreeSet<String>>,
}

impl PlacementFindings {
    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.extraneous.is_empty() && self.duplicates.is_empty()
    }

    pub fn violations(&self, view: &dyn TopologyView) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (charm, principals) in &self.missing {
            let principals = join(principals.iter());
            violations.push(
                Violation::new(
                    ViolationKind::SubordinateMissing,
                    format!(
                        "Subordinate '{}' is missing for application(s): '{}'",
                        charm, principals
                    ),
                )
                .with("subordinate", charm.as_str())
                .with("principals", principals),
            );
        }
        for (charm, principals) in &self.extraneous {
            let principals = join(principals.iter());
            violations.push(
                Violation::new(
                    ViolationKind::SubordinateExtraneous,
                    format!(
                        "Application(s) '{}' has extraneous subordinate '{}'",
                        principals, charm
                    ),
                )
                .with("subordinate", charm.as_str())
                .with("principals", principals),
            );
        }
        for (charm, machines) in &self.duplicates {
            let machines = join(view.sorted_machines(machines).iter());
            violations.push(
                Violation::new(
                    ViolationKind::SubordinateDuplicate,
                    format!(
                        "Subordinate '{}' is duplicated on machines: '{}'",
                        charm, machines
                    ),
                )
                .with("subordinate", charm.as_str())
                .with("machines", machines),
            );
        }
        violations
    }
}

fn join<'a>(items: impl Iterator<Item = &'a String>) -> String {
    items.map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub struct PlacementEngine<'a> {
    rules: &'a LintRules,
}

impl<'a> PlacementEngine<'a> {
    pub fn new(rules: &'a LintRules) -> Self {
        Self { rules }
    }

    pub fn evaluate(
        &self,
        view: &dyn TopologyView,
        diagnostics: &mut Diagnostics,
    ) -> Result<PlacementFindings, LintError> {
        let charm_of = |app: &str| -> String {
            view.app_to_charm()
                .get(app)
                .cloned()
                .unwrap_or_else(|| app.to_string())
        };

        let mut findings = PlacementFindings::default();
        let mut machines: BTreeMap<String, MachineContents> = BTreeMap::new();
        let mut counts: BTreeMap<(String, String), usize> = BTreeMap::new();

        for placement in view.unit_placements() {
            diagnostics.debug(format!("{}: {:?}", placement.unit, placement.subordinates));
            let contents = machines.entry(placement.machine.clone()).or_default();
            contents.principals.insert(placement.application.clone());
            for sub in &placement.subordinates {
                contents.subordinates.insert(sub.clone());
                *counts
                    .entry((placement.machine.clone(), charm_of(sub)))
                    .or_default() += 1;
            }
        }

        for ((machine, charm), count) in counts {
            let allow_multiple = self
                .rules
                .subordinates
                .get(&charm)
                .map(|rule| rule.allow_multiple)
                .unwrap_or(false);
            if count > 1 && !allow_multiple {
                findings.duplicates.entry(charm).or_default().insert(machine);
            }
        }

        let mut deployed_anywhere = BTreeSet::new();
        for contents in machines.values() {
            for sub in &contents.subordinates {
                deployed_anywhere.insert(charm_of(sub));
            }
        }

        for (charm, rule) in &self.rules.subordinates {
            let placement = rule.placement(charm)?;
            diagnostics.debug(format!("Checking for sub {} ({})", charm, placement));

            for (machine, contents) in &machines {
                let present = contents
                    .subordinates
                    .iter()
                    .any(|sub| sub == charm || charm_of(sub) == *charm);

                let verdict = match &placement {
                    Placement::On(app) if !contents.principals.contains(app) => Verdict::Skip,
                    Placement::AllExcept(app) if contents.principals.contains(app) => Verdict::Skip,
                    Placement::AllOrNothing if !deployed_anywhere.contains(charm) => Verdict::Skip,
                    Placement::HostOnly if is_container(machine) => Verdict::Forbidden,
                    Placement::MetalOnly if !is_metal(machine, view.hardware(machine)) => {
                        Verdict::Forbidden
                    }
                    Placement::ContainerAware => {
                        if container_aware_satisfied(charm, rule, machine, contents, &charm_of) {
                            Verdict::Skip
                        } else {
                            Verdict::Missing
                        }
                    }
                    _ if present => Verdict::Skip,
                    _ => Verdict::Missing,
                };

                match verdict {
                    Verdict::Skip => {}
                    Verdict::Missing => {
                        diagnostics.debug(format!("{} not found on {}", charm, machine));
                        findings
                            .missing
                            .entry(charm.clone())
                            .or_default()
                            .extend(contents.principals.iter().cloned());
                    }
                    Verdict::Forbidden if present => {
                        diagnostics.debug(format!("found extraneous {} on {}", charm, machine));
                        findings
                            .extraneous
                            .entry(charm.clone())
                            .or_default()
                            .extend(contents.principals.iter().cloned());
                    }
                    Verdict::Forbidden => {}
                }
            }
        }

        Ok(findings)
    }
}

enum Verdict {
    Skip,
    Missing,
    Forbidden,
}

/// Suffixed application first, then any application of the charm, then a
/// configured exception on the machine.
fn container_aware_satisfied(
    charm: &str,
    rule: &SubordinateRule,
    machine: &str,
    contents: &MachineContents,
    charm_of: &dyn Fn(&str) -> String,
) -> bool {
    let suffixes = if is_container(machine) {
        &rule.container_suffixes
    } else {
        &rule.host_suffixes
    };
    if suffixes
        .iter()
        .any(|suffix| contents.subordinates.contains(&format!("{}-{}", charm, suffix)))
    {
        return true;
    }
    if contents.subordinates.iter().any(|sub| charm_of(sub) == charm) {
        return true;
    }
    rule.exceptions
        .iter()
        .any(|exception| contents.principals.contains(exception))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::machine::MachineSortKey;
    use crate::domain::topology::{EndpointsField, TopologyIndex, UnitPlacement};

    struct Fixture {
        index: TopologyIndex,
        placements: Vec<UnitPlacement>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                index: TopologyIndex::default(),
                placements: Vec::new(),
            }
        }

        fn app(mut self, name: &str, charm: &str) -> Self {
            self.index
                .insert_application(name, Some(charm.to_string()), Vec::new());
            self
        }

        fn unit(mut self, app: &str, machine: &str, subs: &[&str]) -> Self {
            let n = self.placements.iter().filter(|p| p.application == app).count();
            self.index.machines.insert(machine.to_string());
            self.placements.push(UnitPlacement {
                application: app.to_string(),
                unit: format!("{}/{}", app, n),
                machine: machine.to_string(),
                subordinates: subs.iter().map(|s| s.to_string()).collect(),
            });
            self
        }

        fn hardware(mut self, machine: &str, hardware: &str) -> Self {
            self.index
                .hardware
                .insert(machine.to_string(), hardware.to_string());
            self
        }
    }

    impl TopologyView for Fixture {
        fn index(&self) -> &TopologyIndex {
            &self.index
        }
        fn endpoints_field(&self) -> EndpointsField {
            EndpointsField::EndpointBindings
        }
        fn filter_by_relation(&self, _: &BTreeSet<String>, _: &str) -> BTreeSet<String> {
            BTreeSet::new()
        }
        fn sort_key(&self, machine: &str) -> MachineSortKey {
            MachineSortKey::new(MachineSortKey::parse_number(machine), "", 0)
        }
        fn unit_placements(&self) -> Vec<UnitPlacement> {
            self.placements.clone()
        }
    }

    fn rules(charm: &str, rule: SubordinateRule) -> LintRules {
        let mut rules = LintRules::default();
        rules.subordinates.insert(charm.to_string(), rule);
        rules
    }

    fn evaluate(rules: &LintRules, view: &Fixture) -> PlacementFindings {
        PlacementEngine::new(rules)
            .evaluate(view, &mut Diagnostics::default())
            .unwrap()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_reports_every_principal_on_machine() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("mysql", "mysql")
            .app("ntp", "ntp")
            .unit("ubuntu", "0", &[])
            .unit("mysql", "0", &[])
            .unit("ubuntu", "1", &["ntp"]);
        let findings = evaluate(&rules("ntp", SubordinateRule::new("all")), &view);
        assert_eq!(findings.missing["ntp"], set(&["mysql", "ubuntu"]));
        assert!(findings.extraneous.is_empty());
    }

    #[test]
    fn test_presence_is_by_charm() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("ntp-renamed", "ntp")
            .unit("ubuntu", "0", &["ntp-renamed"]);
        let findings = evaluate(&rules("ntp", SubordinateRule::new("all")), &view);
        assert!(findings.is_empty());
    }

    #[test]
    fn test_all_or_nothing() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("ntp", "ntp")
            .unit("ubuntu", "0", &[])
            .unit("ubuntu", "1", &[]);
        let rules = rules("ntp", SubordinateRule::new("all or nothing"));
        assert!(evaluate(&rules, &view).is_empty());

        let view = view.unit("ubuntu", "2", &["ntp"]);
        assert_eq!(evaluate(&rules, &view).missing["ntp"], set(&["ubuntu"]));
    }

    #[test]
    fn test_on_and_all_except() {
        let view = Fixture::new()
            .app("nova-compute", "nova-compute")
            .app("ceph-osd", "ceph-osd")
            .unit("nova-compute", "0", &[])
            .unit("ceph-osd", "1", &[]);
        let findings = evaluate(&rules("ovs", SubordinateRule::new("on nova-compute")), &view);
        assert_eq!(findings.missing["ovs"], set(&["nova-compute"]));

        let findings = evaluate(
            &rules("ovs", SubordinateRule::new("all except nova-compute")),
            &view,
        );
        assert_eq!(findings.missing["ovs"], set(&["ceph-osd"]));
    }

    #[test]
    fn test_host_only_flags_containers() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("keystone", "keystone")
            .app("ntp", "ntp")
            .unit("ubuntu", "0", &[])
            .unit("keystone", "0/lxd/0", &["ntp"]);
        let findings = evaluate(&rules("ntp", SubordinateRule::new("host only")), &view);
        assert_eq!(findings.extraneous["ntp"], set(&["keystone"]));
        assert_eq!(findings.missing["ntp"], set(&["ubuntu"]));
    }

    #[test]
    fn test_metal_only_uses_virtual_tag() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("lldpd", "lldpd")
            .unit("ubuntu", "0", &["lldpd"])
            .unit("ubuntu", "1", &[])
            .hardware("0", "arch=amd64 tags=virtual");
        let findings = evaluate(&rules("lldpd", SubordinateRule::new("metal only")), &view);
        assert_eq!(findings.extraneous["lldpd"], set(&["ubuntu"]));
        assert_eq!(findings.missing["lldpd"], set(&["ubuntu"]));
    }

    fn container_aware() -> SubordinateRule {
        SubordinateRule {
            host_suffixes: vec!["host".to_string()],
            container_suffixes: vec!["container".to_string()],
            exceptions: vec!["ceph-mon".to_string()],
            ..SubordinateRule::new("container aware")
        }
    }

    #[test]
    fn test_container_aware_satisfied_three_ways() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("keystone", "keystone")
            .app("ceph-mon", "ceph-mon")
            .app("nrpe-host", "nrpe")
            .app("monitoring", "nrpe")
            .unit("ubuntu", "0", &["nrpe-host"])
            .unit("keystone", "0/lxd/0", &["monitoring"])
            .unit("ceph-mon", "0/lxd/1", &[]);
        let findings = evaluate(&rules("nrpe", container_aware()), &view);
        assert!(findings.missing.is_empty());
    }

    #[test]
    fn test_container_aware_missing_one_per_principal() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("keystone", "keystone")
            .unit("ubuntu", "0", &[])
            .unit("keystone", "0/lxd/0", &[]);
        let findings = evaluate(&rules("nrpe", container_aware()), &view);
        assert_eq!(findings.missing["nrpe"], set(&["keystone", "ubuntu"]));
    }

    #[test]
    fn test_duplicates_unless_allowed() {
        let view = Fixture::new()
            .app("ubuntu", "ubuntu")
            .app("mysql", "mysql")
            .app("telegraf", "telegraf")
            .unit("ubuntu", "3", &["telegraf"])
            .unit("mysql", "3", &["telegraf"]);
        let mut rules = rules("telegraf", SubordinateRule::new("all"));
        let findings = evaluate(&rules, &view);
        assert_eq!(findings.duplicates["telegraf"], set(&["3"]));

        rules.subordinates.get_mut("telegraf").unwrap().allow_multiple = true;
        assert!(evaluate(&rules, &view).is_empty());
    }

    #[test]
    fn test_invalid_policy_is_fatal() {
        let view = Fixture::new().app("ubuntu", "ubuntu").unit("ubuntu", "0", &[]);
        let rules = rules("ntp", SubordinateRule::new("somewhere"));
        let result = PlacementEngine::new(&rules).evaluate(&view, &mut Diagnostics::default());
        assert!(matches!(result, Err(LintError::InvalidPlacement { .. })));
    }

    #[test]
    fn test_violation_messages() {
        let view = Fixture::new().app("ubuntu", "ubuntu").unit("ubuntu", "0", &[]);
        let findings = evaluate(&rules("ntp", SubordinateRule::new("all")), &view);
        let violations = findings.violations(&view);
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].kind(), ViolationKind::SubordinateMissing);
        assert_eq!(
            violations[0].message,
            "Subordinate 'ntp' is missing for application(s): 'ubuntu'"
        );
        assert_eq!(violations[0].field_str("principals"), Some("ubuntu"));
    }
}
