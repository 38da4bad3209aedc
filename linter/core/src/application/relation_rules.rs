// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Relation Rule Engine
//!
//! ```yaml
//! relations:
//!   - charm: nrpe
//!     check:
//!       - ["nrpe:nrpe-external-master", "*:nrpe-external-master"]
//!     not-exist:
//!       - ["nrpe:general-info", "ceph-osd:juju-info"]
//!     exception: [ceph-mon]
//!     ubiquitous: true
//! ```
//!
//! Each `check` pair names the rule's charm (or one of its applications) on
//! one side and a target on the other. Every application exposing the
//! target endpoint must be related to the charm on the charm's endpoint.
//! Unresolvable references log a warning and drop only the affected check.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::diagnostics::Diagnostics;
use crate::domain::relation::{EndpointRef, Relation};
use crate::domain::rules::RelationRule;
use crate::domain::topology::TopologyView;
use crate::domain::violation::{Violation, ViolationKind};

/// A `check` pair with the charm's side identified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCheck {
    pub self_endpoint: String,
    pub target: EndpointRef,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationFindings {
    pub charm: String,
    /// `charm:endpoint` → applications lacking the relation
    pub missing_relations: BTreeMap<String, BTreeSet<String>>,
    pub forbidden: Vec<Relation>,
    pub missing_machines: Vec<String>,
}

impl RelationFindings {
    pub fn violations(&self) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (endpoint, apps) in &self.missing_relations {
            if apps.is_empty() {
                continue;
            }
            let missing: Vec<&str> = apps.iter().map(String::as_str).collect();
            violations.push(
                Violation::new(
                    ViolationKind::MissingRelations,
                    format!(
                        "Endpoint '{}' is missing relations with: {}",
                        endpoint,
                        missing.join(", ")
                    ),
                )
                .with("charm", self.charm.as_str())
                .with("endpoint", endpoint.as_str())
                .with("missing", missing),
            );
        }
        if !self.forbidden.is_empty() {
            let relations: Vec<String> = self.forbidden.iter().map(Relation::to_string).collect();
            violations.push(
                Violation::new(
                    ViolationKind::RelationExist,
                    format!("Relation(s) {} should not exist.", relations.join(", ")),
                )
                .with("charm", self.charm.as_str())
                .with("relations", relations),
            );
        }
        if !self.missing_machines.is_empty() {
            violations.push(
                Violation::new(
                    ViolationKind::MissingMachine,
                    format!(
                        "Charm '{}' missing on machines: {}",
                        self.charm,
                        self.missing_machines.join(", ")
                    ),
                )
                .with("charm", self.charm.as_str())
                .with("machines", self.missing_machines.clone()),
            );
        }
        violations
    }
}

pub struct RelationRuleEngine<'a> {
    rules: &'a [RelationRule],
}

impl<'a> RelationRuleEngine<'a> {
    pub fn new(rules: &'a [RelationRule]) -> Self {
        Self { rules }
    }

    pub fn evaluate(&self, view: &dyn TopologyView, diagnostics: &mut Diagnostics) -> Vec<Violation> {
        self.rules
            .iter()
            .filter_map(|rule| evaluate_rule(rule, view, diagnostics))
            .flat_map(|findings| findings.violations())
            .collect()
    }
}

/// `None` when the rule's charm is not deployed.
pub fn evaluate_rule(
    rule: &RelationRule,
    view: &dyn TopologyView,
    diagnostics: &mut Diagnostics,
) -> Option<RelationFindings> {
    let charm = rule.charm.as_str();
    let charm_apps = view.charm_to_apps(charm);
    if charm_apps.is_empty() {
        diagnostics.debug(format!("Charm {} not deployed; skipping relation rule", charm));
        return None;
    }

    let mut findings = RelationFindings {
        charm: charm.to_string(),
        ..Default::default()
    };
    let exceptions: BTreeSet<String> = rule.exception.iter().cloned().collect();

    for pair in &rule.check {
        let Some(check) = normalize_check(pair, charm, &charm_apps, view, diagnostics) else {
            continue;
        };
        let exposing = view.filter_by_endpoint(charm, &check.target.app, &check.target.endpoint);
        let related = view.filter_by_relation(&charm_apps, &check.self_endpoint);
        let missing = exposing
            .difference(&related)
            .filter(|app| !exceptions.contains(*app))
            .cloned();
        findings
            .missing_relations
            .entry(format!("{}:{}", charm, check.self_endpoint))
            .or_default()
            .extend(missing);
    }

    for pair in &rule.not_exist {
        if let Some(relation) = forbidden_relation(pair, charm, &charm_apps, view, diagnostics) {
            findings.forbidden.push(relation);
        }
    }

    if rule.ubiquitous {
        let mut covered = BTreeSet::new();
        for app in &charm_apps {
            if let Some(machines) = view.apps_to_machines().get(app) {
                covered.extend(machines.iter().cloned());
            }
        }
        let lacking: BTreeSet<String> = view.machines().difference(&covered).cloned().collect();
        findings.missing_machines = view.sorted_machines(&lacking);
    }

    Some(findings)
}

fn is_self(endpoint: &EndpointRef, charm: &str, charm_apps: &BTreeSet<String>) -> bool {
    endpoint.app == charm || charm_apps.contains(&endpoint.app)
}

pub fn normalize_check(
    pair: &[String],
    charm: &str,
    charm_apps: &BTreeSet<String>,
    view: &dyn TopologyView,
    diagnostics: &mut Diagnostics,
) -> Option<NormalizedCheck> {
    let [side_a, side_b] = pair else {
        diagnostics.warn(format!(
            "Relations rules has an unexpected format for {}: {:?}",
            charm, pair
        ));
        return None;
    };
    let a = view.check_endpoint_exists(side_a, charm, diagnostics)?;
    let b = view.check_endpoint_exists(side_b, charm, diagnostics)?;

    let (own, target) = if is_self(&a, charm, charm_apps) {
        (a, b)
    } else if is_self(&b, charm, charm_apps) {
        (b, a)
    } else {
        diagnostics.warn(format!(
            "Relations rules has an unexpected format. It was not possible to find {} on rules",
            charm
        ));
        return None;
    };

    // Every application of the charm should expose its side of the relation.
    for app in charm_apps {
        view.check_endpoint_exists(&format!("{}:{}", app, own.endpoint), charm, diagnostics);
    }

    Some(NormalizedCheck {
        self_endpoint: own.endpoint,
        target,
    })
}

fn forbidden_relation(
    pair: &[String],
    charm: &str,
    charm_apps: &BTreeSet<String>,
    view: &dyn TopologyView,
    diagnostics: &mut Diagnostics,
) -> Option<Relation> {
    let [side_a, side_b] = pair else {
        diagnostics.warn(format!(
            "Problem during check_relation_not_exist for {}: {:?}",
            charm, pair
        ));
        return None;
    };
    let a = view.check_endpoint_exists(side_a, charm, diagnostics)?;
    let b = view.check_endpoint_exists(side_b, charm, diagnostics)?;

    let sources = if a.app == charm {
        charm_apps.clone()
    } else {
        BTreeSet::from([a.app.clone()])
    };
    let related = view.filter_by_relation(&sources, &a.endpoint);
    let exists = if b.is_wildcard() {
        !related.is_empty()
    } else if b.app == charm {
        !related.is_disjoint(charm_apps)
    } else {
        related.contains(&b.app)
    };
    exists.then(|| Relation::new(side_a.clone(), side_b.clone()))
}
