// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Topology view over a `juju export-bundle` document.
//!
//! Bundles have no units. Principal applications are placed by their `to:`
//! directives and subordinate applications (no directives at all) inherit
//! the machines of the principals they are related to.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::charm::extract_charm_name;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::LintError;
use crate::domain::machine::MachineSortKey;
use crate::domain::topology::{EndpointsField, TopologyIndex, TopologyView, UnitPlacement};
use crate::infrastructure::document::TopologyDocument;

#[derive(Debug, Clone)]
pub struct BundleView {
    index: TopologyIndex,
    endpoints_field: EndpointsField,
    relations: Vec<(String, String)>,
    subordinates: BTreeSet<String>,
    /// Resolved placement directives per principal, in declaration order.
    placements: BTreeMap<String, Vec<String>>,
}

impl BundleView {
    pub fn new(document: &TopologyDocument, diagnostics: &mut Diagnostics) -> Result<Self, LintError> {
        let endpoints_field = EndpointsField::Bindings;
        let mut index = TopologyIndex::default();

        for (id, machine) in &document.machines {
            index.machines.insert(id.to_string());
            if let Some(hardware) = machine.as_ref().and_then(|m| m.hardware.as_ref()) {
                index.hardware.insert(id.to_string(), hardware.clone());
            }
        }

        let mut relations = Vec::new();
        for pair in document.relations.iter().flatten() {
            match pair.as_slice() {
                [left, right] => relations.push((left.clone(), right.clone())),
                _ => diagnostics.warn(format!("Ignoring malformed relation: {:?}", pair)),
            }
        }

        let mut directives: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for (name, app) in document.applications() {
            let charm = app.charm.as_deref().map(extract_charm_name).transpose()?;
            let endpoints = app
                .endpoints(endpoints_field)
                .map(|bindings| bindings.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            index.insert_application(name, charm, endpoints);
            directives.insert(
                name.clone(),
                app.to.iter().map(|target| target.to_string()).collect(),
            );
        }

        // `to: [designate-bind/0]` means "wherever that unit went".
        let mut placements = BTreeMap::new();
        for (app, targets) in &directives {
            let resolved: Vec<String> = targets
                .iter()
                .filter_map(|target| resolve_target(target, &directives, diagnostics))
                .collect();
            for target in targets.iter().filter(|t| !t.contains('/')) {
                index.machines.insert(target.clone());
            }
            for machine in &resolved {
                index.place(app, machine);
            }
            if !resolved.is_empty() {
                placements.insert(app.clone(), resolved);
            }
        }

        let subordinates: BTreeSet<String> = directives
            .iter()
            .filter(|(_, targets)| targets.is_empty())
            .map(|(app, _)| app.clone())
            .collect();

        for (left, right) in &relations {
            let (left_app, right_app) = (application_of(left), application_of(right));
            let (sub, principal) = if subordinates.contains(left_app) {
                (left_app, right_app)
            } else if subordinates.contains(right_app) {
                (right_app, left_app)
            } else {
                continue;
            };
            let inherited = index
                .apps_to_machines
                .get(principal)
                .cloned()
                .unwrap_or_default();
            for machine in &inherited {
                index.place(sub, machine);
            }
        }

        Ok(Self {
            index,
            endpoints_field,
            relations,
            subordinates,
            placements,
        })
    }

    pub fn is_subordinate(&self, app: &str) -> bool {
        self.subordinates.contains(app)
    }

    fn related_subordinates(&self, principal: &str) -> Vec<String> {
        let mut related = BTreeSet::new();
        for (left, right) in &self.relations {
            let (left_app, right_app) = (application_of(left), application_of(right));
            if left_app == principal && self.is_subordinate(right_app) {
                related.insert(right_app.to_string());
            } else if right_app == principal && self.is_subordinate(left_app) {
                related.insert(left_app.to_string());
            }
        }
        related.into_iter().collect()
    }
}

/// Resolve a `unit/N` placement to the machine of that unit.
fn resolve_target(
    target: &str,
    directives: &BTreeMap<String, Vec<String>>,
    diagnostics: &mut Diagnostics,
) -> Option<String> {
    let Some((app, unit)) = target.split_once('/') else {
        return Some(target.to_string());
    };
    let resolved = unit
        .parse::<usize>()
        .ok()
        .and_then(|n| directives.get(app).and_then(|targets| targets.get(n)))
        .filter(|machine| !machine.contains('/'))
        .cloned();
    if resolved.is_none() {
        diagnostics.warn(format!("Cannot resolve placement directive '{}'", target));
    }
    resolved
}

/// `keystone:shared-db` → `keystone`; bare application names pass through.
fn application_of(endpoint: &str) -> &str {
    endpoint.split(':').next().unwrap_or(endpoint)
}

impl TopologyView for BundleView {
    fn index(&self) -> &TopologyIndex {
        &self.index
    }

    fn endpoints_field(&self) -> EndpointsField {
        self.endpoints_field
    }

    fn filter_by_relation(&self, apps: &BTreeSet<String>, endpoint: &str) -> BTreeSet<String> {
        let mut related = BTreeSet::new();
        for (left, right) in &self.relations {
            for app in apps {
                let app_endpoint = format!("{}:{}", app, endpoint);
                if *left == app_endpoint {
                    related.insert(application_of(right).to_string());
                } else if *right == app_endpoint {
                    related.insert(application_of(left).to_string());
                }
            }
        }
        related
    }

    /// `3` → (3, "0", 0), `lxd:3` → (3, "lxd", 0)
    fn sort_key(&self, machine: &str) -> MachineSortKey {
        let (first, second) = machine.split_once(':').unwrap_or((machine, ""));
        if !first.is_empty() && first.chars().all(|c| c.is_ascii_digit()) {
            MachineSortKey::new(MachineSortKey::parse_number(first), "0", 0)
        } else {
            MachineSortKey::new(MachineSortKey::parse_number(second), first, 0)
        }
    }

    fn unit_placements(&self) -> Vec<UnitPlacement> {
        self.placements
            .iter()
            .flat_map(|(app, machines)| {
                let subordinates = self.related_subordinates(app);
                machines
                    .iter()
                    .enumerate()
                    .map(move |(n, machine)| UnitPlacement {
                        application: app.clone(),
                        unit: format!("{}/{}", app, n),
                        machine: machine.clone(),
                        subordinates: subordinates.clone(),
                    })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"
applications:
  keystone:
    charm: ch:keystone
    bindings:
      "": internal
      public: public
      shared-db: internal
    to: ["lxd:0", "lxd:1"]
  mysql:
    charm: cs:percona-cluster-290
    bindings:
      shared-db: internal
    to: [2]
  mysql-router:
    charm: mysql-router
    to: ["mysql/0"]
  ntp:
    charm: ntp
  nrpe:
    charm: nrpe
machines:
  "0": {}
  "1": {}
  "2":
    hardware: availability-zone=zone3
relations:
  - ["keystone:shared-db", "mysql:shared-db"]
  - ["ntp:juju-info", "mysql:juju-info"]
  - ["keystone:juju-info", "nrpe:general-info"]
"#;

    fn view() -> BundleView {
        let document = TopologyDocument::from_yaml_str(BUNDLE).unwrap();
        BundleView::new(&document, &mut Diagnostics::default()).unwrap()
    }

    #[test]
    fn test_machines_include_placement_targets() {
        let view = view();
        let machines: Vec<&str> = view.machines().iter().map(String::as_str).collect();
        assert_eq!(machines, vec!["0", "1", "2", "lxd:0", "lxd:1"]);
        assert_eq!(view.hardware("2"), Some("availability-zone=zone3"));
    }

    #[test]
    fn test_subordinates_inherit_related_principal_machines() {
        let view = view();
        let machines = view.apps_to_machines();
        assert_eq!(machines["ntp"], BTreeSet::from(["2".to_string()]));
        assert_eq!(
            machines["nrpe"],
            BTreeSet::from(["lxd:0".to_string(), "lxd:1".to_string()])
        );
        assert_eq!(machines["mysql-router"], BTreeSet::from(["2".to_string()]));
        assert!(view.is_subordinate("ntp"));
        assert!(!view.is_subordinate("mysql-router"));
    }

    #[test]
    fn test_unit_placements() {
        let placements = view().unit_placements();
        let keystone: Vec<&UnitPlacement> =
            placements.iter().filter(|p| p.application == "keystone").collect();
        assert_eq!(keystone.len(), 2);
        assert_eq!(keystone[1].unit, "keystone/1");
        assert_eq!(keystone[1].machine, "lxd:1");
        assert_eq!(keystone[0].subordinates, vec!["nrpe"]);

        let mysql = placements.iter().find(|p| p.application == "mysql").unwrap();
        assert_eq!(mysql.subordinates, vec!["ntp"]);
    }

    #[test]
    fn test_filter_by_relation() {
        let view = view();
        assert_eq!(
            view.filter_by_relation(&BTreeSet::from(["mysql".to_string()]), "shared-db"),
            BTreeSet::from(["keystone".to_string()])
        );
        assert_eq!(
            view.filter_by_relation(&BTreeSet::from(["nrpe".to_string()]), "general-info"),
            BTreeSet::from(["keystone".to_string()])
        );
    }

    #[test]
    fn test_sort_key_puts_containers_after_host() {
        let view = view();
        let all: BTreeSet<String> = ["lxd:1", "10", "1", "lxd:0", "0", "2"]
            .iter()
            .map(|m| m.to_string())
            .collect();
        assert_eq!(
            view.sorted_machines(&all),
            vec!["0", "lxd:0", "1", "lxd:1", "2", "10"]
        );
    }

    #[test]
    fn test_bindings_are_the_endpoints() {
        let view = view();
        assert_eq!(view.endpoints_field(), EndpointsField::Bindings);
        assert_eq!(
            view.filter_by_endpoint("percona-cluster", "*", "shared-db"),
            BTreeSet::from(["keystone".to_string()])
        );
    }
}
