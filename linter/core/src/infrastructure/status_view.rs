// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Topology view over a `juju status` document.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::charm::extract_charm_name;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::LintError;
use crate::domain::machine::MachineSortKey;
use crate::domain::topology::{EndpointsField, TopologyIndex, TopologyView, UnitPlacement};
use crate::infrastructure::document::{MachineSpec, TopologyDocument};

#[derive(Debug, Clone)]
pub struct StatusView {
    index: TopologyIndex,
    endpoints_field: EndpointsField,
    /// application → endpoint → related applications
    relations: BTreeMap<String, BTreeMap<String, BTreeSet<String>>>,
    placements: Vec<UnitPlacement>,
}

impl StatusView {
    pub fn new(document: &TopologyDocument, diagnostics: &mut Diagnostics) -> Result<Self, LintError> {
        let endpoints_field = EndpointsField::EndpointBindings;
        let mut index = TopologyIndex::default();
        let mut relations = BTreeMap::new();
        let mut placements = Vec::new();

        for (id, machine) in &document.machines {
            index.machines.insert(id.to_string());
            if let Some(machine) = machine {
                index_machine(&mut index, id.as_str(), machine);
            }
        }

        for (name, app) in document.applications() {
            let charm = app.charm.as_deref().map(extract_charm_name).transpose()?;
            let endpoints = app
                .endpoints(endpoints_field)
                .map(|bindings| bindings.keys().cloned().collect::<Vec<_>>())
                .unwrap_or_default();
            index.insert_application(name, charm, endpoints);

            let related: BTreeMap<String, BTreeSet<String>> = app
                .relations
                .iter()
                .map(|(endpoint, apps)| {
                    (
                        endpoint.clone(),
                        apps.iter().map(|a| a.name().to_string()).collect(),
                    )
                })
                .collect();
            relations.insert(name.clone(), related);

            for (unit, spec) in app.units.iter().flatten() {
                let Some(machine) = &spec.machine else {
                    diagnostics.warn(format!("Unit {} has no machine; skipping.", unit));
                    continue;
                };
                index.place(name, machine.as_str());
                let subordinates: Vec<String> = spec
                    .subordinates
                    .keys()
                    .map(|sub| application_of(sub).to_string())
                    .collect();
                for sub in &subordinates {
                    index.place(sub, machine.as_str());
                }
                placements.push(UnitPlacement {
                    application: name.clone(),
                    unit: unit.clone(),
                    machine: machine.to_string(),
                    subordinates,
                });
            }
        }

        Ok(Self {
            index,
            endpoints_field,
            relations,
            placements,
        })
    }
}

fn index_machine(index: &mut TopologyIndex, id: &str, machine: &MachineSpec) {
    if let Some(hardware) = &machine.hardware {
        index.hardware.insert(id.to_string(), hardware.clone());
    }
    for (container_id, container) in &machine.containers {
        index.machines.insert(container_id.to_string());
        if let Some(container) = container {
            index_machine(index, container_id.as_str(), container);
        }
    }
}

/// `ntp/0` → `ntp`
fn application_of(unit: &str) -> &str {
    unit.split('/').next().unwrap_or(unit)
}

impl TopologyView for StatusView {
    fn index(&self) -> &TopologyIndex {
        &self.index
    }

    fn endpoints_field(&self) -> EndpointsField {
        self.endpoints_field
    }

    fn filter_by_relation(&self, apps: &BTreeSet<String>, endpoint: &str) -> BTreeSet<String> {
        apps.iter()
            .filter_map(|app| self.relations.get(app))
            .filter_map(|by_endpoint| by_endpoint.get(endpoint))
            .flatten()
            .cloned()
            .collect()
    }

    /// `1/lxd/3` → (1, "lxd", 3), `1` → (1, "", 0)
    fn sort_key(&self, machine: &str) -> MachineSortKey {
        let mut parts = machine.split('/');
        let host = parts.next().map(MachineSortKey::parse_number).unwrap_or(u64::MAX);
        let kind = parts.next().unwrap_or("");
        let index = parts.next().map(MachineSortKey::parse_number).unwrap_or(0);
        MachineSortKey::new(host, kind, index)
    }

    fn unit_placements(&self) -> Vec<UnitPlacement> {
        self.placements.clone()
    }
}
