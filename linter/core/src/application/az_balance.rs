// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Availability zone balance.
//!
//! A model must span exactly three zones, and every application with more
//! than one unit needs at least `units / 3` units in each zone.

use std::collections::BTreeMap;

use crate::domain::diagnostics::Diagnostics;
use crate::domain::machine::{availability_zone, host_of};
use crate::domain::violation::{Violation, ViolationKind};
use crate::infrastructure::document::TopologyDocument;

pub const EXPECTED_ZONES: usize = 3;

/// Machine id → availability zone, for machines that declare one.
pub fn machines_to_az(document: &TopologyDocument, diagnostics: &mut Diagnostics) -> BTreeMap<String, String> {
    let mut zones = BTreeMap::new();
    for (id, machine) in &document.machines {
        let Some(hardware) = machine.as_ref().and_then(|m| m.hardware.as_deref()) else {
            diagnostics.warn(format!("Machine {} has no hardware info; skipping.", id));
            continue;
        };
        match availability_zone(hardware) {
            Some(az) => {
                zones.insert(id.to_string(), az.to_string());
            }
            None => diagnostics.warn(format!(
                "Machine {} has no availability-zone info in hardware field; skipping.",
                id
            )),
        }
    }
    zones
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unbalanced {
    pub application: String,
    pub num_units: usize,
    pub per_zone: BTreeMap<String, usize>,
}

impl Unbalanced {
    /// `zone1: 1, zone2: 0, zone3: 2`
    pub fn az_map(&self) -> String {
        self.per_zone
            .iter()
            .map(|(az, count)| format!("{}: {}", az, count))
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn violation(&self) -> Violation {
        let az_map = self.az_map();
        Violation::new(
            ViolationKind::AzUnbalance,
            format!(
                "Application '{}' is unbalanced across AZs: {} units, deployed as: {}",
                self.application, self.num_units, az_map
            ),
        )
        .with("application", self.application.as_str())
        .with("num_units", self.num_units)
        .with("az_map", az_map)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AzFindings {
    InvalidZoneCount(usize),
    Checked(Vec<Unbalanced>),
}

impl AzFindings {
    pub fn violations(&self) -> Vec<Violation> {
        match self {
            AzFindings::InvalidZoneCount(num_azs) => vec![Violation::new(
                ViolationKind::AzInvalidNumber,
                format!("Invalid number of AZs: '{}', expecting {}", num_azs, EXPECTED_ZONES),
            )
            .with("num_azs", *num_azs)],
            AzFindings::Checked(unbalanced) => unbalanced.iter().map(Unbalanced::violation).collect(),
        }
    }
}

pub fn check_azs(document: &TopologyDocument, diagnostics: &mut Diagnostics) -> AzFindings {
    let zones = machines_to_az(document, diagnostics);
    let mut distinct: Vec<&String> = zones.values().collect();
    distinct.sort();
    distinct.dedup();
    if distinct.len() != EXPECTED_ZONES {
        return AzFindings::InvalidZoneCount(distinct.len());
    }

    let mut unbalanced = Vec::new();
    for (name, app) in document.applications() {
        let num_units = app.unit_count();
        if num_units <= 1 {
            continue;
        }
        let min_per_az = num_units / EXPECTED_ZONES;
        let mut per_zone: BTreeMap<String, usize> =
            distinct.iter().map(|az| ((*az).clone(), 0)).collect();

        for (unit, spec) in app.units.iter().flatten() {
            let Some(machine) = &spec.machine else {
                diagnostics.warn(format!("{}: unit {} has no machine", name, unit));
                continue;
            };
            let host = host_of(machine.as_str());
            match zones.get(host) {
                Some(az) => *per_zone.entry(az.clone()).or_default() += 1,
                None => diagnostics.warn(format!(
                    "{}: Can't find machine {} in machine to AZ mapping data",
                    name, host
                )),
            }
        }

        if per_zone.values().any(|count| *count < min_per_az) {
            unbalanced.push(Unbalanced {
                application: name.clone(),
                num_units,
                per_zone,
            });
        }
    }
    AzFindings::Checked(unbalanced)
}
