// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Topology View
//!
//! The one interface every rule engine queries. Juju produces two very
//! different descriptions of a model:
//!
//! - **status** documents (`juju status --format yaml`): units nested under
//!   applications, machine ids like `1/lxd/0`, endpoint bindings under
//!   `endpoint-bindings`, relations declared per application.
//! - **bundle** documents (`juju export-bundle`): placement via `to:` lists,
//!   machine ids like `lxd:1`, bindings under `bindings`, a top-level
//!   `relations` list of endpoint pairs.
//!
//! Both are normalised into a [`TopologyIndex`] by their view, and the
//! shape-specific queries are the only required trait methods.

use std::collections::{BTreeMap, BTreeSet};

use crate::domain::diagnostics::Diagnostics;
use crate::domain::machine::MachineSortKey;
use crate::domain::relation::{EndpointRef, WILDCARD_APP};

/// `juju-info` is implicit on every application and never listed in bindings.
pub const JUJU_INFO_ENDPOINT: &str = "juju-info";

/// Which application key lists the endpoints of an application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointsField {
    /// `endpoint-bindings`, used by status documents.
    EndpointBindings,
    /// `bindings`, used by bundles.
    Bindings,
}

impl EndpointsField {
    pub fn key(&self) -> &'static str {
        match self {
            EndpointsField::EndpointBindings => "endpoint-bindings",
            EndpointsField::Bindings => "bindings",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationEntry {
    /// `None` when the document gives no charm for the application.
    pub charm: Option<String>,
    pub endpoints: BTreeSet<String>,
}

/// Shape independent facts about a model, built once per lint pass.
#[derive(Debug, Clone, Default)]
pub struct TopologyIndex {
    pub applications: BTreeMap<String, ApplicationEntry>,
    pub machines: BTreeSet<String>,
    pub hardware: BTreeMap<String, String>,
    pub app_to_charm: BTreeMap<String, String>,
    pub charm_to_apps: BTreeMap<String, BTreeSet<String>>,
    pub apps_to_machines: BTreeMap<String, BTreeSet<String>>,
}

impl TopologyIndex {
    pub fn insert_application(
        &mut self,
        name: &str,
        charm: Option<String>,
        endpoints: impl IntoIterator<Item = String>,
    ) {
        if let Some(charm) = &charm {
            self.app_to_charm.insert(name.to_string(), charm.clone());
            self.charm_to_apps
                .entry(charm.clone())
                .or_default()
                .insert(name.to_string());
        }
        self.applications.insert(
            name.to_string(),
            ApplicationEntry {
                charm,
                endpoints: endpoints.into_iter().collect(),
            },
        );
    }

    pub fn place(&mut self, app: &str, machine: &str) {
        self.apps_to_machines
            .entry(app.to_string())
            .or_default()
            .insert(machine.to_string());
    }

    pub fn has_endpoint(&self, app: &str, endpoint: &str) -> bool {
        self.applications
            .get(app)
            .map(|entry| entry.endpoints.contains(endpoint))
            .unwrap_or(false)
    }
}

/// A principal unit and the subordinate applications attached to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitPlacement {
    pub application: String,
    pub unit: String,
    pub machine: String,
    pub subordinates: Vec<String>,
}

pub trait TopologyView: Send + Sync {
    fn index(&self) -> &TopologyIndex;

    fn endpoints_field(&self) -> EndpointsField;

    /// Applications related to any of `apps` on `endpoint`.
    fn filter_by_relation(&self, apps: &BTreeSet<String>, endpoint: &str) -> BTreeSet<String>;

    fn sort_key(&self, machine: &str) -> MachineSortKey;

    /// Principal units in document order, with their attached subordinates.
    fn unit_placements(&self) -> Vec<UnitPlacement>;

    fn applications(&self) -> BTreeSet<String> {
        self.index().applications.keys().cloned().collect()
    }

    fn machines(&self) -> &BTreeSet<String> {
        &self.index().machines
    }

    fn hardware(&self, machine: &str) -> Option<&str> {
        self.index().hardware.get(machine).map(String::as_str)
    }

    fn charms(&self) -> BTreeSet<String> {
        self.index().charm_to_apps.keys().cloned().collect()
    }

    fn app_to_charm(&self) -> &BTreeMap<String, String> {
        &self.index().app_to_charm
    }

    fn charm_to_apps(&self, charm: &str) -> BTreeSet<String> {
        self.index()
            .charm_to_apps
            .get(charm)
            .cloned()
            .unwrap_or_default()
    }

    fn apps_to_machines(&self) -> &BTreeMap<String, BTreeSet<String>> {
        &self.index().apps_to_machines
    }

    /// Machines sorted by the view's canonical machine order.
    fn sorted_machines(&self, machines: &BTreeSet<String>) -> Vec<String> {
        let mut machines: Vec<String> = machines.iter().cloned().collect();
        machines.sort_by_key(|m| self.sort_key(m));
        machines
    }

    /// Resolve an `application:endpoint` reference against the model.
    ///
    /// The wildcard application and the calling charm itself always resolve.
    fn check_endpoint_exists(
        &self,
        app_endpoint: &str,
        charm: &str,
        diagnostics: &mut Diagnostics,
    ) -> Option<EndpointRef> {
        let endpoint = match EndpointRef::parse(app_endpoint) {
            Ok(endpoint) => endpoint,
            Err(err) => {
                diagnostics.warn(err.to_string());
                return None;
            }
        };
        if endpoint.app == WILDCARD_APP || endpoint.app == charm {
            return Some(endpoint);
        }
        if !self.index().applications.contains_key(&endpoint.app) {
            diagnostics.warn(format!("{} not found on applications.", endpoint.app));
            return None;
        }
        if endpoint.endpoint != JUJU_INFO_ENDPOINT
            && !self.index().has_endpoint(&endpoint.app, &endpoint.endpoint)
        {
            diagnostics.warn(format!(
                "endpoint: {} not found on {} ({})",
                endpoint.endpoint,
                endpoint.app,
                self.endpoints_field().key()
            ));
            return None;
        }
        Some(endpoint)
    }

    /// Applications exposing `endpoint`. The wildcard expands to every
    /// application except the ones deployed from `charm`.
    fn filter_by_endpoint(&self, charm: &str, app: &str, endpoint: &str) -> BTreeSet<String> {
        let index = self.index();
        if app == WILDCARD_APP {
            let own = self.charm_to_apps(charm);
            return index
                .applications
                .keys()
                .filter(|name| !own.contains(*name))
                .filter(|name| index.has_endpoint(name, endpoint))
                .cloned()
                .collect();
        }
        if index.has_endpoint(app, endpoint) {
            BTreeSet::from([app.to_string()])
        } else {
            BTreeSet::new()
        }
    }
}
