// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Topology Document Parser
//!
//! Serde representation of the YAML documents produced by `juju status
//! --format yaml` and `juju export-bundle`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Parse external YAML into typed documents
//! - **Anti-Corruption:** Only the views in this layer look at raw fields
//!
//! # Document Shapes
//!
//! ```yaml
//! # status
//! applications:
//!   ubuntu:
//!     charm: cs:ubuntu-18
//!     units:
//!       ubuntu/0:
//!         machine: "0"
//!         subordinates:
//!           ntp/0: {}
//! machines:
//!   "0":
//!     hardware: arch=amd64 availability-zone=zone1
//!
//! # bundle
//! applications:
//!   ubuntu:
//!     charm: ubuntu
//!     to: ["0", "lxd:0"]
//!   ntp:
//!     charm: ntp
//! machines:
//!   "0": {}
//! relations:
//!   - ["ntp:juju-info", "ubuntu:juju-info"]
//! ```
//!
//! A stream may concatenate several documents (`juju export-bundle` emits
//! offer overlays as extra documents); see [`select_main_document`].

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

use crate::domain::error::LintError;
use crate::domain::topology::EndpointsField;

#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("YAML stream contains no documents")]
    Empty,

    #[error("Failed to parse topology document: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl From<DocumentError> for LintError {
    fn from(err: DocumentError) -> Self {
        LintError::Document(err.to_string())
    }
}

// ============================================================================
// Machine references
// ============================================================================

/// A machine id. Documents write them as strings or bare integers.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct MachineRef(pub String);

impl MachineRef {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MachineRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MachineRef {
    fn from(id: &str) -> Self {
        MachineRef(id.to_string())
    }
}

impl<'de> Deserialize<'de> for MachineRef {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawMachineRef {
            Text(String),
            Unsigned(u64),
            Signed(i64),
        }

        Ok(match RawMachineRef::deserialize(deserializer)? {
            RawMachineRef::Text(id) => MachineRef(id),
            RawMachineRef::Unsigned(id) => MachineRef(id.to_string()),
            RawMachineRef::Signed(id) => MachineRef(id.to_string()),
        })
    }
}

// ============================================================================
// YAML Schema (External Representation)
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TopologyDocument {
    /// `services` is the Juju 1 name of the same key.
    #[serde(alias = "services", default)]
    pub applications: Option<BTreeMap<String, ApplicationSpec>>,

    #[serde(default)]
    pub machines: BTreeMap<MachineRef, Option<MachineSpec>>,

    /// Present on bundles only.
    #[serde(default)]
    pub relations: Option<Vec<Vec<String>>>,

    #[serde(default)]
    pub saas: Option<BTreeMap<String, Value>>,

    #[serde(rename = "application-endpoints", default)]
    pub application_endpoints: Option<BTreeMap<String, Value>>,

    #[serde(rename = "remote-applications", default)]
    pub remote_applications: Option<BTreeMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApplicationSpec {
    #[serde(default)]
    pub charm: Option<String>,

    #[serde(default)]
    pub options: Option<BTreeMap<String, Value>>,

    #[serde(default)]
    pub endpoint_bindings: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub bindings: Option<BTreeMap<String, String>>,

    #[serde(default)]
    pub units: Option<BTreeMap<String, UnitSpec>>,

    /// Status only: endpoint → related applications.
    #[serde(default)]
    pub relations: BTreeMap<String, Vec<RelatedApplication>>,

    /// Bundle only: placement directives.
    #[serde(default)]
    pub to: Vec<MachineRef>,

    #[serde(default)]
    pub offers: Option<Value>,

    #[serde(default)]
    pub application_status: Option<StatusInfo>,
}

impl ApplicationSpec {
    pub fn endpoints(&self, field: EndpointsField) -> Option<&BTreeMap<String, String>> {
        match field {
            EndpointsField::EndpointBindings => self.endpoint_bindings.as_ref(),
            EndpointsField::Bindings => self.bindings.as_ref(),
        }
    }

    pub fn unit_count(&self) -> usize {
        self.units.as_ref().map(BTreeMap::len).unwrap_or(0)
    }
}

/// Status documents list related applications either by name or, on newer
/// Juju releases, as detail records.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RelatedApplication {
    Name(String),
    Detailed {
        #[serde(rename = "related-application")]
        related_application: String,
    },
}

impl RelatedApplication {
    pub fn name(&self) -> &str {
        match self {
            RelatedApplication::Name(name) => name,
            RelatedApplication::Detailed {
                related_application,
            } => related_application,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct UnitSpec {
    #[serde(default)]
    pub machine: Option<MachineRef>,

    #[serde(default)]
    pub subordinates: BTreeMap<String, Option<UnitSpec>>,

    #[serde(default)]
    pub workload_status: Option<StatusInfo>,

    #[serde(default)]
    pub juju_status: Option<StatusInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct MachineSpec {
    #[serde(default)]
    pub hardware: Option<String>,

    #[serde(default)]
    pub machine_status: Option<StatusInfo>,

    #[serde(default)]
    pub juju_status: Option<StatusInfo>,

    #[serde(default)]
    pub containers: BTreeMap<MachineRef, Option<MachineSpec>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StatusInfo {
    #[serde(default)]
    pub current: Option<String>,
    #[serde(default)]
    pub since: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

// ============================================================================
// Document queries
// ============================================================================

const CMR_KEYS: [&str; 3] = ["saas", "application-endpoints", "remote-applications"];

impl TopologyDocument {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, DocumentError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn has_applications(&self) -> bool {
        self.applications.is_some()
    }

    pub fn applications(&self) -> impl Iterator<Item = (&String, &ApplicationSpec)> {
        self.applications.iter().flat_map(|apps| apps.iter())
    }

    pub fn application(&self, name: &str) -> Option<&ApplicationSpec> {
        self.applications.as_ref().and_then(|apps| apps.get(name))
    }

    /// Bundles carry a top-level relation list, status documents do not.
    pub fn is_bundle(&self) -> bool {
        self.relations.is_some()
    }

    /// Offer overlays declare `offers` under one of their applications.
    pub fn is_offer_overlay(&self) -> bool {
        self.applications().any(|(_, app)| app.offers.is_some())
    }

    pub fn machine(&self, id: &str) -> Option<&MachineSpec> {
        self.machines
            .get(&MachineRef::from(id))
            .and_then(Option::as_ref)
    }

    /// Cross-model application names, from the first CMR key present.
    pub fn cmr_applications(&self) -> Option<(&'static str, Vec<String>)> {
        let sections = [
            &self.saas,
            &self.application_endpoints,
            &self.remote_applications,
        ];
        CMR_KEYS
            .iter()
            .zip(sections)
            .find_map(|(key, section)| {
                section
                    .as_ref()
                    .map(|apps| (*key, apps.keys().cloned().collect()))
            })
    }
}

/// Pick the authoritative document out of a possibly multi-document stream.
///
/// Offer overlays are skipped; when every document is an overlay the first
/// one is used.
pub fn select_main_document(yaml: &str) -> Result<TopologyDocument, DocumentError> {
    let mut first = None;
    for raw in serde_yaml::Deserializer::from_str(yaml) {
        let document = TopologyDocument::deserialize(raw)?;
        if !document.is_offer_overlay() {
            return Ok(document);
        }
        if first.is_none() {
            first = Some(document);
        }
    }
    first.ok_or(DocumentError::Empty)
}
