// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Violations
//!
//! A violation is the expected output of a rule engine. Each carries a
//! stable kebab-case id, a fixed set of tags, a human readable message and
//! whatever structured fields are relevant to its kind. Violations are
//! append-only: once built they are never mutated.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Every kind of violation the linter can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    #[serde(rename = "ops-subordinate-missing")]
    SubordinateMissing,
    #[serde(rename = "subordinate-extraneous")]
    SubordinateExtraneous,
    #[serde(rename = "subordinate-duplicate")]
    SubordinateDuplicate,
    #[serde(rename = "charm-not-mapped")]
    CharmNotMapped,
    #[serde(rename = "unrecognised-charm")]
    UnrecognisedCharm,
    #[serde(rename = "ops-charm-missing")]
    OpsCharmMissing,
    #[serde(rename = "openstack-charm-missing")]
    OpenstackCharmMissing,
    #[serde(rename = "openstack-ops-charm-missing")]
    OpenstackOpsCharmMissing,
    #[serde(rename = "kubernetes-charm-missing")]
    KubernetesCharmMissing,
    #[serde(rename = "kubernetes-ops-charm-missing")]
    KubernetesOpsCharmMissing,
    #[serde(rename = "config-isset-check-true")]
    ConfigIssetTrue,
    #[serde(rename = "config-isset-check-false")]
    ConfigIssetFalse,
    #[serde(rename = "config-eq-check")]
    ConfigEq,
    #[serde(rename = "config-neq-check")]
    ConfigNeq,
    #[serde(rename = "config-gte-check")]
    ConfigGte,
    #[serde(rename = "config-search-check")]
    ConfigSearch,
    #[serde(rename = "missing-relations")]
    MissingRelations,
    #[serde(rename = "relation-exist")]
    RelationExist,
    #[serde(rename = "missing-machine")]
    MissingMachine,
    #[serde(rename = "space-binding-mismatch")]
    SpaceBindingMismatch,
    #[serde(rename = "AZ-invalid-number")]
    AzInvalidNumber,
    #[serde(rename = "AZ-unbalance")]
    AzUnbalance,
    #[serde(rename = "status-unexpected")]
    StatusUnexpected,
}

impl ViolationKind {
    pub fn id(&self) -> &'static str {
        match self {
            Self::SubordinateMissing => "ops-subordinate-missing",
            Self::SubordinateExtraneous => "subordinate-extraneous",
            Self::SubordinateDuplicate => "subordinate-duplicate",
            Self::CharmNotMapped => "charm-not-mapped",
            Self::UnrecognisedCharm => "unrecognised-charm",
            Self::OpsCharmMissing => "ops-charm-missing",
            Self::OpenstackCharmMissing => "openstack-charm-missing",
            Self::OpenstackOpsCharmMissing => "openstack-ops-charm-missing",
            Self::KubernetesCharmMissing => "kubernetes-charm-missing",
            Self::KubernetesOpsCharmMissing => "kubernetes-ops-charm-missing",
            Self::ConfigIssetTrue => "config-isset-check-true",
            Self::ConfigIssetFalse => "config-isset-check-false",
            Self::ConfigEq => "config-eq-check",
            Self::ConfigNeq => "config-neq-check",
            Self::ConfigGte => "config-gte-check",
            Self::ConfigSearch => "config-search-check",
            Self::MissingRelations => "missing-relations",
            Self::RelationExist => "relation-exist",
            Self::MissingMachine => "missing-machine",
            Self::SpaceBindingMismatch => "space-binding-mismatch",
            Self::AzInvalidNumber => "AZ-invalid-number",
            Self::AzUnbalance => "AZ-unbalance",
            Self::StatusUnexpected => "status-unexpected",
        }
    }

    pub fn tags(&self) -> &'static [&'static str] {
        match self {
            Self::SubordinateMissing => &["missing", "ops", "charm", "mandatory", "subordinate"],
            Self::SubordinateExtraneous => &["extraneous", "charm", "subordinate"],
            Self::SubordinateDuplicate => &["duplicate", "charm", "subordinate"],
            Self::CharmNotMapped => &["charm", "mapped", "parsing"],
            Self::UnrecognisedCharm => &["charm", "unrecognised"],
            Self::OpsCharmMissing => &["missing", "ops", "charm", "mandatory", "principal"],
            Self::OpenstackCharmMissing => {
                &["missing", "openstack", "charm", "mandatory", "principal"]
            }
            Self::OpenstackOpsCharmMissing => {
                &["missing", "openstack", "ops", "charm", "mandatory", "principal"]
            }
            Self::KubernetesCharmMissing => {
                &["missing", "kubernetes", "charm", "mandatory", "principal"]
            }
            Self::KubernetesOpsCharmMissing => {
                &["missing", "kubernetes", "ops", "charm", "mandatory", "principal"]
            }
            Self::ConfigIssetTrue | Self::ConfigIssetFalse => &["config", "isset"],
            Self::ConfigEq => &["config", "eq"],
            Self::ConfigNeq => &["config", "neq"],
            Self::ConfigGte => &["config", "gte"],
            Self::ConfigSearch => &["config", "search"],
            Self::MissingRelations => &["relation", "missing"],
            Self::RelationExist => &["relation", "exist"],
            Self::MissingMachine => &["missing", "machine"],
            Self::SpaceBindingMismatch => &["mismatch", "space", "binding"],
            Self::AzInvalidNumber | Self::AzUnbalance => &["AZ"],
            Self::StatusUnexpected => &["status"],
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::SubordinateMissing => "Checks for mandatory Ops subordinates",
            Self::SubordinateExtraneous => "Checks for extraneous subordinates in containers",
            Self::SubordinateDuplicate => "Checks for duplicate subordinates in a machine",
            Self::CharmNotMapped => "Detect the charm used by an application",
            Self::UnrecognisedCharm => "An unrecognised charm is present in the model",
            Self::OpsCharmMissing => "An Ops charm is missing",
            Self::OpenstackCharmMissing => "An Openstack charm is missing",
            Self::OpenstackOpsCharmMissing => "An Openstack ops charm is missing",
            Self::KubernetesCharmMissing => "An Kubernetes charm is missing",
            Self::KubernetesOpsCharmMissing => "An Kubernetes ops charm is missing",
            Self::ConfigIssetTrue => "Checks for config condition 'isset' true",
            Self::ConfigIssetFalse => "Checks for config condition 'isset'",
            Self::ConfigEq => "Checks for config condition 'eq'",
            Self::ConfigNeq => "Checks for config condition 'neq'",
            Self::ConfigGte => "Checks for config condition 'gte'",
            Self::ConfigSearch => "Checks for config condition 'search'",
            Self::MissingRelations => "Checks for mandatory relations",
            Self::RelationExist => "Checks for relations that should not exist",
            Self::MissingMachine => "Checks for mandatory charms on every machine",
            Self::SpaceBindingMismatch => "Unhandled space binding mismatch",
            Self::AzInvalidNumber => "Checks for a valid number or AZs (currently 3)",
            Self::AzUnbalance => "Checks for application balance across AZs",
            Self::StatusUnexpected => "Checks for unexpected status in juju and workload",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One reported policy violation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Violation {
    pub id: ViolationKind,
    pub tags: Vec<&'static str>,
    pub description: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, Value>,
}

impl Violation {
    pub fn new(kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            id: kind,
            tags: kind.tags().to_vec(),
            description: kind.description(),
            message: message.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Attach a structured field.
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn kind(&self) -> ViolationKind {
        self.id
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn field_str(&self, key: &str) -> Option<&str> {
        self.fields.get(key).and_then(Value::as_str)
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.id, self.message)
    }
}
