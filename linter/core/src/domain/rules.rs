// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Lint Rules
//!
//! Typed view of a site policy file. Keys follow the rules-file format,
//! which uses spaces in top-level names:
//!
//! ```yaml
//! known charms: [ntp, ubuntu, nrpe]
//! operations mandatory: [ubuntu]
//! subordinates:
//!   ntp:
//!     where: all
//!   nrpe:
//!     where: container aware
//!     host-suffixes: [host, physical]
//!     container-suffixes: [container, lxd]
//! config:
//!   ceph-osd:
//!     osd-devices:
//!       isset: true
//! relations:
//!   - charm: nrpe
//!     check:
//!       - ["*:nrpe-external-master", "nrpe:nrpe-external-master"]
//! space checks:
//!   enforce relations:
//!     - ["keystone:shared-db", "mysql:shared-db"]
//! ```
//!
//! Rules are read-only once loaded and are shared between lint passes.

use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::error::LintError;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LintRules {
    /// `None` disables the unrecognised charm check.
    #[serde(rename = "known charms", default, skip_serializing_if = "Option::is_none")]
    pub known_charms: Option<Vec<String>>,

    #[serde(rename = "operations mandatory", default)]
    pub operations_mandatory: Vec<String>,

    #[serde(rename = "openstack mandatory", default)]
    pub openstack_mandatory: Vec<String>,

    #[serde(rename = "operations openstack mandatory", default)]
    pub operations_openstack_mandatory: Vec<String>,

    #[serde(rename = "kubernetes mandatory", default)]
    pub kubernetes_mandatory: Vec<String>,

    #[serde(rename = "operations kubernetes mandatory", default)]
    pub operations_kubernetes_mandatory: Vec<String>,

    #[serde(default)]
    pub subordinates: BTreeMap<String, SubordinateRule>,

    #[serde(default)]
    pub config: BTreeMap<String, BTreeMap<String, ConfigRule>>,

    #[serde(rename = "openstack config", default)]
    pub openstack_config: BTreeMap<String, BTreeMap<String, ConfigRule>>,

    /// `None` when the rules file has no `relations` section.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relations: Option<Vec<RelationRule>>,

    #[serde(rename = "space checks", default)]
    pub space_checks: SpaceChecks,

    /// Charms that may be satisfied by a cross-model relation.
    #[serde(default)]
    pub saas: Vec<String>,
}

impl LintRules {
    pub fn from_yaml_str(yaml: &str) -> Result<Self, LintError> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn from_value(value: Value) -> Result<Self, LintError> {
        Ok(serde_yaml::from_value(value)?)
    }

    /// Check every placement policy up front.
    pub fn validate(&self) -> Result<(), LintError> {
        for (charm, rule) in &self.subordinates {
            rule.placement(charm)?;
        }
        Ok(())
    }
}

// ============================================================================
// Subordinates
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SubordinateRule {
    #[serde(rename = "where")]
    pub where_: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub container_suffixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host_suffixes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exceptions: Vec<String>,
    #[serde(default)]
    pub allow_multiple: bool,
}

impl SubordinateRule {
    pub fn new(where_: impl Into<String>) -> Self {
        Self {
            where_: where_.into(),
            ..Default::default()
        }
    }

    pub fn placement(&self, charm: &str) -> Result<Placement, LintError> {
        self.where_.parse().map_err(|_| LintError::InvalidPlacement {
            charm: charm.to_string(),
            policy: self.where_.clone(),
        })
    }
}

/// Where a subordinate charm is required to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    All,
    AllOrNothing,
    On(String),
    AllExcept(String),
    HostOnly,
    MetalOnly,
    ContainerAware,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPlacement(pub String);

impl FromStr for Placement {
    type Err = UnknownPlacement;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "all" => Ok(Placement::All),
            "all or nothing" => Ok(Placement::AllOrNothing),
            "host only" => Ok(Placement::HostOnly),
            "metal only" => Ok(Placement::MetalOnly),
            "container aware" => Ok(Placement::ContainerAware),
            other => {
                if let Some(app) = other.strip_prefix("all except ") {
                    Ok(Placement::AllExcept(app.to_string()))
                } else if let Some(app) = other.strip_prefix("on ") {
                    Ok(Placement::On(app.to_string()))
                } else {
                    Err(UnknownPlacement(other.to_string()))
                }
            }
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::All => write!(f, "all"),
            Placement::AllOrNothing => write!(f, "all or nothing"),
            Placement::On(app) => write!(f, "on {}", app),
            Placement::AllExcept(app) => write!(f, "all except {}", app),
            Placement::HostOnly => write!(f, "host only"),
            Placement::MetalOnly => write!(f, "metal only"),
            Placement::ContainerAware => write!(f, "container aware"),
        }
    }
}

// ============================================================================
// Config assertions
// ============================================================================

/// Checks for one configuration key: `{operator: expected, suffixes: [..]}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRule {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suffixes: Vec<String>,

    /// Operator name → expected value. Unknown operators are kept so they
    /// can be reported instead of silently dropped.
    #[serde(flatten)]
    pub checks: BTreeMap<String, Value>,
}

// ============================================================================
// Relations
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RelationRule {
    pub charm: String,
    #[serde(default)]
    pub check: Vec<Vec<String>>,
    #[serde(default)]
    pub not_exist: Vec<Vec<String>>,
    #[serde(default)]
    pub exception: Vec<String>,
    #[serde(default)]
    pub ubiquitous: bool,
}

// ============================================================================
// Spaces
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpaceChecks {
    #[serde(rename = "enforce endpoints", default)]
    pub enforce_endpoints: Vec<String>,
    #[serde(rename = "ignore endpoints", default)]
    pub ignore_endpoints: Vec<String>,
    #[serde(rename = "enforce relations", default)]
    pub enforce_relations: Vec<(String, String)>,
    #[serde(rename = "ignore relations", default)]
    pub ignore_relations: Vec<(String, String)>,
}
