// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cloud types and their signature charms.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloudType {
    Openstack,
    Kubernetes,
    /// Accepted but carries no extra rules.
    #[serde(untagged)]
    Other(String),
}

impl CloudType {
    pub const KNOWN: [CloudType; 2] = [CloudType::Openstack, CloudType::Kubernetes];

    pub fn is_known(&self) -> bool {
        !matches!(self, CloudType::Other(_))
    }

    /// Charms typically deployed on this kind of cloud.
    pub fn typical_charms(&self) -> &'static [&'static str] {
        match self {
            CloudType::Openstack => &[
                "keystone",
                "nova-compute",
                "nova-cloud-controller",
                "glance",
                "openstack-dashboard",
                "neutron-api",
            ],
            CloudType::Kubernetes => &[
                "kubernetes-worker",
                "kubernetes-control-plane",
                "containerd",
                "calico",
                "canal",
                "etcd",
            ],
            CloudType::Other(_) => &[],
        }
    }

    /// Guess the cloud type from deployed charms: two signature charms suffice.
    pub fn detect(charms: &BTreeSet<String>) -> Option<(CloudType, Vec<String>)> {
        Self::KNOWN.into_iter().find_map(|cloud| {
            let matched: Vec<String> = cloud
                .typical_charms()
                .iter()
                .filter(|charm| charms.contains(**charm))
                .map(|charm| charm.to_string())
                .collect();
            (matched.len() >= 2).then_some((cloud, matched))
        })
    }
}

impl FromStr for CloudType {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(match raw {
            "openstack" => CloudType::Openstack,
            "kubernetes" => CloudType::Kubernetes,
            other => CloudType::Other(other.to_string()),
        })
    }
}

impl fmt::Display for CloudType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CloudType::Openstack => write!(f, "openstack"),
            CloudType::Kubernetes => write!(f, "kubernetes"),
            CloudType::Other(name) => write!(f, "{}", name),
        }
    }
}
