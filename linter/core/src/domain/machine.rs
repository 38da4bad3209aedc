// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Machine identifiers and hardware descriptors.
//!
//! Status documents name containers `<host>/lxd/<n>`, bundles name them
//! `lxd:<host>`. Hardware descriptors are whitespace separated `key=value`
//! tokens, e.g. `arch=amd64 cores=2 availability-zone=zone1 tags=virtual,foo`.

use serde::Serialize;

const CONTAINER_MARKER: &str = "lxd";
const AZ_PREFIX: &str = "availability-zone=";
const TAGS_PREFIX: &str = "tags=";

/// True for container machine ids (`1/lxd/0`, `lxd:1`).
pub fn is_container(machine: &str) -> bool {
    machine.contains('/')
        || machine
            .split(|c| c == ':' || c == '/')
            .any(|segment| segment == CONTAINER_MARKER)
}

/// True when the hardware descriptor carries a `virtual` tag.
pub fn is_virtual_machine(hardware: Option<&str>) -> bool {
    hardware
        .map(|hw| {
            hw.split_whitespace()
                .filter_map(|token| token.strip_prefix(TAGS_PREFIX))
                .flat_map(|tags| tags.split(','))
                .any(|tag| tag == "virtual")
        })
        .unwrap_or(false)
}

/// Bare metal: neither a container nor a tagged virtual machine.
pub fn is_metal(machine: &str, hardware: Option<&str>) -> bool {
    !is_container(machine) && !is_virtual_machine(hardware)
}

/// Extract the availability zone tag from a hardware descriptor.
pub fn availability_zone(hardware: &str) -> Option<&str> {
    hardware
        .split_whitespace()
        .find_map(|token| token.strip_prefix(AZ_PREFIX))
        .filter(|az| !az.is_empty())
}

/// Host part of a status machine id (`1/lxd/0` → `1`).
pub fn host_of(machine: &str) -> &str {
    machine.split('/').next().unwrap_or(machine)
}

/// Ordering key for machine ids, computed by each topology view.
///
/// Ids whose host part is not numeric sort after every numeric host.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MachineSortKey {
    pub host: u64,
    pub kind: String,
    pub index: u64,
}

impl MachineSortKey {
    pub fn new(host: u64, kind: impl Into<String>, index: u64) -> Self {
        Self {
            host,
            kind: kind.into(),
            index,
        }
    }

    pub(crate) fn parse_number(raw: &str) -> u64 {
        raw.trim().parse().unwrap_or(u64::MAX)
    }
}
