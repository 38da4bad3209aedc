// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Charm reference normalisation.
//!
//! Charm references come in many shapes depending on the Juju version and
//! charm store that produced the document:
//!
//! | Reference | Charm |
//! |-----------|-------|
//! | `ntp` | `ntp` |
//! | `cs:ntp-47` | `ntp` |
//! | `cs:~llama-charmers/bionic/ntp-3` | `ntp` |
//! | `ch:amd64/focal/nrpe-86` | `nrpe` |
//! | `local:focal/ceph-osd-0` | `ceph-osd` |

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::error::LintError;

static CHARM_REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[A-Za-z0-9]+:)?(?:~[\w.-]+/)?(?:[\w.-]+/)*([A-Za-z0-9-]+?)(?:-\d+)?$")
        .expect("charm reference pattern is valid")
});

/// Extract the bare charm name from a charm reference.
///
/// Extraction is idempotent: feeding back a bare name yields the same name.
pub fn extract_charm_name(reference: &str) -> Result<String, LintError> {
    let reference = reference.trim();
    CHARM_REFERENCE
        .captures(reference)
        .and_then(|caps| caps.get(1))
        .map(|name| name.as_str().to_string())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| LintError::MalformedCharm(reference.to_string()))
}
