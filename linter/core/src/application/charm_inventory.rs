// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Charm inventory checks: which charms are deployed, which are expected.

use std::collections::BTreeSet;

use crate::domain::cloud::CloudType;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::rules::LintRules;
use crate::domain::violation::{Violation, ViolationKind};
use crate::infrastructure::document::TopologyDocument;

/// Applications that declare no charm at all.
pub fn unmapped_applications(document: &TopologyDocument) -> Vec<Violation> {
    document
        .applications()
        .filter(|(_, app)| app.charm.is_none())
        .map(|(name, _)| {
            Violation::new(
                ViolationKind::CharmNotMapped,
                format!("Could not detect which charm is used for application {}", name),
            )
            .with("application", name.as_str())
        })
        .collect()
}

/// An explicit cloud type wins; otherwise it is guessed from the charms.
pub fn resolve_cloud_type(
    explicit: Option<CloudType>,
    charms: &BTreeSet<String>,
    diagnostics: &mut Diagnostics,
) -> Option<CloudType> {
    if let Some(cloud) = explicit {
        if !cloud.is_known() {
            diagnostics.warn(format!("Cloud type {} is unknown", cloud));
        }
        return Some(cloud);
    }
    let (cloud, matched) = CloudType::detect(charms)?;
    diagnostics.warn(format!(
        "Setting cloud-type to '{}'. Deployment has these charms: {} that are typically from {}.",
        cloud,
        matched.join(", "),
        cloud
    ));
    Some(cloud)
}

/// Names of applications consumed over cross-model relations.
///
/// A `graylog` offer also brings its `elasticsearch` backend along.
pub fn cmr_applications(document: &TopologyDocument, diagnostics: &Diagnostics) -> BTreeSet<String> {
    let Some((key, names)) = document.cmr_applications() else {
        return BTreeSet::new();
    };
    diagnostics.debug(format!("Cross-model applications found under '{}'", key));
    let mut apps = BTreeSet::new();
    for name in names {
        if name.starts_with("graylog") {
            apps.insert("elasticsearch".to_string());
        }
        apps.insert(name);
    }
    apps
}

pub struct CharmChecker<'a> {
    rules: &'a LintRules,
    cloud_type: Option<&'a CloudType>,
}

impl<'a> CharmChecker<'a> {
    pub fn new(rules: &'a LintRules, cloud_type: Option<&'a CloudType>) -> Self {
        Self { rules, cloud_type }
    }

    pub fn evaluate(
        &self,
        charms: &BTreeSet<String>,
        cmr_apps: &BTreeSet<String>,
        diagnostics: &Diagnostics,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();

        match &self.rules.known_charms {
            Some(known) => violations.extend(
                charms
                    .iter()
                    .filter(|charm| !known.contains(*charm))
                    .map(|charm| {
                        Violation::new(
                            ViolationKind::UnrecognisedCharm,
                            format!("Charm '{}' not recognised", charm),
                        )
                        .with("charm", charm.as_str())
                    }),
            ),
            None => diagnostics.debug("No known charms listed; skipping recognition check"),
        }

        for charm in &self.rules.operations_mandatory {
            if !self.ops_charm_present(charm, charms, cmr_apps) {
                violations.push(
                    Violation::new(
                        ViolationKind::OpsCharmMissing,
                        format!("Ops charm '{}' is missing", charm),
                    )
                    .with("charm", charm.as_str()),
                );
            }
        }

        let cloud_rules = match self.cloud_type {
            Some(CloudType::Openstack) => [
                (&self.rules.openstack_mandatory, ViolationKind::OpenstackCharmMissing, "Openstack charm"),
                (
                    &self.rules.operations_openstack_mandatory,
                    ViolationKind::OpenstackOpsCharmMissing,
                    "Openstack ops charm",
                ),
            ],
            Some(CloudType::Kubernetes) => [
                (&self.rules.kubernetes_mandatory, ViolationKind::KubernetesCharmMissing, "Kubernetes charm"),
                (
                    &self.rules.operations_kubernetes_mandatory,
                    ViolationKind::KubernetesOpsCharmMissing,
                    "Kubernetes ops charm",
                ),
            ],
            _ => return violations,
        };
        for (required, kind, label) in cloud_rules {
            for charm in required.iter().filter(|charm| !charms.contains(*charm)) {
                violations.push(
                    Violation::new(kind, format!("{} '{}' is missing", label, charm))
                        .with("charm", charm.as_str()),
                );
            }
        }
        violations
    }

    /// Deployed, or offered by a remote model under a related name.
    fn ops_charm_present(&self, charm: &str, charms: &BTreeSet<String>, cmr_apps: &BTreeSet<String>) -> bool {
        if charms.contains(charm) {
            return true;
        }
        self.rules.saas.iter().any(|saas| saas == charm)
            && cmr_apps.iter().any(|app| charm.starts_with(app.as_str()))
    }
}
