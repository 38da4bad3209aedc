// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Space Binding Checker
//!
//! Works directly on the bundle document: every relation whose two
//! endpoints resolve to different network spaces is a mismatch. Mismatches
//! are warnings unless an `enforce` override matches them; `ignore`
//! overrides silence them. Overrides are compared against the relation with
//! application names replaced by charm names.

use std::collections::BTreeMap;

use crate::domain::diagnostics::Diagnostics;
use crate::domain::relation::{EndpointFormatError, EndpointRef, Relation, SpaceMismatch};
use crate::domain::rules::SpaceChecks;
use crate::domain::violation::{Violation, ViolationKind};
use crate::infrastructure::document::TopologyDocument;

const DEFAULT_SPACE: &str = "alpha";
const CROSS_MODEL: &str = "XModel";

/// application → endpoint → space; `""` is the default binding.
type AppSpaces = BTreeMap<String, BTreeMap<String, String>>;

fn application_spaces(document: &TopologyDocument, diagnostics: &mut Diagnostics) -> AppSpaces {
    let mut spaces = AppSpaces::new();
    for (name, app) in document.applications() {
        let bindings = app.bindings.clone().unwrap_or_default();
        if bindings.is_empty() {
            diagnostics.warn(format!("Application {} is missing explicit bindings", name));
            diagnostics.warn(format!("Setting default binding of '{}' to {}", name, DEFAULT_SPACE));
            spaces.insert(
                name.clone(),
                BTreeMap::from([(String::new(), DEFAULT_SPACE.to_string())]),
            );
            continue;
        }
        if bindings.get("").map(String::is_empty).unwrap_or(true) {
            diagnostics.warn(format!(
                "Application {} does not define explicit default binding",
                name
            ));
        }
        spaces.insert(name.clone(), bindings);
    }
    spaces
}

fn relation_space(
    endpoint: &str,
    spaces: &AppSpaces,
    diagnostics: &mut Diagnostics,
) -> Result<String, EndpointFormatError> {
    let endpoint = EndpointRef::parse(endpoint)?;
    let Some(bindings) = spaces.get(&endpoint.app) else {
        diagnostics.warn(format!(
            "Multi-model is not supported yet. Please check if '{}' is from another model",
            endpoint.app
        ));
        return Ok(CROSS_MODEL.to_string());
    };
    Ok(bindings
        .get(&endpoint.endpoint)
        .or_else(|| bindings.get(""))
        .filter(|space| !space.is_empty())
        .cloned()
        .unwrap_or_else(|| DEFAULT_SPACE.to_string()))
}

/// Every relation of the document whose endpoints sit in different spaces.
pub fn find_space_mismatches(
    document: &TopologyDocument,
    diagnostics: &mut Diagnostics,
) -> Vec<SpaceMismatch> {
    let spaces = application_spaces(document, diagnostics);
    let mut mismatches = Vec::new();

    for pair in document.relations.iter().flatten() {
        let [left, right] = pair.as_slice() else {
            diagnostics.warn(format!("Skipping malformed relation {:?}", pair));
            continue;
        };
        let resolved = relation_space(left, &spaces, diagnostics)
            .and_then(|a| Ok((a, relation_space(right, &spaces, diagnostics)?)));
        let (left_space, right_space) = match resolved {
            Ok(pair) => pair,
            Err(err) => {
                diagnostics.warn(format!("Skipping relation during space check: {}", err));
                continue;
            }
        };
        if left_space != right_space && left_space != CROSS_MODEL && right_space != CROSS_MODEL {
            mismatches.push(SpaceMismatch::new(left, &left_space, right, &right_space));
        }
    }
    mismatches
}

pub struct SpaceChecker<'a> {
    checks: &'a SpaceChecks,
    enforce_relations: Vec<Relation>,
    ignore_relations: Vec<Relation>,
}

impl<'a> SpaceChecker<'a> {
    pub fn new(checks: &'a SpaceChecks) -> Self {
        let to_relations = |pairs: &[(String, String)]| -> Vec<Relation> {
            pairs
                .iter()
                .map(|(a, b)| Relation::new(a.clone(), b.clone()))
                .collect()
        };
        Self {
            checks,
            enforce_relations: to_relations(&checks.enforce_relations),
            ignore_relations: to_relations(&checks.ignore_relations),
        }
    }

    pub fn evaluate(
        &self,
        document: &TopologyDocument,
        app_to_charm: &BTreeMap<String, String>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for mismatch in find_space_mismatches(document, diagnostics) {
            match self.handle_mismatch(&mismatch, app_to_charm, diagnostics) {
                Ok(Some(violation)) => violations.push(violation),
                Ok(None) => {}
                Err(err) => diagnostics.warn(format!(
                    "Exception caught during space check; please check space by hand. {}",
                    err
                )),
            }
        }
        violations
    }

    /// Enforce beats ignore; unmatched mismatches are only warned about.
    fn handle_mismatch(
        &self,
        mismatch: &SpaceMismatch,
        app_to_charm: &BTreeMap<String, String>,
        diagnostics: &mut Diagnostics,
    ) -> Result<Option<Violation>, EndpointFormatError> {
        let relation = mismatch.charm_relation(app_to_charm)?;
        let endpoints = relation.endpoints();

        let enforced = self
            .checks
            .enforce_endpoints
            .iter()
            .any(|e| endpoints.contains(&e.as_str()))
            || self.enforce_relations.contains(&relation);
        let ignored = self
            .checks
            .ignore_endpoints
            .iter()
            .any(|e| endpoints.contains(&e.as_str()))
            || self.ignore_relations.contains(&relation);

        let message = format!("Space binding mismatch: {}", mismatch);
        if enforced {
            return Ok(Some(
                Violation::new(ViolationKind::SpaceBindingMismatch, message)
                    .with("endpoint1", mismatch.endpoint1.as_str())
                    .with("space1", mismatch.space1.as_str())
                    .with("endpoint2", mismatch.endpoint2.as_str())
                    .with("space2", mismatch.space2.as_str()),
            ));
        }
        if !ignored {
            diagnostics.warn(message);
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BUNDLE: &str = r#"
applications:
  keystone:
    charm: keystone
    bindings:
      "": internal
      public: public
  mysql:
    charm: mysql-innodb-cluster
    bindings:
      "": db
  ubuntu:
    charm: ubuntu
  partial:
    charm: partial
    bindings:
      admin: admin
relations:
  - ["keystone:shared-db", "mysql:shared-db"]
  - ["keystone:public", "ubuntu:juju-info"]
  - ["keystone:identity", "remote-app:identity"]
  - ["partial:db", "ubuntu:juju-info"]
  - ["broken", "ubuntu:juju-info"]
"#;

    fn document() -> TopologyDocument {
        TopologyDocument::from_yaml_str(BUNDLE).unwrap()
    }

    fn app_to_charm() -> BTreeMap<String, String> {
        document()
            .applications()
            .map(|(name, app)| (name.clone(), app.charm.clone().unwrap()))
            .collect()
    }

    #[test]
    fn test_find_space_mismatches() {
        let mut diagnostics = Diagnostics::default();
        let mismatches = find_space_mismatches(&document(), &mut diagnostics);
        assert_eq!(
            mismatches,
            vec![
                SpaceMismatch::new("keystone:shared-db", "internal", "mysql:shared-db", "db"),
                SpaceMismatch::new("keystone:public", "public", "ubuntu:juju-info", "alpha"),
            ]
        );
        assert!(diagnostics.has_warning("Application ubuntu is missing explicit bindings"));
        assert!(diagnostics.has_warning("partial does not define explicit default binding"));
        assert!(diagnostics.has_warning("'remote-app' is from another model"));
        assert!(diagnostics.has_warning("Skipping relation during space check"));
    }

    #[test]
    fn test_unmatched_mismatch_is_warning_only() {
        let checks = SpaceChecks::default();
        let mut diagnostics = Diagnostics::default();
        let violations = SpaceChecker::new(&checks).evaluate(&document(), &app_to_charm(), &mut diagnostics);
        assert!(violations.is_empty());
        assert!(diagnostics.has_warning("Space binding mismatch: SpaceMismatch(keystone:shared-db"));
    }

    #[test]
    fn test_enforce_endpoint_uses_charm_names() {
        let checks = SpaceChecks {
            enforce_endpoints: vec!["mysql-innodb-cluster:shared-db".to_string()],
            ..Default::default()
        };
        let violations =
            SpaceChecker::new(&checks).evaluate(&document(), &app_to_charm(), &mut Diagnostics::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(
            violations[0].message,
            "Space binding mismatch: SpaceMismatch(keystone:shared-db (space internal) != mysql:shared-db (space db))"
        );
    }

    #[test]
    fn test_override_relations_are_symmetric() {
        let forward = ("keystone:shared-db".to_string(), "mysql-innodb-cluster:shared-db".to_string());
        let backward = (forward.1.clone(), forward.0.clone());

        for relation in [forward, backward] {
            let enforce = SpaceChecks {
                enforce_relations: vec![relation.clone()],
                ..Default::default()
            };
            let violations =
                SpaceChecker::new(&enforce).evaluate(&document(), &app_to_charm(), &mut Diagnostics::default());
            assert_eq!(violations.len(), 1);

            let ignore = SpaceChecks {
                ignore_relations: vec![relation],
                ..Default::default()
            };
            let mut diagnostics = Diagnostics::default();
            let violations = SpaceChecker::new(&ignore).evaluate(&document(), &app_to_charm(), &mut diagnostics);
            assert!(violations.is_empty());
            assert!(!diagnostics.has_warning("mysql:shared-db (space db)"));
        }
    }

    #[test]
    fn test_enforce_beats_ignore() {
        let checks = SpaceChecks {
            enforce_endpoints: vec!["keystone:public".to_string()],
            ignore_endpoints: vec!["keystone:public".to_string()],
            ..Default::default()
        };
        let violations =
            SpaceChecker::new(&checks).evaluate(&document(), &app_to_charm(), &mut Diagnostics::default());
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field_str("space1"), Some("public"));
    }
}
