// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Relations and `application:endpoint` references.

use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

pub const WILDCARD_APP: &str = "*";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected '<application>:<endpoint>', got '{0}'")]
pub struct EndpointFormatError(pub String);

/// A parsed `application:endpoint` reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EndpointRef {
    pub app: String,
    pub endpoint: String,
}

impl EndpointRef {
    pub fn new(app: impl Into<String>, endpoint: impl Into<String>) -> Self {
        Self {
            app: app.into(),
            endpoint: endpoint.into(),
        }
    }

    pub fn parse(raw: &str) -> Result<Self, EndpointFormatError> {
        let mut parts = raw.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(app), Some(endpoint), None) if !app.is_empty() => {
                Ok(Self::new(app, endpoint))
            }
            _ => Err(EndpointFormatError(raw.to_string())),
        }
    }

    pub fn is_wildcard(&self) -> bool {
        self.app == WILDCARD_APP
    }
}

impl fmt::Display for EndpointRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.app, self.endpoint)
    }
}

/// Unordered pair of endpoints. Provider and requirer roles are ignored.
#[derive(Debug, Clone, Eq, Serialize)]
pub struct Relation {
    pub endpoint1: String,
    pub endpoint2: String,
}

impl Relation {
    pub fn new(endpoint1: impl Into<String>, endpoint2: impl Into<String>) -> Self {
        Self {
            endpoint1: endpoint1.into(),
            endpoint2: endpoint2.into(),
        }
    }

    pub fn endpoints(&self) -> [&str; 2] {
        [&self.endpoint1, &self.endpoint2]
    }

    pub fn involves(&self, endpoint: &str) -> bool {
        self.endpoint1 == endpoint || self.endpoint2 == endpoint
    }
}

impl PartialEq for Relation {
    fn eq(&self, other: &Self) -> bool {
        (self.endpoint1 == other.endpoint1 && self.endpoint2 == other.endpoint2)
            || (self.endpoint1 == other.endpoint2 && self.endpoint2 == other.endpoint1)
    }
}

impl fmt::Display for Relation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relation({} - {})", self.endpoint1, self.endpoint2)
    }
}

/// Two related endpoints bound to different spaces.
///
/// Endpoints are kept in lexicographic order so equal mismatches render the
/// same way regardless of the relation's declared direction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpaceMismatch {
    pub endpoint1: String,
    pub space1: String,
    pub endpoint2: String,
    pub space2: String,
}

impl SpaceMismatch {
    pub fn new(endpoint1: &str, space1: &str, endpoint2: &str, space2: &str) -> Self {
        let (endpoint1, space1, endpoint2, space2) = if endpoint2 < endpoint1 {
            (endpoint2, space2, endpoint1, space1)
        } else {
            (endpoint1, space1, endpoint2, space2)
        };
        Self {
            endpoint1: endpoint1.to_string(),
            space1: space1.to_string(),
            endpoint2: endpoint2.to_string(),
            space2: space2.to_string(),
        }
    }

    pub fn relation(&self) -> Relation {
        Relation::new(self.endpoint1.clone(), self.endpoint2.clone())
    }

    /// The same relation with application names replaced by their charms.
    pub fn charm_relation(
        &self,
        app_to_charm: &BTreeMap<String, String>,
    ) -> Result<Relation, EndpointFormatError> {
        let qualify = |raw: &str| -> Result<String, EndpointFormatError> {
            let endpoint = EndpointRef::parse(raw)?;
            let charm = app_to_charm
                .get(&endpoint.app)
                .map(String::as_str)
                .unwrap_or("");
            Ok(format!("{}:{}", charm, endpoint.endpoint))
        };
        Ok(Relation::new(
            qualify(&self.endpoint1)?,
            qualify(&self.endpoint2)?,
        ))
    }
}

impl fmt::Display for SpaceMismatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SpaceMismatch({} (space {}) != {} (space {}))",
            self.endpoint1, self.space1, self.endpoint2, self.space2
        )
    }
}
