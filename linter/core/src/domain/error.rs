// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Fatal lint errors.
//!
//! Violations and warnings never surface here. A `LintError` aborts the lint
//! pass for the document being evaluated.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LintError {
    #[error("Malformed charm reference: '{0}'")]
    MalformedCharm(String),

    #[error("Invalid placement requirement '{policy}' on subordinate '{charm}'")]
    InvalidPlacement { charm: String, policy: String },

    #[error("Invalid topology document: {0}")]
    Document(String),

    #[error("YAML parse error: {0}")]
    Yaml(String),
}

impl From<serde_yaml::Error> for LintError {
    fn from(err: serde_yaml::Error) -> Self {
        LintError::Yaml(err.to_string())
    }
}
