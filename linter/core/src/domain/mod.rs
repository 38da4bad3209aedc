// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Mod
//!
//! Provides the domain model of a linted Juju model.
//!
//! # Architecture
//!
//! - **Layer:** Domain Layer
//! - **Purpose:** Pure types shared by every rule engine

pub mod charm;
pub mod cloud;
pub mod diagnostics;
pub mod error;
pub mod machine;
pub mod relation;
pub mod rules;
pub mod topology;
pub mod violation;

pub use charm::extract_charm_name;
pub use cloud::CloudType;
pub use diagnostics::{Diagnostic, DiagnosticLevel, Diagnostics};
pub use error::LintError;
pub use rules::LintRules;
pub use topology::{EndpointsField, TopologyIndex, TopologyView, UnitPlacement};
pub use violation::{Violation, ViolationKind};
