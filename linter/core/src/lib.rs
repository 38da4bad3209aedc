// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Lib
//!
//! Policy evaluation engine for Juju model topologies.
//!
//! # Architecture
//!
//! - **Domain:** charms, machines, rules, violations, the `TopologyView` contract
//! - **Infrastructure:** YAML documents, rules files, status/bundle views
//! - **Application:** the rule engines and the `Linter` orchestrator

pub mod domain;
pub mod application;
pub mod infrastructure;

pub use domain::*;
pub use application::linter::{LintReport, LintSettings, Linter};
