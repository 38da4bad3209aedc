// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! Command implementations for the juju-lint CLI

pub mod lint;
pub mod rules;

pub use self::lint::LintCommand;
pub use self::rules::RulesCommand;
