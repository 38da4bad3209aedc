// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod az_balance;
pub mod charm_inventory;
pub mod config_assertion;
pub mod linter;
pub mod placement;
pub mod relation_rules;
pub mod space_check;
pub mod status_check;

// Re-export the rule engines for convenience
pub use az_balance::{check_azs, AzFindings};
pub use charm_inventory::CharmChecker;
pub use config_assertion::{atoi, ConfigAssertionEngine, Quantity};
pub use linter::{LintReport, LintSettings, Linter};
pub use placement::{PlacementEngine, PlacementFindings};
pub use relation_rules::{RelationFindings, RelationRuleEngine};
pub use space_check::SpaceChecker;
pub use status_check::StatusChecker;
