// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

pub mod bundle_view;
pub mod document;
pub mod rules_loader;
pub mod status_view;

pub use bundle_view::BundleView;
pub use document::{select_main_document, DocumentError, TopologyDocument};
pub use rules_loader::{RulesError, RulesLoader};
pub use status_view::StatusView;

use crate::domain::diagnostics::Diagnostics;
use crate::domain::error::LintError;
use crate::domain::topology::TopologyView;

/// Build the view matching the document's shape.
pub fn load_topology(
    document: &TopologyDocument,
    diagnostics: &mut Diagnostics,
) -> Result<Box<dyn TopologyView>, LintError> {
    if document.is_bundle() {
        diagnostics.debug("Relations data found; loading document as a bundle.");
        Ok(Box::new(BundleView::new(document, diagnostics)?))
    } else {
        diagnostics.debug("No relations data; loading document as a status.");
        Ok(Box::new(StatusView::new(document, diagnostics)?))
    }
}
