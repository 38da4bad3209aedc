// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Diagnostics Sink
//!
//! Every component of a lint pass receives the pass's `Diagnostics` sink
//! instead of reaching for a process-wide logger. The sink forwards each
//! message to `tracing` with the `[cloud] [controller/model]` header and
//! keeps the warnings so callers (and tests) can inspect them afterwards.
//!
//! Warnings are recoverable data-quality issues: missing bindings, machines
//! without an AZ tag, unresolved endpoints. They never change the verdict.

use serde::Serialize;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    header: String,
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new(cloud: &str, controller: &str, model: &str) -> Self {
        Self {
            header: format!("[{}] [{}/{}]", cloud, controller, model),
            entries: Vec::new(),
        }
    }

    pub fn header(&self) -> &str {
        &self.header
    }

    /// Trace-level chatter, not retained.
    pub fn debug(&self, message: impl AsRef<str>) {
        debug!("{} {}", self.header, message.as_ref());
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!("{} {}", self.header, message);
        self.push(DiagnosticLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{} {}", self.header, message);
        self.push(DiagnosticLevel::Warning, message);
    }

    /// Logs a violation message; the violation itself lives in the report.
    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        error!("{} {}", self.header, message);
        self.push(DiagnosticLevel::Error, message);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn warnings(&self) -> impl Iterator<Item = &str> {
        self.entries
            .iter()
            .filter(|d| d.level == DiagnosticLevel::Warning)
            .map(|d| d.message.as_str())
    }

    pub fn has_warning(&self, needle: &str) -> bool {
        self.warnings().any(|w| w.contains(needle))
    }

    fn push(&mut self, level: DiagnosticLevel, message: String) {
        self.entries.push(Diagnostic { level, message });
    }
}
