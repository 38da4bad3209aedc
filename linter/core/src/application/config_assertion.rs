// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Config Assertion Engine
//!
//! Evaluates `config` (and, on OpenStack clouds, `openstack config`) rules
//! against the `options` of every application.
//!
//! # Architecture
//!
//! - **Layer:** Application Layer
//! - **Purpose:** Per-key configuration assertions
//!
//! # Operators
//!
//! | Operator | Passes when |
//! |----------|-------------|
//! | `isset` | key presence equals the expected boolean |
//! | `eq` | the expected pattern matches the start of the value, or the values are equal |
//! | `neq` | the values differ |
//! | `gte` | the value is numerically at least the expected one, after [`atoi`] |
//! | `search` | the expected pattern occurs anywhere in the value |

use regex::Regex;
use serde_yaml::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::domain::cloud::CloudType;
use crate::domain::diagnostics::Diagnostics;
use crate::domain::rules::{ConfigRule, LintRules};
use crate::domain::violation::{Violation, ViolationKind};
use crate::infrastructure::document::TopologyDocument;

// ============================================================================
// Value helpers
// ============================================================================

/// Result of [`atoi`]: a number, or the original value when it is not one.
#[derive(Debug, Clone, PartialEq)]
pub enum Quantity {
    Number(f64),
    Unchanged(Value),
}

/// Convert sizes such as `2k` or `4G` to numbers.
///
/// Lowercase suffixes are powers of 1000, uppercase ones powers of 1024.
/// Plain numeric strings parse as numbers; anything else is returned
/// unchanged.
pub fn atoi(value: &Value) -> Quantity {
    let text = match value {
        Value::Number(number) => {
            return number
                .as_f64()
                .map(Quantity::Number)
                .unwrap_or_else(|| Quantity::Unchanged(value.clone()))
        }
        Value::String(text) => text.trim(),
        _ => return Quantity::Unchanged(value.clone()),
    };

    if let Some(number) = text.parse::<f64>().ok().filter(|n| n.is_finite()) {
        return Quantity::Number(number);
    }

    let mut chars = text.chars();
    let Some(suffix) = chars.next_back() else {
        return Quantity::Unchanged(value.clone());
    };
    let Ok(magnitude) = chars.as_str().parse::<i64>() else {
        return Quantity::Unchanged(value.clone());
    };
    let quotient: f64 = if suffix.is_lowercase() { 1000.0 } else { 1024.0 };
    let exponent = match suffix.to_ascii_lowercase() {
        'k' => 1,
        'm' => 2,
        'g' => 3,
        _ => return Quantity::Unchanged(value.clone()),
    };
    Quantity::Number(magnitude as f64 * quotient.powi(exponent))
}

/// Plain string form of a scalar, used for regex matching.
fn plain(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_default(),
    }
}

/// Quoted form of a value, used in messages.
fn quoted(value: &Value) -> String {
    match value {
        Value::String(text) => format!("'{}'", text),
        other => plain(other),
    }
}

fn to_json(value: &Value) -> serde_json::Value {
    serde_json::to_value(value).unwrap_or(serde_json::Value::Null)
}

// ============================================================================
// Operators
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOperator {
    Isset,
    Eq,
    Neq,
    Gte,
    Search,
}

impl ConfigOperator {
    fn symbol(&self) -> &'static str {
        match self {
            ConfigOperator::Isset => "isset",
            ConfigOperator::Eq => "==",
            ConfigOperator::Neq => "!=",
            ConfigOperator::Gte => ">=",
            ConfigOperator::Search => "~=",
        }
    }
}

impl FromStr for ConfigOperator {
    type Err = ();

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "isset" => Ok(ConfigOperator::Isset),
            "eq" => Ok(ConfigOperator::Eq),
            "neq" => Ok(ConfigOperator::Neq),
            "gte" => Ok(ConfigOperator::Gte),
            "search" => Ok(ConfigOperator::Search),
            _ => Err(()),
        }
    }
}

impl fmt::Display for ConfigOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConfigOperator::Isset => "isset",
            ConfigOperator::Eq => "eq",
            ConfigOperator::Neq => "neq",
            ConfigOperator::Gte => "gte",
            ConfigOperator::Search => "search",
        };
        f.write_str(name)
    }
}

/// Prefix match when `expected` is a valid pattern, equality otherwise.
fn matches_expected(expected: &Value, actual: &Value) -> bool {
    match Regex::new(&format!("^(?:{})", plain(expected))) {
        Ok(pattern) => pattern.is_match(&plain(actual)),
        Err(_) => expected == actual,
    }
}

// ============================================================================
// Engine
// ============================================================================

pub struct ConfigAssertionEngine<'a> {
    rules: &'a LintRules,
    cloud_type: Option<&'a CloudType>,
}

impl<'a> ConfigAssertionEngine<'a> {
    pub fn new(rules: &'a LintRules, cloud_type: Option<&'a CloudType>) -> Self {
        Self { rules, cloud_type }
    }

    /// Rules that apply to `charm`, cloud specific ones last.
    fn rules_for(&self, charm: &str) -> Vec<(&'a String, &'a ConfigRule)> {
        let mut rules: Vec<_> = self.rules.config.get(charm).into_iter().flatten().collect();
        if self.cloud_type == Some(&CloudType::Openstack) {
            rules.extend(self.rules.openstack_config.get(charm).into_iter().flatten());
        }
        rules
    }

    pub fn evaluate(
        &self,
        document: &TopologyDocument,
        app_to_charm: &BTreeMap<String, String>,
        diagnostics: &mut Diagnostics,
    ) -> Vec<Violation> {
        let mut violations = Vec::new();
        for (app, spec) in document.applications() {
            let Some(charm) = app_to_charm.get(app) else {
                diagnostics.warn(format!("Application {} has no charm.", app));
                continue;
            };
            let rules = self.rules_for(charm);
            let Some(options) = spec.options.as_ref() else {
                continue;
            };
            for (key, rule) in rules {
                violations.extend(check_rule(app, charm, key, rule, options, diagnostics));
            }
        }
        violations
    }
}

fn check_rule(
    app: &str,
    charm: &str,
    key: &str,
    rule: &ConfigRule,
    options: &BTreeMap<String, Value>,
    diagnostics: &mut Diagnostics,
) -> Vec<Violation> {
    diagnostics.debug(format!("Checking {} for configuration {}", app, key));

    if !rule.suffixes.is_empty() {
        let targeted = app == charm
            || rule
                .suffixes
                .iter()
                .any(|suffix| app == format!("{}-{}", charm, suffix));
        if !targeted {
            diagnostics.debug(format!(
                "The app name didn't match any name target for this charm: '{}' (skipping check)",
                app
            ));
            return Vec::new();
        }
    }

    let mut violations = Vec::new();
    for (operator, expected) in &rule.checks {
        let Ok(operator) = operator.parse::<ConfigOperator>() else {
            diagnostics.warn(format!(
                "Application {} has unknown check operation for {}: {}.",
                app, key, operator
            ));
            continue;
        };
        let check = Check {
            app,
            key,
            expected,
        };
        let outcome = match operator {
            ConfigOperator::Isset => check.isset(options.get(key)),
            other => match options.get(key) {
                Some(actual) => check.compare(other, actual, diagnostics),
                None => {
                    check.warn_missing(other, diagnostics);
                    None
                }
            },
        };
        violations.extend(outcome);
    }
    violations
}

struct Check<'a> {
    app: &'a str,
    key: &'a str,
    expected: &'a Value,
}

impl Check<'_> {
    fn isset(&self, actual: Option<&Value>) -> Option<Violation> {
        let required = self.expected.as_bool().unwrap_or(true);
        match (actual, required) {
            (Some(actual), false) => Some(
                Violation::new(
                    ViolationKind::ConfigIssetFalse,
                    format!(
                        "Application {} has config for {}: {}.",
                        self.app,
                        self.key,
                        plain(actual)
                    ),
                )
                .with("application", self.app)
                .with("rule", self.key)
                .with("actual_value", to_json(actual)),
            ),
            (None, true) => Some(
                Violation::new(
                    ViolationKind::ConfigIssetTrue,
                    format!("Application {} has no config for {}.", self.app, self.key),
                )
                .with("application", self.app)
                .with("rule", self.key),
            ),
            _ => None,
        }
    }

    fn compare(
        &self,
        operator: ConfigOperator,
        actual: &Value,
        diagnostics: &mut Diagnostics,
    ) -> Option<Violation> {
        let expected = quoted(self.expected);
        let got = quoted(actual);
        let (kind, message) = match operator {
            ConfigOperator::Eq if !matches_expected(self.expected, actual) => (
                ViolationKind::ConfigEq,
                format!(
                    "Application {} has incorrect setting for '{}': Expected {}, got {}",
                    self.app, self.key, expected, got
                ),
            ),
            ConfigOperator::Neq if self.expected == actual => (
                ViolationKind::ConfigNeq,
                format!(
                    "Application {} has incorrect setting for '{}': Should not be {}",
                    self.app, self.key, expected
                ),
            ),
            ConfigOperator::Gte => match (atoi(actual), atoi(self.expected)) {
                (Quantity::Number(current), Quantity::Number(minimum)) if current < minimum => (
                    ViolationKind::ConfigGte,
                    format!(
                        "Application {} has config for '{}' which is less than {}: {}",
                        self.app, self.key, expected, got
                    ),
                ),
                (Quantity::Number(_), Quantity::Number(_)) => return None,
                _ => {
                    diagnostics.warn(format!(
                        "Application {} has non-numeric config for '{}', cannot determine if {} >= {}.",
                        self.app, self.key, got, expected
                    ));
                    return None;
                }
            },
            ConfigOperator::Search => match Regex::new(&plain(self.expected)) {
                Ok(pattern) if !pattern.is_match(&plain(actual)) => (
                    ViolationKind::ConfigSearch,
                    format!(
                        "Application {} has an invalid config for '{}': regex {} not found at {}",
                        self.app, self.key, expected, got
                    ),
                ),
                Ok(_) => return None,
                Err(err) => {
                    diagnostics.warn(format!(
                        "Application {} has an invalid regex {} for '{}': {}",
                        self.app, expected, self.key, err
                    ));
                    return None;
                }
            },
            _ => {
                diagnostics.debug(format!(
                    "Application {} has a valid config for '{}': {} ({} {})",
                    self.app,
                    self.key,
                    expected,
                    operator.symbol(),
                    got
                ));
                return None;
            }
        };
        Some(
            Violation::new(kind, message)
                .with("application", self.app)
                .with("rule", self.key)
                .with("expected_value", to_json(self.expected))
                .with("actual_value", to_json(actual)),
        )
    }

    fn warn_missing(&self, operator: ConfigOperator, diagnostics: &mut Diagnostics) {
        let expected = quoted(self.expected);
        let message = match operator {
            ConfigOperator::Search => format!(
                "Application {} has no config for '{}', can't search the regex pattern {}.",
                self.app, self.key, expected
            ),
            other => format!(
                "Application {} has no config for '{}', cannot determine if {} {}.",
                self.app,
                self.key,
                other.symbol(),
                expected
            ),
        };
        diagnostics.warn(message);
    }
}
