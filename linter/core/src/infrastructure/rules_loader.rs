// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Rules File Loader
//!
//! Reads a lint rules file from disk and turns it into [`LintRules`].
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** File discovery, `!include` splicing, overrides
//!
//! # Processing Order
//!
//! 1. Top-level `!include <relative path>` lines are replaced by the content
//!    of the named file (relative to the rules file, no recursion).
//! 2. Subordinate overrides (`name:where#name2:where2`) replace the matching
//!    `subordinates` entries.
//! 3. Every top-level list is flattened, so YAML anchors can be used to
//!    template lists of lists.
//! 4. The result is deserialized and every placement policy validated.

use serde_yaml::{Mapping, Value};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::error::LintError;
use crate::domain::rules::LintRules;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error("Rules file {0} does not exist")]
    NotFound(PathBuf),

    #[error("No rules file found (set --config or {})", RulesLoader::ENV_VAR)]
    NotDiscovered,

    #[error("Failed to read rules file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rules: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid subordinate override '{0}', expected '<name>:<where>'")]
    InvalidOverride(String),

    #[error(transparent)]
    Invalid(#[from] LintError),
}

#[derive(Debug, Clone)]
pub struct RulesLoader {
    path: PathBuf,
    overrides: Option<String>,
}

impl RulesLoader {
    pub const ENV_VAR: &'static str = "JUJU_LINT_RULES";
    pub const FILE_NAME: &'static str = "lint-rules.yaml";

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            overrides: None,
        }
    }

    pub fn with_overrides(mut self, overrides: Option<String>) -> Self {
        self.overrides = overrides.filter(|o| !o.is_empty());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Discover a rules file using precedence order
    /// 1. JUJU_LINT_RULES environment variable
    /// 2. ./lint-rules.yaml (working directory)
    /// 3. ~/.config/juju-lint/lint-rules.yaml (user config dir)
    /// 4. /etc/juju-lint/lint-rules.yaml (system)
    pub fn discover() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(Self::ENV_VAR) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from(".").join(Self::FILE_NAME);
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_rules = config_dir.join("juju-lint").join(Self::FILE_NAME);
            if user_rules.exists() {
                return Some(user_rules);
            }
        }

        let system_rules = PathBuf::from("/etc/juju-lint").join(Self::FILE_NAME);
        if system_rules.exists() {
            return Some(system_rules);
        }

        None
    }

    /// An explicit path wins over discovery and must exist.
    pub fn resolve(cli_path: Option<PathBuf>) -> Result<PathBuf, RulesError> {
        match cli_path {
            Some(path) if path.is_file() => Ok(path),
            Some(path) => Err(RulesError::NotFound(path)),
            None => Self::discover().ok_or(RulesError::NotDiscovered),
        }
    }

    pub fn load(&self) -> Result<LintRules, RulesError> {
        if !self.path.is_file() {
            return Err(RulesError::NotFound(self.path.clone()));
        }
        let raw = read(&self.path)?;
        let base_dir = self.path.parent().unwrap_or_else(|| Path::new("."));
        let mut value = process_includes(&raw, base_dir)?;

        if let Some(overrides) = &self.overrides {
            apply_overrides(&mut value, overrides)?;
        }
        flatten_top_level(&mut value);

        let rules = LintRules::from_value(value)?;
        rules.validate()?;
        debug!("Lint rules loaded from {:?}: {:?}", self.path, rules);
        Ok(rules)
    }
}

fn read(path: &Path) -> Result<String, RulesError> {
    std::fs::read_to_string(path).map_err(|source| RulesError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Splice top-level `!include` lines and parse the result.
pub fn process_includes(text: &str, base_dir: &Path) -> Result<Value, RulesError> {
    let mut collected = Vec::new();
    for line in text.lines() {
        if !line.starts_with("!include") {
            collected.push(line.to_string());
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let [_, relative] = parts.as_slice() else {
            warn!("invalid include in rules, ignored: '{}'", line);
            continue;
        };
        let include = base_dir.join(relative);
        if include.is_file() {
            collected.push(read(&include)?);
        } else {
            warn!("included rules file {:?} does not exist, ignored", include);
        }
    }
    let value: Value = serde_yaml::from_str(&collected.join("\n"))?;
    Ok(match value {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    })
}

/// Apply `name:where#name2:where2` subordinate overrides.
pub fn apply_overrides(rules: &mut Value, overrides: &str) -> Result<(), RulesError> {
    let Value::Mapping(root) = rules else {
        return Err(RulesError::InvalidOverride(overrides.to_string()));
    };
    for entry in overrides.split('#') {
        let parts: Vec<&str> = entry.split(':').collect();
        let [name, place] = parts.as_slice() else {
            return Err(RulesError::InvalidOverride(entry.to_string()));
        };
        info!("Overriding {} with {}", name, place);

        let subordinates = root
            .entry(Value::from("subordinates"))
            .or_insert_with(|| Value::Mapping(Mapping::new()));
        if !subordinates.is_mapping() {
            *subordinates = Value::Mapping(Mapping::new());
        }
        if let Value::Mapping(subordinates) = subordinates {
            let mut rule = Mapping::new();
            rule.insert(Value::from("where"), Value::from(*place));
            subordinates.insert(Value::from(*name), Value::Mapping(rule));
        }
    }
    Ok(())
}

/// Flatten every top-level sequence value. Other values pass through.
pub fn flatten_top_level(rules: &mut Value) {
    if let Value::Mapping(root) = rules {
        for (_, value) in root.iter_mut() {
            if let Value::Sequence(items) = value {
                *items = flatten_list(std::mem::take(items));
            }
        }
    }
}

pub fn flatten_list(items: Vec<Value>) -> Vec<Value> {
    let mut flat = Vec::new();
    let mut stack = vec![items.into_iter()];
    while let Some(top) = stack.last_mut() {
        match top.next() {
            Some(Value::Sequence(nested)) => stack.push(nested.into_iter()),
            Some(item) => flat.push(item),
            None => {
                stack.pop();
            }
        }
    }
    flat
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn seq(values: &[&str]) -> Value {
        Value::Sequence(values.iter().map(|v| Value::from(*v)).collect())
    }

    #[test]
    fn test_flatten_list_nested() {
        let nested = vec![
            Value::from("a"),
            Value::Sequence(vec![seq(&["b", "c"]), Value::from("d")]),
            Value::Sequence(vec![]),
            Value::from("e"),
        ];
        let flat: Vec<String> = flatten_list(nested)
            .into_iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect();
        assert_eq!(flat, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_flatten_top_level_leaves_mappings() {
        let mut rules: Value = serde_yaml::from_str(
            "known charms: [[ntp, ubuntu], nrpe]\nsubordinates:\n  ntp:\n    where: all\n",
        )
        .unwrap();
        flatten_top_level(&mut rules);
        assert_eq!(rules["known charms"], seq(&["ntp", "ubuntu", "nrpe"]));
        assert_eq!(rules["subordinates"]["ntp"]["where"], Value::from("all"));
    }

    #[test]
    fn test_overrides_replace_subordinates() {
        let mut rules: Value =
            serde_yaml::from_str("subordinates:\n  ntp:\n    where: all\n").unwrap();
        apply_overrides(&mut rules, "ntp:host only#nrpe:container aware").unwrap();
        assert_eq!(rules["subordinates"]["ntp"]["where"], Value::from("host only"));
        assert_eq!(
            rules["subordinates"]["nrpe"]["where"],
            Value::from("container aware")
        );

        assert!(matches!(
            apply_overrides(&mut rules, "ntp"),
            Err(RulesError::InvalidOverride(_))
        ));
    }

    #[test]
    fn test_load_with_includes() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("charms.yaml"),
            "known charms: &charms\n  - ntp\n  - ubuntu\n",
        )
        .unwrap();
        let rules_path = dir.path().join("lint-rules.yaml");
        fs::write(
            &rules_path,
            "!include charms.yaml\n!include missing.yaml\n!include\noperations mandatory: [*charms]\nsubordinates:\n  ntp:\n    where: all\n",
        )
        .unwrap();

        let rules = RulesLoader::new(&rules_path)
            .with_overrides(Some("nrpe:host only".to_string()))
            .load()
            .unwrap();
        assert_eq!(rules.known_charms.unwrap(), vec!["ntp", "ubuntu"]);
        assert_eq!(rules.operations_mandatory, vec!["ntp", "ubuntu"]);
        assert_eq!(rules.subordinates["nrpe"].where_, "host only");
        assert_eq!(rules.subordinates["ntp"].where_, "all");
    }

    #[test]
    fn test_load_rejects_invalid_placement() {
        let dir = TempDir::new().unwrap();
        let rules_path = dir.path().join("lint-rules.yaml");
        fs::write(&rules_path, "subordinates:\n  ntp:\n    where: sometimes\n").unwrap();
        let result = RulesLoader::new(&rules_path).load();
        assert!(matches!(
            result,
            Err(RulesError::Invalid(LintError::InvalidPlacement { .. }))
        ));
    }

    #[test]
    fn test_missing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.yaml");
        assert!(matches!(
            RulesLoader::new(&path).load(),
            Err(RulesError::NotFound(_))
        ));
        assert!(matches!(
            RulesLoader::resolve(Some(path)),
            Err(RulesError::NotFound(_))
        ));
    }

    #[test]
    fn test_empty_rules_file_is_empty_rules() {
        let dir = TempDir::new().unwrap();
        let rules_path = dir.path().join("lint-rules.yaml");
        fs::write(&rules_path, "").unwrap();
        let rules = RulesLoader::new(&rules_path).load().unwrap();
        assert!(rules.subordinates.is_empty());
    }
}
