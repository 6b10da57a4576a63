//! Named variables exposed to runners and actions.
//!
//! Variables are snapshotted into each task's [`RunContext`](crate::RunContext)
//! when it starts; later edits do not reach tasks already running.

use std::collections::BTreeMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::fabric::best_effort::with_table;

/// A named value a runner may substitute into actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(default)]
    pub description: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Keys are non-blank and use only ASCII alphanumerics, `_` and `-`.
pub(crate) fn validate_key(key: &str) -> Result<(), EngineError> {
    if key.trim().is_empty() {
        return Err(EngineError::invalid_input("variable key must not be blank"));
    }
    if let Some(bad) = key.chars().find(|c| !(c.is_ascii_alphanumeric() || *c == '_' || *c == '-')) {
        return Err(EngineError::invalid_input(format!(
            "variable key `{key}` contains invalid character {bad:?}"
        )));
    }
    Ok(())
}

/// Keyed variable table; iteration is in key order.
#[derive(Default)]
pub(crate) struct Variables {
    table: Mutex<BTreeMap<String, Variable>>,
}

impl Variables {
    /// Inserts or replaces a variable.
    pub(crate) fn add(&self, var: Variable) -> Result<(), EngineError> {
        validate_key(&var.key)?;
        let key = var.key.clone();
        with_table(&self.table, "variables", |t| t.insert(var.key.clone(), var))
            .map(|_| ())
            .ok_or_else(|| EngineError::invalid_input(format!("variable `{key}` could not be stored")))
    }

    pub(crate) fn get(&self, key: &str) -> Option<Variable> {
        with_table(&self.table, "variables", |t| t.get(key).cloned()).flatten()
    }

    pub(crate) fn remove(&self, key: &str) -> bool {
        with_table(&self.table, "variables", |t| t.remove(key).is_some()).unwrap_or(false)
    }

    pub(crate) fn snapshot(&self) -> Vec<Variable> {
        with_table(&self.table, "variables", |t| t.values().cloned().collect()).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_keys() {
        assert!(validate_key("user_name-2").is_ok());
        assert!(validate_key("   ").is_err());
        assert!(validate_key("has space").is_err());
        assert!(validate_key("dollar$").is_err());
    }

    #[test]
    fn add_replaces_and_snapshot_is_sorted() {
        let vars = Variables::default();
        vars.add(Variable::new("b", "1")).unwrap();
        vars.add(Variable::new("a", "2")).unwrap();
        vars.add(Variable::new("b", "3").with_description("updated")).unwrap();

        let snap = vars.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[0].key, "a");
        assert_eq!(snap[1].value, "3");
        assert_eq!(vars.get("b").map(|v| v.description), Some("updated".into()));

        assert!(vars.remove("a"));
        assert!(!vars.remove("a"));
        assert_eq!(vars.get("a"), None);
    }
}
