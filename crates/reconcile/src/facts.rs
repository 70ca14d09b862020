//! Fact store - an immutable-per-run snapshot of environment predicates.
//!
//! Facts are gathered once by an external collaborator before reconciliation
//! begins, then consulted read-only by guard evaluation. There is no ambient
//! or global lookup: the store is passed explicitly wherever it is needed.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single observed environment value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactValue {
    /// Boolean fact (e.g., `leaf_only_unsupported = true`)
    Bool(bool),
    /// Integer fact (e.g., `distribution_major_version = 41`)
    Int(i64),
    /// String fact (e.g., `distribution = "Fedora"`)
    Str(String),
}

impl FactValue {
    /// Coerce to an integer for numeric comparisons.
    ///
    /// String facts parse if they hold a plain integer. Booleans never
    /// coerce. `None` makes the enclosing comparison evaluate false.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            Self::Str(s) => s.trim().parse().ok(),
            Self::Bool(_) => None,
        }
    }

    /// Canonical string form used for membership and equality tests.
    pub fn canonical(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Int(i) => i.to_string(),
            Self::Str(s) => s.clone(),
        }
    }

    /// Truthiness: `false`, `0`, and the empty string are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Bool(b) => *b,
            Self::Int(i) => *i != 0,
            Self::Str(s) => !s.is_empty(),
        }
    }
}

impl From<&str> for FactValue {
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<String> for FactValue {
    fn from(s: String) -> Self {
        Self::Str(s)
    }
}

impl From<i64> for FactValue {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for FactValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Read-only key/value snapshot consulted by guard evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactStore {
    facts: BTreeMap<String, FactValue>,
}

impl FactStore {
    /// Create an empty store. Running the engine against it is a caller
    /// error; populate it first.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a fact, replacing any previous value for the name.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<FactValue>) {
        self.facts.insert(name.into(), value.into());
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<FactValue>) -> Self {
        self.set(name, value);
        self
    }

    /// Look up a fact by name. No side effects.
    pub fn get(&self, name: &str) -> Option<&FactValue> {
        self.facts.get(name)
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Iterate facts in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &FactValue)> {
        self.facts.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, FactValue)> for FactStore {
    fn from_iter<I: IntoIterator<Item = (String, FactValue)>>(iter: I) -> Self {
        Self {
            facts: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing() {
        let store = FactStore::new().with("distribution", "Fedora");
        assert_eq!(
            store.get("distribution"),
            Some(&FactValue::Str("Fedora".into()))
        );
        assert_eq!(store.get("nonexistent"), None);
    }

    #[test]
    fn test_int_coercion() {
        assert_eq!(FactValue::Int(41).as_int(), Some(41));
        assert_eq!(FactValue::Str("41".into()).as_int(), Some(41));
        assert_eq!(FactValue::Str(" 8 ".into()).as_int(), Some(8));
        assert_eq!(FactValue::Str("rawhide".into()).as_int(), None);
        assert_eq!(FactValue::Bool(true).as_int(), None);
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(FactValue::Str("Fedora".into()).canonical(), "Fedora");
        assert_eq!(FactValue::Int(9).canonical(), "9");
        assert_eq!(FactValue::Bool(false).canonical(), "false");
    }

    #[test]
    fn test_truthiness() {
        assert!(FactValue::Bool(true).is_truthy());
        assert!(!FactValue::Int(0).is_truthy());
        assert!(!FactValue::Str(String::new()).is_truthy());
        assert!(FactValue::Str("x".into()).is_truthy());
    }
}
