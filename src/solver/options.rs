//! Backend options.
//!
//! Options are passed as a name -> value map; each backend decides which
//! names it recognizes. The map is serde-serializable so callers can keep
//! solver configuration in JSON.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Value of a single solver option.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    /// Boolean flag.
    Bool(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Float(f64),
    /// String value.
    Str(String),
}

impl OptionValue {
    /// Get as a boolean.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            OptionValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as an integer.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            OptionValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as a float. Integers are widened.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            OptionValue::Float(v) => Some(*v),
            OptionValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Get as a string slice.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            OptionValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Name of the held type, for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            OptionValue::Bool(_) => "bool",
            OptionValue::Int(_) => "int",
            OptionValue::Float(_) => "float",
            OptionValue::Str(_) => "string",
        }
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Int(i) => write!(f, "{}", i),
            OptionValue::Float(v) => write!(f, "{}", v),
            OptionValue::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<bool> for OptionValue {
    fn from(v: bool) -> Self {
        OptionValue::Bool(v)
    }
}

impl From<i64> for OptionValue {
    fn from(v: i64) -> Self {
        OptionValue::Int(v)
    }
}

impl From<i32> for OptionValue {
    fn from(v: i32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<u32> for OptionValue {
    fn from(v: u32) -> Self {
        OptionValue::Int(v as i64)
    }
}

impl From<f64> for OptionValue {
    fn from(v: f64) -> Self {
        OptionValue::Float(v)
    }
}

impl From<&str> for OptionValue {
    fn from(v: &str) -> Self {
        OptionValue::Str(v.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(v: String) -> Self {
        OptionValue::Str(v)
    }
}

/// Backend options keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SolverOptions(BTreeMap<String, OptionValue>);

impl SolverOptions {
    /// No options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.insert(name, value);
        self
    }

    /// Set an option, returning the previous value.
    pub fn insert(
        &mut self,
        name: impl Into<String>,
        value: impl Into<OptionValue>,
    ) -> Option<OptionValue> {
        self.0.insert(name.into(), value.into())
    }

    /// Look up an option.
    pub fn get(&self, name: &str) -> Option<&OptionValue> {
        self.0.get(name)
    }

    /// Iterate over options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of options set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if no options are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for SolverOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        iter.into_iter()
            .fold(Self::new(), |opts, (k, v)| opts.with(k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_and_accessors() {
        let opts = SolverOptions::new()
            .with("max_iter", 50)
            .with("tol_feas", 1e-6)
            .with("presolve_enable", false);
        assert_eq!(opts.len(), 3);
        assert_eq!(opts.get("max_iter").and_then(OptionValue::as_int), Some(50));
        assert_eq!(opts.get("max_iter").and_then(OptionValue::as_float), Some(50.0));
        assert_eq!(
            opts.get("presolve_enable").and_then(OptionValue::as_bool),
            Some(false)
        );
        assert!(opts.get("tol_feas").and_then(OptionValue::as_int).is_none());
    }

    #[test]
    fn test_json_roundtrip_types() {
        let opts: SolverOptions =
            serde_json::from_str(r#"{"max_iter": 20, "time_limit": 1.5, "verbose": true, "method": "ipm"}"#)
                .unwrap();
        assert_eq!(opts.get("max_iter"), Some(&OptionValue::Int(20)));
        assert_eq!(opts.get("time_limit"), Some(&OptionValue::Float(1.5)));
        assert_eq!(opts.get("verbose"), Some(&OptionValue::Bool(true)));
        assert_eq!(opts.get("method").and_then(OptionValue::as_str), Some("ipm"));

        let json = serde_json::to_string(&opts).unwrap();
        let back: SolverOptions = serde_json::from_str(&json).unwrap();
        assert_eq!(back, opts);
    }

    #[test]
    fn test_from_iter() {
        let opts: SolverOptions = [("a", 1), ("b", 2)].into_iter().collect();
        assert_eq!(opts.iter().map(|(k, _)| k).collect::<Vec<_>>(), vec!["a", "b"]);
    }
}
