//! Ordered solver option registry.

use crate::interface::SnoptInterface;
use crate::workspace::Workspace;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Longest key the solver accepts.
pub const MAX_KEY_LENGTH: usize = 55;

/// A typed option value, routed to the matching setter.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum OptionValue {
    /// String option
    String(String),
    /// Integer option
    Int(i64),
    /// Real option
    Real(f64),
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for OptionValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<f64> for OptionValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{i}"),
            Self::Real(r) => write!(f, "{r}"),
        }
    }
}

/// Why an option was not handed to the solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptionRejection {
    /// Key longer than [`MAX_KEY_LENGTH`]
    TooLong,
    /// Key contains non-ASCII characters
    NonAsciiKey,
    /// String value contains non-ASCII characters
    NonAsciiValue,
}

/// Checks a key against the solver's limits.
pub fn check_key(key: &str) -> Option<OptionRejection> {
    if !key.is_ascii() {
        Some(OptionRejection::NonAsciiKey)
    } else if key.len() > MAX_KEY_LENGTH {
        Some(OptionRejection::TooLong)
    } else {
        None
    }
}

/// Checks a key and, for string options, its value.
pub fn check_option(key: &str, value: &OptionValue) -> Option<OptionRejection> {
    check_key(key).or(match value {
        OptionValue::String(s) if !s.is_ascii() => Some(OptionRejection::NonAsciiValue),
        _ => None,
    })
}

/// Outcome of applying a registry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OptionSummary {
    /// Options handed to a setter
    pub applied: usize,
    /// Keys whose options were skipped before reaching the solver
    pub skipped: Vec<String>,
    /// Total error count reported by the setters
    pub errors: usize,
}

/// Key/value options, kept in insertion order.
///
/// Setting an existing key replaces its value in place, so the solver sees
/// each key once, at the position it was first registered.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct OptionRegistry {
    entries: Vec<(String, OptionValue)>,
}

impl OptionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets an option.
    pub fn set<K, V>(&mut self, key: K, value: V) -> &mut Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<K, V>(mut self, key: K, value: V) -> Self
    where
        K: Into<String>,
        V: Into<OptionValue>,
    {
        self.set(key, value);
        self
    }

    /// Value of a key, if set.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes a key.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        let index = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(index).1)
    }

    /// Number of options.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Options in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Hands every option to the solver's typed setters.
    ///
    /// Rejected keys and setter errors are logged and counted; neither stops
    /// the remaining options from being applied.
    pub fn apply<S>(&self, interface: &mut S, workspace: &mut Workspace) -> OptionSummary
    where
        S: SnoptInterface + ?Sized,
    {
        let mut summary = OptionSummary::default();
        for (key, value) in self.iter() {
            if let Some(rejection) = check_option(key, value) {
                tracing::warn!(
                    component = "options",
                    operation = "apply",
                    status = "skipped",
                    key,
                    reason = ?rejection,
                    "Option rejected"
                );
                summary.skipped.push(key.to_string());
                continue;
            }

            let errors = match value {
                OptionValue::String(s) => interface.set_option_string(key, s, workspace),
                OptionValue::Int(i) => interface.set_option_int(key, *i, workspace),
                OptionValue::Real(r) => interface.set_option_real(key, *r, workspace),
            };
            summary.applied += 1;
            if errors > 0 {
                tracing::warn!(
                    component = "options",
                    operation = "apply",
                    status = "error",
                    key,
                    value = %value,
                    errors,
                    "Solver reported errors setting option"
                );
                summary.errors += errors;
            } else {
                tracing::trace!(component = "options", operation = "apply", key, value = %value);
            }
        }
        summary
    }
}
