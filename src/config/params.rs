//! Flat key → value hyperparameter map
//!
//! Collaborators hand the engine string-valued parameters (from a CLI, a JSON
//! file or an operator UI). Typed accessors turn them into numbers and report
//! the offending key on failure.

use crate::core::{ConfigurationError, KernelError, Result};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterMap {
    values: BTreeMap<String, String>,
}

impl ParameterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_pairs<K, V, I>(pairs: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self {
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Parse `key=value` assignments such as those given on the command line
    pub fn from_assignments<S: AsRef<str>>(assignments: &[S]) -> Result<Self> {
        let mut params = Self::new();
        for assignment in assignments {
            let assignment = assignment.as_ref();
            let (key, value) = assignment.split_once('=').ok_or_else(|| {
                KernelError::ParseError(format!(
                    "Expected key=value parameter assignment, got: {assignment}"
                ))
            })?;
            params.set(key.trim(), value.trim());
        }
        Ok(params)
    }

    /// Parse a flat JSON object; numbers and booleans are kept in their textual form
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value =
            serde_json::from_str(json).map_err(|e| KernelError::SerializationError(e.to_string()))?;
        let object = value.as_object().ok_or_else(|| {
            KernelError::ParseError("Parameter file must contain a JSON object".to_string())
        })?;

        let mut params = Self::new();
        for (key, value) in object {
            let text = match value {
                Value::String(s) => s.clone(),
                Value::Number(n) => n.to_string(),
                Value::Bool(b) => b.to_string(),
                other => {
                    return Err(KernelError::ParseError(format!(
                        "Parameter '{key}' must be a scalar, got: {other}"
                    )))
                }
            };
            params.set(key, text);
        }
        Ok(params)
    }

    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.values.insert(key.into(), value.into());
        self
    }

    /// Overlay `other` on top of `self`
    pub fn merge(&mut self, other: &ParameterMap) {
        for (k, v) in &other.values {
            self.values.insert(k.clone(), v.clone());
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn str_or<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    pub fn require_f64(&self, key: &str) -> std::result::Result<f64, ConfigurationError> {
        let raw = self
            .get(key)
            .ok_or_else(|| ConfigurationError::missing(key))?;
        parse_number(key, raw)
    }

    pub fn require_u32(&self, key: &str) -> std::result::Result<u32, ConfigurationError> {
        let raw = self
            .get(key)
            .ok_or_else(|| ConfigurationError::missing(key))?;
        parse_integer(key, raw)
    }

    pub fn f64_or(&self, key: &str, default: f64) -> std::result::Result<f64, ConfigurationError> {
        match self.get(key) {
            Some(raw) => parse_number(key, raw),
            None => Ok(default),
        }
    }

    pub fn usize_or(
        &self,
        key: &str,
        default: usize,
    ) -> std::result::Result<usize, ConfigurationError> {
        match self.get(key) {
            Some(raw) => parse_integer(key, raw),
            None => Ok(default),
        }
    }

    pub fn optional_usize(&self, key: &str) -> std::result::Result<Option<usize>, ConfigurationError> {
        self.get(key).map(|raw| parse_integer(key, raw)).transpose()
    }

    pub fn optional_u64(&self, key: &str) -> std::result::Result<Option<u64>, ConfigurationError> {
        self.get(key).map(|raw| parse_integer(key, raw)).transpose()
    }

    pub fn optional_f64(&self, key: &str) -> std::result::Result<Option<f64>, ConfigurationError> {
        self.get(key).map(|raw| parse_number(key, raw)).transpose()
    }

    pub fn bool_or(&self, key: &str, default: bool) -> std::result::Result<bool, ConfigurationError> {
        match self.get(key).map(|s| s.trim().to_ascii_lowercase()) {
            None => Ok(default),
            Some(s) => match s.as_str() {
                "true" | "yes" | "1" | "on" => Ok(true),
                "false" | "no" | "0" | "off" => Ok(false),
                _ => Err(ConfigurationError::invalid(key, s, "expected a boolean")),
            },
        }
    }

    /// Pick one of a fixed set of textual choices
    pub fn choice_or<'a>(
        &self,
        key: &str,
        choices: &[&'a str],
        default: &'a str,
    ) -> std::result::Result<&'a str, ConfigurationError> {
        let Some(raw) = self.get(key) else {
            return Ok(default);
        };
        let wanted = raw.trim().to_ascii_lowercase();
        choices
            .iter()
            .copied()
            .find(|c| *c == wanted)
            .ok_or_else(|| ConfigurationError::UnknownValue {
                name: key.to_string(),
                value: raw.to_string(),
                expected: choices.join(", "),
            })
    }
}

fn parse_number(key: &str, raw: &str) -> std::result::Result<f64, ConfigurationError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|_| ConfigurationError::invalid(key, raw, "expected a number"))
}

fn parse_integer<T: FromStr>(key: &str, raw: &str) -> std::result::Result<T, ConfigurationError> {
    raw.trim()
        .parse::<T>()
        .map_err(|_| ConfigurationError::invalid(key, raw, "expected a non-negative integer"))
}
