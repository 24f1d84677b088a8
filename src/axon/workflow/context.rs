// SPDX-License-Identifier: MIT

//! Execution context - the variable bag for one run
//!
//! A flat map from variable name to JSON value (strings, numbers, or
//! structured message payloads). Nodes that capture external input write
//! into it; `set`/`math` variable nodes mutate it; everything else only
//! reads it through templating.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The mutable variable state of one execution
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct ExecutionContext {
    values: HashMap<String, Value>,
}

impl ExecutionContext {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a context from initial trigger variables
    pub fn from_map(values: HashMap<String, Value>) -> Self {
        Self { values }
    }

    /// Get a variable value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Get a nested value using dot notation (e.g. `message.text`)
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let mut current = self.values.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current)
    }

    /// Set a variable value, overwriting any previous one
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Whether a variable is present
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Snapshot the context as a JSON object
    pub fn to_json(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// All variable names
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
