// SPDX-License-Identifier: MIT

//! Per-type node configuration records
//!
//! Node config arrives as an untyped map and is parsed into one of these
//! shapes at dispatch time. Unknown fields are ignored and missing fields
//! take the documented defaults; a malformed config degrades to defaults
//! instead of failing the whole graph.

use chrono::Duration;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Parse a node config leniently: on a shape mismatch, fall back to the
/// type's defaults with a warning.
pub fn parse_lenient<T: Default + serde::de::DeserializeOwned>(node_id: &str, config: &Value) -> T {
    match serde_json::from_value(config.clone()) {
        Ok(parsed) => parsed,
        Err(e) => {
            log::warn!("Node '{}' has malformed config ({}), using defaults", node_id, e);
            T::default()
        }
    }
}

/// `buttons` node: interactive choice message
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ButtonsConfig {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub buttons: Vec<ButtonChoice>,
    /// Context variable that receives the reply
    #[serde(default = "default_output")]
    pub output: String,
    /// How long to wait for a choice before taking the fallback exit
    #[serde(default = "default_buttons_timeout", alias = "timeoutMinutes")]
    pub timeout_minutes: i64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ButtonChoice {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

fn default_output() -> String {
    "reply".to_string()
}

fn default_buttons_timeout() -> i64 {
    24 * 60
}

/// `wait` node: fixed-duration pause
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitConfig {
    #[serde(default = "default_wait_amount")]
    pub duration: f64,
    #[serde(default)]
    pub unit: WaitUnit,
}

fn default_wait_amount() -> f64 {
    1.0
}

impl Default for WaitConfig {
    fn default() -> Self {
        Self {
            duration: default_wait_amount(),
            unit: WaitUnit::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WaitUnit {
    Seconds,
    #[default]
    Minutes,
    Hours,
    Days,
}

impl WaitConfig {
    /// The configured pause as a duration; non-positive amounts collapse
    /// to zero (resume on the next scheduler pass)
    pub fn as_duration(&self) -> Duration {
        let seconds = match self.unit {
            WaitUnit::Seconds => self.duration,
            WaitUnit::Minutes => self.duration * 60.0,
            WaitUnit::Hours => self.duration * 3600.0,
            WaitUnit::Days => self.duration * 86400.0,
        };
        Duration::seconds(seconds.max(0.0) as i64)
    }
}

/// `wait_input` node: pause until a reply arrives or the timeout elapses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WaitInputConfig {
    /// Context variable that receives the captured reply
    #[serde(default = "default_output")]
    pub output: String,
    #[serde(default = "default_input_timeout", alias = "timeout", alias = "timeoutMinutes")]
    pub timeout_minutes: i64,
    /// What to do when the timeout elapses with no reply
    #[serde(default, alias = "timeoutAction")]
    pub timeout_action: TimeoutAction,
}

fn default_input_timeout() -> i64 {
    60
}

impl Default for WaitInputConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            timeout_minutes: default_input_timeout(),
            timeout_action: TimeoutAction::default(),
        }
    }
}

/// Timeout behavior for `wait_input`
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeoutAction {
    /// Follow the `timeout` handle if one is connected, else the default
    /// edge with an empty capture
    #[default]
    Timeout,
    /// Follow the default edge as if input had arrived empty
    Continue,
}

/// `condition` node: `field operator value` against the context
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConditionConfig {
    #[serde(default)]
    pub field: String,
    #[serde(default = "default_operator")]
    pub operator: String,
    #[serde(default)]
    pub value: Value,
}

fn default_operator() -> String {
    "==".to_string()
}

/// `ab_test` node: weighted variant split
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbTestConfig {
    #[serde(default = "default_variants")]
    pub variants: Vec<AbVariant>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbVariant {
    pub id: String,
    #[serde(default)]
    pub percent: f64,
}

fn default_variants() -> Vec<AbVariant> {
    vec![
        AbVariant {
            id: "a".to_string(),
            percent: 50.0,
        },
        AbVariant {
            id: "b".to_string(),
            percent: 50.0,
        },
    ]
}

impl Default for AbTestConfig {
    fn default() -> Self {
        Self {
            variants: default_variants(),
        }
    }
}

/// `variable` node: direct context mutation
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VariableConfig {
    #[serde(default)]
    pub operation: VariableOp,
    /// Context variable to write
    #[serde(default)]
    pub key: String,
    /// Value for `set`
    #[serde(default)]
    pub value: Value,
    /// Operands and operator for `math`
    #[serde(default)]
    pub left: Value,
    #[serde(default)]
    pub right: Value,
    #[serde(default)]
    pub operator: MathOp,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VariableOp {
    #[default]
    Set,
    Math,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MathOp {
    #[default]
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// Output-variable field shared by capability-backed nodes
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub output: Option<String>,
}
