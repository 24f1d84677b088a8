// SPDX-License-Identifier: MIT

//! Action node handlers: capability invocations and context mutation

use serde_json::{json, Value};

use super::config::{parse_lenient, MathOp, OutputConfig, VariableConfig, VariableOp};
use super::Outcome;
use crate::axon::capability::{CapabilityKind, CapabilityRegistry};
use crate::axon::workflow::context::ExecutionContext;
use crate::axon::workflow::types::Node;

/// Capability-backed nodes (`action`, `crm`, `email`, `sms`, `http`,
/// `billing`, `notification`, `ai_agent`): invoke the bound capability
/// with the rendered config and store the result under the optional
/// output variable.
pub async fn invoke_capability(
    node: &Node,
    rendered: &Value,
    context: &mut ExecutionContext,
    capabilities: &CapabilityRegistry,
) -> Outcome {
    let Some(kind) = CapabilityKind::for_node(node.kind) else {
        return Outcome::Fail(format!("node type '{}' has no capability", node.kind));
    };

    match capabilities.invoke(kind, rendered, &context.to_json()).await {
        Ok(result) => {
            let config: OutputConfig = parse_lenient(&node.id, rendered);
            if let Some(output) = config.output.filter(|name| !name.is_empty()) {
                context.set(output, result);
            }
            Outcome::next()
        }
        Err(e) => Outcome::Fail(e.to_string()),
    }
}

fn operand_as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// `variable`: mutate the context directly via `set` or two-operand
/// `math`. Bad operands degrade to a warning and no mutation; the walk
/// continues either way.
pub fn variable(node: &Node, rendered: &Value, context: &mut ExecutionContext) -> Outcome {
    let config: VariableConfig = parse_lenient(&node.id, rendered);
    if config.key.is_empty() {
        log::warn!("Variable node '{}' has no key, skipping", node.id);
        return Outcome::next();
    }

    match config.operation {
        VariableOp::Set => {
            context.set(config.key, config.value);
        }
        VariableOp::Math => {
            let (Some(left), Some(right)) = (
                operand_as_number(&config.left),
                operand_as_number(&config.right),
            ) else {
                log::warn!("Variable node '{}' has non-numeric operands, skipping", node.id);
                return Outcome::next();
            };
            let result = match config.operator {
                MathOp::Add => left + right,
                MathOp::Subtract => left - right,
                MathOp::Multiply => left * right,
                MathOp::Divide => {
                    if right == 0.0 {
                        log::warn!("Variable node '{}' divides by zero, skipping", node.id);
                        return Outcome::next();
                    }
                    left / right
                }
            };
            context.set(config.key, json!(result));
        }
    }
    Outcome::next()
}
