// SPDX-License-Identifier: MIT

//! Control-flow node handlers: condition, ab_test, wait, wait_input,
//! buttons

use rand::Rng;
use serde_json::Value;

use super::config::{
    parse_lenient, AbTestConfig, AbVariant, ButtonsConfig, ConditionConfig, TimeoutAction,
    WaitConfig, WaitInputConfig,
};
use super::{EntryMode, Outcome};
use crate::axon::capability::{CapabilityKind, CapabilityRegistry};
use crate::axon::workflow::clock::Clock;
use crate::axon::workflow::condition::{evaluate, CompareOp};
use crate::axon::workflow::context::ExecutionContext;
use crate::axon::workflow::graph::ValidatedGraph;
use crate::axon::workflow::types::Node;

fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// `condition`: evaluate `field operator value` and branch yes/no
pub fn condition(node: &Node, rendered: &Value, context: &ExecutionContext) -> Outcome {
    let config: ConditionConfig = parse_lenient(&node.id, rendered);
    let op = CompareOp::parse(&config.operator);
    let actual = context.get_path(&config.field);
    let expected = value_as_text(&config.value);

    let matched = evaluate(actual, op, &expected);
    log::debug!(
        "Condition {}: {} {} {:?} -> {}",
        node.id,
        config.field,
        op,
        expected,
        matched
    );
    Outcome::branch(if matched { "yes" } else { "no" })
}

/// Pick a variant for a roll in `[0, total_weight)`. Weights are
/// normalized implicitly: only relative size matters, and non-positive
/// weights drop out.
pub fn pick_variant(variants: &[AbVariant], roll: f64) -> Option<&str> {
    let mut cumulative = 0.0;
    let mut last = None;
    for variant in variants {
        let weight = variant.percent.max(0.0);
        if weight <= 0.0 {
            continue;
        }
        cumulative += weight;
        last = Some(variant.id.as_str());
        if roll < cumulative {
            return last;
        }
    }
    // Rounding at the top of the range falls into the last live variant
    last
}

fn total_weight(variants: &[AbVariant]) -> f64 {
    variants.iter().map(|v| v.percent.max(0.0)).sum()
}

/// `ab_test`: weighted pseudo-random split across variant exits
pub fn ab_test(node: &Node, rendered: &Value) -> Outcome {
    let config: AbTestConfig = parse_lenient(&node.id, rendered);
    let total = total_weight(&config.variants);
    if total <= 0.0 {
        log::warn!("A/B node '{}' has no positive weights, using default edge", node.id);
        return Outcome::next();
    }

    let roll = rand::thread_rng().gen_range(0.0..total);
    match pick_variant(&config.variants, roll) {
        Some(variant) => Outcome::branch(variant.to_string()),
        None => Outcome::next(),
    }
}

/// `wait`: suspend for a fixed duration; on resume the pause has elapsed
pub fn wait(node: &Node, rendered: &Value, clock: &dyn Clock, entry: EntryMode) -> Outcome {
    if entry == EntryMode::Resume {
        return Outcome::next();
    }
    let config: WaitConfig = parse_lenient(&node.id, rendered);
    Outcome::Suspend {
        resume_at: clock.now() + config.as_duration(),
    }
}

/// `wait_input`: suspend until a reply is delivered or the timeout
/// elapses.
///
/// On resume the captured variable decides the path: present means a
/// reply arrived in time; absent means timeout, which follows the
/// `timeout` handle when one is connected (unless configured to fall
/// through), else the default edge with an empty capture.
pub fn wait_input(
    node: &Node,
    rendered: &Value,
    graph: &ValidatedGraph,
    context: &mut ExecutionContext,
    clock: &dyn Clock,
    entry: EntryMode,
) -> Outcome {
    let config: WaitInputConfig = parse_lenient(&node.id, rendered);

    if entry == EntryMode::Fresh {
        return Outcome::Suspend {
            resume_at: clock.now() + chrono::Duration::minutes(config.timeout_minutes.max(0)),
        };
    }

    if context.contains(&config.output) {
        return Outcome::next();
    }

    // Timeout elapsed with no matching reply
    if config.timeout_action == TimeoutAction::Timeout && graph.has_handle(&node.id, "timeout") {
        return Outcome::branch("timeout");
    }
    context.set(config.output, Value::String(String::new()));
    Outcome::next()
}

/// `buttons`: send an interactive choice, then wait for the pick.
///
/// The captured reply selects the matching button-id exit; anything else,
/// including timeout, takes the `continue` fallback exit.
pub async fn buttons(
    node: &Node,
    rendered: &Value,
    context: &mut ExecutionContext,
    capabilities: &CapabilityRegistry,
    clock: &dyn Clock,
    entry: EntryMode,
) -> Outcome {
    let config: ButtonsConfig = parse_lenient(&node.id, rendered);

    if entry == EntryMode::Fresh {
        if let Err(e) = capabilities
            .invoke(CapabilityKind::Message, rendered, &context.to_json())
            .await
        {
            return Outcome::Fail(e.to_string());
        }
        return Outcome::Suspend {
            resume_at: clock.now() + chrono::Duration::minutes(config.timeout_minutes.max(0)),
        };
    }

    let captured = context.get(&config.output).map(value_as_text);
    if let Some(reply) = captured {
        for button in &config.buttons {
            if button.id == reply || (!button.title.is_empty() && button.title == reply) {
                return Outcome::branch(button.id.clone());
            }
        }
    }
    Outcome::branch("continue")
}
