// SPDX-License-Identifier: MIT

//! External capabilities invoked by action-type nodes
//!
//! The engine's boundary to the outside world is one uniform contract:
//! invoke capability X with rendered config Y, get a result or an error.
//! Channel adapters, CRM clients, billing, AI completion - all of them
//! bind here through the registry. The engine never retries a capability;
//! retry, if desired, is the capability's own concern.

mod console;
mod http;
mod registry;

pub use console::ConsoleChannel;
pub use http::HttpCapability;
pub use registry::CapabilityRegistry;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::axon::workflow::types::NodeKind;

/// Closed set of capability kinds an action node can invoke
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CapabilityKind {
    /// Generic channel message send (the `action` and `buttons` nodes)
    Message,
    Email,
    Sms,
    Http,
    Crm,
    Billing,
    Notification,
    AiAgent,
}

impl CapabilityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityKind::Message => "message",
            CapabilityKind::Email => "email",
            CapabilityKind::Sms => "sms",
            CapabilityKind::Http => "http",
            CapabilityKind::Crm => "crm",
            CapabilityKind::Billing => "billing",
            CapabilityKind::Notification => "notification",
            CapabilityKind::AiAgent => "ai_agent",
        }
    }

    /// The capability a node type delegates to, if any
    pub fn for_node(kind: NodeKind) -> Option<Self> {
        match kind {
            NodeKind::Action | NodeKind::Buttons => Some(CapabilityKind::Message),
            NodeKind::Email => Some(CapabilityKind::Email),
            NodeKind::Sms => Some(CapabilityKind::Sms),
            NodeKind::Http => Some(CapabilityKind::Http),
            NodeKind::Crm => Some(CapabilityKind::Crm),
            NodeKind::Billing => Some(CapabilityKind::Billing),
            NodeKind::Notification => Some(CapabilityKind::Notification),
            NodeKind::AiAgent => Some(CapabilityKind::AiAgent),
            _ => None,
        }
    }
}

impl std::fmt::Display for CapabilityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// External action failure, surfaced as a node `Fail` outcome
#[derive(Debug, Error)]
pub enum CapabilityError {
    /// No implementation bound for this kind
    #[error("No capability registered for '{0}'")]
    NotRegistered(CapabilityKind),

    /// The capability itself failed (send error, HTTP 5xx, AI error)
    #[error("Capability '{kind}' failed: {message}")]
    Invocation {
        kind: CapabilityKind,
        message: String,
    },
}

impl CapabilityError {
    pub fn invocation(kind: CapabilityKind, message: impl Into<String>) -> Self {
        Self::Invocation {
            kind,
            message: message.into(),
        }
    }
}

/// Trait for externally-bound capabilities.
///
/// `config` is the node's config with all templates already rendered;
/// `context` is a read-only snapshot of the execution variables.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The kind this implementation serves
    fn kind(&self) -> CapabilityKind;

    /// Invoke the capability and return its result payload
    async fn invoke(&self, config: &Value, context: &Value) -> Result<Value, CapabilityError>;
}
