// SPDX-License-Identifier: MIT

//! Typed error handling for axon-rs
//!
//! This module provides the top-level error hierarchy using thiserror.
//! Domain-specific errors (`ValidationError`, `CapabilityError`) live next
//! to the types they describe and convert into `AxonError` at the engine
//! boundary.

use thiserror::Error;

use crate::axon::capability::CapabilityError;
use crate::axon::workflow::graph::ValidationError;

/// Top-level error type for axon-rs
#[derive(Debug, Error)]
pub enum AxonError {
    /// Malformed workflow graph, detected before any execution
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// External capability invocation failure
    #[error("Capability error: {0}")]
    Capability(#[from] CapabilityError),

    /// Workflow definition not found in the store
    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    /// Execution record not found in the store
    #[error("Execution '{0}' not found")]
    ExecutionNotFound(String),

    /// Queue item not found in the store
    #[error("Queue item '{0}' not found")]
    QueueItemNotFound(String),

    /// The store rejected an operation (claim conflicts, duplicate
    /// pending resumptions)
    #[error("Store error: {0}")]
    Store(String),

    /// I/O errors
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    /// Generic error wrapper
    #[error("{0}")]
    Other(String),
}

impl AxonError {
    /// Create a store error
    pub fn store(message: impl Into<String>) -> Self {
        Self::Store(message.into())
    }

    /// Create from a generic error
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other(message.into())
    }
}

impl From<&str> for AxonError {
    fn from(s: &str) -> Self {
        Self::Other(s.to_string())
    }
}

impl From<String> for AxonError {
    fn from(s: String) -> Self {
        Self::Other(s)
    }
}
