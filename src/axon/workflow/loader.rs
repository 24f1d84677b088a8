//! Workflow loader - YAML/JSON file loading and parsing
//!
//! This module handles loading workflow definitions from disk. The HTTP
//! surface receives definitions as JSON bodies instead and does not go
//! through here.

use super::types::WorkflowDefinition;
use crate::axon::error::AxonError;
use std::fs;
use std::path::Path;

/// Loads workflow definitions from YAML or JSON files
pub struct WorkflowLoader;

impl WorkflowLoader {
    pub fn new() -> Self {
        Self
    }

    /// Load a workflow definition from a file, picking the parser by
    /// extension (`.json` is JSON, everything else is treated as YAML)
    pub fn load_workflow<P: AsRef<Path>>(&self, path: P) -> Result<WorkflowDefinition, AxonError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)?;
        if path.extension().is_some_and(|ext| ext == "json") {
            Self::parse_json(&content)
        } else {
            Self::parse_yaml(&content)
        }
    }

    /// Parse a workflow definition from a YAML string
    pub fn parse_yaml(content: &str) -> Result<WorkflowDefinition, AxonError> {
        let def: WorkflowDefinition = serde_yaml::from_str(content)?;
        Ok(def)
    }

    /// Parse a workflow definition from a JSON string
    pub fn parse_json(content: &str) -> Result<WorkflowDefinition, AxonError> {
        let def: WorkflowDefinition = serde_json::from_str(content)?;
        Ok(def)
    }
}

impl Default for WorkflowLoader {
    fn default() -> Self {
        Self::new()
    }
}
