// SPDX-License-Identifier: MIT

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use super::{Capability, CapabilityError, CapabilityKind};

/// Registry binding capability kinds to implementations
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Arc<RwLock<HashMap<CapabilityKind, Arc<dyn Capability>>>>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn register(&self, capability: Arc<dyn Capability>) {
        let mut capabilities = self.capabilities.write().await;
        capabilities.insert(capability.kind(), capability);
    }

    pub async fn get(&self, kind: CapabilityKind) -> Option<Arc<dyn Capability>> {
        let capabilities = self.capabilities.read().await;
        capabilities.get(&kind).cloned()
    }

    /// Invoke the bound capability for a kind, or fail if none is bound
    pub async fn invoke(
        &self,
        kind: CapabilityKind,
        config: &Value,
        context: &Value,
    ) -> Result<Value, CapabilityError> {
        let capability = self
            .get(kind)
            .await
            .ok_or(CapabilityError::NotRegistered(kind))?;
        capability.invoke(config, context).await
    }
}
