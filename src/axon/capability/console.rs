use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use super::{Capability, CapabilityError, CapabilityKind};

/// Message-channel stand-in that logs sends and keeps them in memory.
///
/// Lets the CLI run workflows end-to-end without a real channel adapter;
/// the recorded sends double as an assertion surface.
#[derive(Clone, Default)]
pub struct ConsoleChannel {
    sent: Arc<RwLock<Vec<Value>>>,
}

impl ConsoleChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent through this channel so far
    pub async fn sent(&self) -> Vec<Value> {
        self.sent.read().await.clone()
    }
}

#[async_trait]
impl Capability for ConsoleChannel {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Message
    }

    async fn invoke(&self, config: &Value, _context: &Value) -> Result<Value, CapabilityError> {
        let message = config
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        log::info!("[channel] {}", message);

        let mut sent = self.sent.write().await;
        sent.push(config.clone());
        Ok(json!({ "delivered": true }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_sent_messages() {
        let channel = ConsoleChannel::new();
        channel
            .invoke(&json!({"message": "Hola Ana"}), &json!({}))
            .await
            .unwrap();
        channel
            .invoke(&json!({"message": "Adios"}), &json!({}))
            .await
            .unwrap();

        let sent = channel.sent().await;
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0]["message"], "Hola Ana");
        assert_eq!(sent[1]["message"], "Adios");
    }

    #[tokio::test]
    async fn test_reports_delivery() {
        let channel = ConsoleChannel::new();
        let result = channel.invoke(&json!({}), &json!({})).await.unwrap();
        assert_eq!(result["delivered"], true);
    }
}
