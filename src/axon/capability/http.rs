// SPDX-License-Identifier: MIT

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;

use super::{Capability, CapabilityError, CapabilityKind};

/// Config accepted by the `http` node
#[derive(Debug, Serialize, Deserialize)]
pub struct HttpRequestConfig {
    pub url: String,
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<Value>,
    /// Total attempts for this request. Retry is a property of the
    /// capability, never of the engine.
    #[serde(default = "default_attempts")]
    pub attempts: u32,
}

fn default_method() -> String {
    "GET".to_string()
}

fn default_attempts() -> u32 {
    1
}

/// HTTP request capability backed by reqwest
pub struct HttpCapability {
    client: Client,
}

impl HttpCapability {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    async fn send_once(&self, config: &HttpRequestConfig) -> Result<Value, CapabilityError> {
        let url = reqwest::Url::parse(&config.url)
            .map_err(|e| CapabilityError::invocation(CapabilityKind::Http, e.to_string()))?;

        let method: reqwest::Method = config
            .method
            .to_uppercase()
            .parse()
            .map_err(|_| {
                CapabilityError::invocation(
                    CapabilityKind::Http,
                    format!("invalid method: {}", config.method),
                )
            })?;

        let mut request = self.client.request(method, url);
        for (name, value) in &config.headers {
            request = request.header(name, value);
        }
        if let Some(body) = &config.body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CapabilityError::invocation(CapabilityKind::Http, e.to_string()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CapabilityError::invocation(CapabilityKind::Http, e.to_string()))?;

        if !status.is_success() {
            return Err(CapabilityError::invocation(
                CapabilityKind::Http,
                format!("HTTP {}: {}", status.as_u16(), text),
            ));
        }

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));
        Ok(json!({ "status": status.as_u16(), "body": body }))
    }
}

impl Default for HttpCapability {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Capability for HttpCapability {
    fn kind(&self) -> CapabilityKind {
        CapabilityKind::Http
    }

    async fn invoke(&self, config: &Value, _context: &Value) -> Result<Value, CapabilityError> {
        let config: HttpRequestConfig = serde_json::from_value(config.clone())
            .map_err(|e| CapabilityError::invocation(CapabilityKind::Http, e.to_string()))?;

        let attempts = config.attempts.max(1);
        let mut last_err = None;
        for attempt in 1..=attempts {
            match self.send_once(&config).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    log::warn!(
                        "HTTP request to {} failed (attempt {}/{}): {}",
                        config.url,
                        attempt,
                        attempts,
                        e
                    );
                    last_err = Some(e);
                }
            }
        }
        Err(last_err
            .unwrap_or_else(|| CapabilityError::invocation(CapabilityKind::Http, "no attempts")))
    }
}
