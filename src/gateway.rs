//! ==============================================================================
//! gateway.rs - chat-completion client
//! ==============================================================================
//!
//! purpose:
//!     sends an ordered system/user/assistant message list to the configured
//!     chat-completion endpoint and returns the text of the first choice.
//!     no retries, no streaming, no caching.
//!
//! failure model:
//!     - never initialized (no credential, client build failed)
//!         -> every call returns GatewayError::Unavailable without touching the network
//!     - transport error, timeout, non-2xx, malformed body
//!         -> GatewayError::Upstream with the provider's text
//!
//! relationships:
//!     - created by: main.rs (once, from AiConfig)
//!     - used by: api.rs (analysis, prediction, chatbot handlers)
//!     - consumes: prompts.rs (messages + GenerationParams)
//!
//! ==============================================================================

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::config::AiConfig;
use crate::domain::ChatTurn;
use crate::error::GatewayError;

/// output bound and randomness for one completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

struct Connection {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

/// Clone-able handle; all clones share one connection pool.
#[derive(Clone)]
pub struct AiGateway {
    state: Result<Arc<Connection>, Arc<str>>,
}

// wire format
#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatTurn],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderError,
}

#[derive(Deserialize)]
struct ProviderError {
    message: String,
}

impl AiGateway {
    /// Build from config. Failure is logged here, once, and leaves the
    /// gateway in the unavailable state instead of aborting startup.
    pub fn from_config(config: &AiConfig) -> Self {
        let Some(api_key) = config.resolve_api_key() else {
            let reason = format!("no API key configured (set {})", config.api_key_env);
            tracing::error!("[AI] ✗ Gateway disabled: {}", reason);
            return Self::unavailable(reason);
        };

        match Self::connect(&config.base_url, &config.model, &api_key, config.request_timeout()) {
            Ok(gateway) => {
                tracing::info!("[AI] ✓ Gateway ready ({} via {})", config.model, config.base_url);
                gateway
            }
            Err(e) => {
                tracing::error!("[AI] ✗ Gateway disabled: {}", e);
                Self::disabled(e)
            }
        }
    }

    /// unavailable gateway carrying the bare reason of a failed connect
    fn disabled(e: GatewayError) -> Self {
        match e {
            GatewayError::Unavailable(reason) | GatewayError::Upstream(reason) => Self::unavailable(reason),
        }
    }

    pub fn connect(base_url: &str, model: &str, api_key: &str, timeout: Duration) -> Result<Self, GatewayError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Unavailable(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            state: Ok(Arc::new(Connection {
                client,
                endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
                model: model.to_string(),
                api_key: api_key.to_string(),
            })),
        })
    }

    pub fn unavailable(reason: impl Into<String>) -> Self {
        let reason: String = reason.into();
        Self { state: Err(Arc::from(reason)) }
    }

    pub fn is_available(&self) -> bool {
        self.state.is_ok()
    }

    /// Generate the reply for `messages`; returns the first choice's text.
    pub async fn complete(&self, messages: &[ChatTurn], params: GenerationParams) -> Result<String, GatewayError> {
        let conn = match &self.state {
            Ok(conn) => conn,
            Err(reason) => return Err(GatewayError::Unavailable(reason.to_string())),
        };

        let request = CompletionRequest {
            model: &conn.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        tracing::debug!("[AI] → {} messages, max_tokens={}", messages.len(), params.max_tokens);

        let response = conn
            .client
            .post(&conn.endpoint)
            .bearer_auth(&conn.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GatewayError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GatewayError::Upstream(provider_message(status.as_u16(), &body)));
        }

        let completion: CompletionResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::Upstream(format!("invalid completion response: {}", e)))?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.unwrap_or_default())
            .ok_or_else(|| GatewayError::Upstream("completion contained no choices".to_string()))
    }
}

/// the provider's own error text when it sent one, else status + raw body
fn provider_message(status: u16, body: &str) -> String {
    match serde_json::from_str::<ProviderErrorBody>(body) {
        Ok(parsed) => parsed.error.message,
        Err(_) if body.trim().is_empty() => format!("AI provider returned HTTP {}", status),
        Err(_) => format!("AI provider returned HTTP {}: {}", status, body.trim()),
    }
}
