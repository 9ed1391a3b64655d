//! Anthropic Messages API provider
//!
//! Differences from the OpenAI-compatible wire format:
//! - Auth via `x-api-key` plus a required `anthropic-version` header
//! - System messages go in the top-level `system` field
//! - No native JSON mode; the instruction is appended to the prompt
//! - Text is returned as a list of content blocks

use crate::error::LlmError;
use crate::{finish_completion, with_json_instruction, ChatMessage, Completion, CompletionOptions};
use crate::{LlmProvider, Role};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};
use voicecart_core::config::LlmConfig;

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<&'a ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic completion provider
pub struct AnthropicProvider {
    client: Client,
    model: String,
    api_base_url: String,
    api_key: String,
    default_temperature: f32,
    default_max_tokens: u32,
    timeout_secs: u64,
}

impl AnthropicProvider {
    /// Create a provider, resolving the API key from config or environment
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .resolve_api_key()
            .ok_or_else(|| LlmError::MissingApiKey {
                provider: config.provider.clone(),
            })?;
        Self::new_with_key(config, api_key)
    }

    /// Create a provider with an explicit API key
    pub fn new_with_key(config: &LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let api_base_url = config.resolve_base_url();
        info!("Initializing Anthropic provider");
        info!("  Model: {}", config.model);
        info!("  API Base URL: {api_base_url}");

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            api_base_url,
            api_key,
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }

    /// Split system messages out of the conversation, joining several with blank lines
    fn extract_system_message(messages: &[ChatMessage]) -> (Option<String>, Vec<&ChatMessage>) {
        let (system, rest): (Vec<&ChatMessage>, Vec<&ChatMessage>) =
            messages.iter().partition(|m| m.role == Role::System);
        let system = (!system.is_empty()).then(|| {
            system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n")
        });
        (system, rest)
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        let owned;
        let messages = if options.json_mode {
            owned = with_json_instruction(messages);
            owned.as_slice()
        } else {
            messages
        };
        let (system, conversation) = Self::extract_system_message(messages);

        let request = MessagesRequest {
            model: &self.model,
            max_tokens: options.max_tokens.unwrap_or(self.default_max_tokens),
            temperature: options.temperature.unwrap_or(self.default_temperature),
            system,
            messages: conversation,
        };

        let url = format!("{}/messages", self.api_base_url);
        debug!(
            model = self.model.as_str(),
            url = url.as_str(),
            "Sending Anthropic completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::from_reqwest(e, self.timeout_secs))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Invalid messages payload: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| LlmError::Parse("Response contained no text block".to_string()))?;

        finish_completion(text, options.json_mode)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
