//! OpenAI-compatible chat completions provider
//!
//! Serves both the hosted OpenAI API and local OpenAI-compatible servers
//! (vLLM, Ollama, llama.cpp). Only the hosted API gets the native
//! `response_format` JSON mode; local servers get the JSON instruction
//! appended to the prompt instead.

use crate::error::LlmError;
use crate::{finish_completion, with_json_instruction, ChatMessage, Completion, CompletionOptions};
use crate::LlmProvider;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use voicecart_core::config::LlmConfig;

/// Request payload for the chat completions API
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response from the chat completions API
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible completion provider
pub struct OpenAiCompatProvider {
    client: Client,
    model: String,
    api_base_url: String,
    api_key: Option<String>,
    native_json_mode: bool,
    default_temperature: f32,
    default_max_tokens: u32,
    timeout_secs: u64,
}

impl OpenAiCompatProvider {
    /// Create a provider, resolving the API key from config or environment
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        Self::new_with_key(config, config.resolve_api_key())
    }

    /// Create a provider with an explicit API key
    ///
    /// The hosted `openai` provider requires a key; `local` servers do not.
    pub fn new_with_key(config: &LlmConfig, api_key: Option<String>) -> Result<Self, LlmError> {
        let hosted = config.provider == "openai";
        if hosted && api_key.is_none() {
            return Err(LlmError::MissingApiKey {
                provider: config.provider.clone(),
            });
        }

        let api_base_url = config.resolve_base_url();
        info!("Initializing OpenAI-compatible provider");
        info!("  Model: {}", config.model);
        info!("  API Base URL: {api_base_url}");
        info!("  Timeout: {}s", config.timeout_secs);

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            model: config.model.clone(),
            api_base_url,
            api_key,
            native_json_mode: hosted,
            default_temperature: config.temperature,
            default_max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion, LlmError> {
        let prompt_messages = if options.json_mode && !self.native_json_mode {
            with_json_instruction(messages)
        } else {
            messages.to_vec()
        };

        let request = ChatCompletionRequest {
            model: &self.model,
            messages: &prompt_messages,
            temperature: options.temperature.unwrap_or(self.default_temperature),
            max_tokens: options.max_tokens.unwrap_or(self.default_max_tokens),
            response_format: (options.json_mode && self.native_json_mode).then_some(
                ResponseFormat {
                    kind: "json_object",
                },
            ),
        };

        let url = format!("{}/chat/completions", self.api_base_url);
        debug!(
            model = self.model.as_str(),
            json_mode = options.json_mode,
            "Sending chat completion request"
        );

        let started = Instant::now();
        let mut builder = self.client.post(&url).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
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

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(format!("Invalid chat completion payload: {e}")))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| LlmError::Parse("Response contained no message content".to_string()))?;

        debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            chars = content.len(),
            "Chat completion received"
        );

        finish_completion(content, options.json_mode)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
