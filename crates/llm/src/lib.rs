//! Provider-polymorphic LLM completion client
//!
//! Every stage of the pipeline talks to the model through the single
//! [`LlmProvider::complete`] capability. One implementation exists per wire
//! protocol:
//!
//! - `openai` / `local`: OpenAI-compatible chat completions
//! - `anthropic`: Anthropic messages API
//!
//! Callers depend only on the trait; [`create_llm_provider`] picks the
//! variant from configuration.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::info;
use voicecart_core::config::LlmConfig;
use voicecart_core::error::{Error, Result};

mod anthropic;
pub mod error;
mod json;
mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use error::LlmError;
pub use json::extract_json_object;
pub use openai_compat::OpenAiCompatProvider;

/// Appended to the last user message when the provider has no native JSON mode
pub(crate) const JSON_INSTRUCTION: &str = "\n\nRespond with valid JSON only.";

/// Speaker of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message of a completion request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call options. Unset values fall back to the provider's configured defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub json_mode: bool,
}

impl CompletionOptions {
    /// Options for a free-text completion
    pub fn text(temperature: f32, max_tokens: u32) -> Self {
        Self {
            temperature: Some(temperature),
            max_tokens: Some(max_tokens),
            json_mode: false,
        }
    }

    /// Options for a completion that must yield a JSON object
    pub fn json(temperature: f32, max_tokens: u32) -> Self {
        Self {
            json_mode: true,
            ..Self::text(temperature, max_tokens)
        }
    }
}

/// Result of a completion: free text, or a JSON object when `json_mode` was requested
#[derive(Debug, Clone, PartialEq)]
pub enum Completion {
    Text(String),
    Json(Value),
}

impl Completion {
    /// Text content; a JSON completion is rendered back to a string
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }

    /// JSON object content; text is searched for an embedded object
    pub fn into_json(self) -> std::result::Result<Value, LlmError> {
        match self {
            Self::Json(value @ Value::Object(_)) => Ok(value),
            Self::Json(other) => Err(LlmError::Parse(format!(
                "expected a JSON object, got {other}"
            ))),
            Self::Text(text) => extract_json_object(&text)
                .ok_or_else(|| LlmError::Parse("no JSON object found in response".to_string())),
        }
    }
}

/// Trait for LLM completion providers
///
/// Implementations must be safe for sequential reuse across queries; one
/// handle is shared by every stage of the pipeline.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Run one completion over an ordered message list
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> std::result::Result<Completion, LlmError>;

    /// Model identifier used for requests
    fn model_name(&self) -> &str;

    /// Free-text completion
    async fn complete_text(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<String, LlmError> {
        let options = CompletionOptions::text(temperature, max_tokens);
        Ok(self.complete(messages, &options).await?.into_text())
    }

    /// JSON-mode completion that must yield an object
    async fn complete_json(
        &self,
        messages: &[ChatMessage],
        temperature: f32,
        max_tokens: u32,
    ) -> std::result::Result<Value, LlmError> {
        let options = CompletionOptions::json(temperature, max_tokens);
        self.complete(messages, &options).await?.into_json()
    }
}

/// Turns raw response text into a [`Completion`] according to the request mode
pub(crate) fn finish_completion(
    content: String,
    json_mode: bool,
) -> std::result::Result<Completion, LlmError> {
    if json_mode {
        Completion::Text(content).into_json().map(Completion::Json)
    } else {
        Ok(Completion::Text(content))
    }
}

/// Copies `messages`, appending the JSON instruction to the last user message
/// (or adding a user message when there is none)
pub(crate) fn with_json_instruction(messages: &[ChatMessage]) -> Vec<ChatMessage> {
    let mut messages = messages.to_vec();
    match messages.iter_mut().rev().find(|m| m.role == Role::User) {
        Some(last_user) => last_user.content.push_str(JSON_INSTRUCTION),
        None => messages.push(ChatMessage::user(JSON_INSTRUCTION.trim_start())),
    }
    messages
}

/// Create a new LLM provider based on configuration
///
/// # Arguments
/// * `config` - LLM configuration including provider type
pub fn create_llm_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.as_str() {
        "openai" | "local" => {
            info!(
                "Creating OpenAI-compatible LLM provider ({})",
                config.provider
            );
            let provider = OpenAiCompatProvider::new(config)?;
            Ok(Arc::new(provider))
        }
        "anthropic" => {
            info!("Creating Anthropic LLM provider");
            let provider = AnthropicProvider::new(config)?;
            Ok(Arc::new(provider))
        }
        other => Err(Error::config(format!(
            "Unknown llm provider: '{other}'. Valid providers: openai, anthropic, local"
        ))),
    }
}
