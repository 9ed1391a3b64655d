//! Error types for the LLM client

use std::fmt;

/// Errors that can occur while talking to a completion provider
#[derive(Debug)]
pub enum LlmError {
    /// The provider did not answer within the client timeout
    Timeout { timeout_secs: u64 },

    /// Transport-level failure (connection refused, TLS, body read)
    Request(String),

    /// The provider answered with a non-2xx status
    Status { status: u16, body: String },

    /// The response was not in the expected shape, or JSON could not be recovered
    Parse(String),

    /// A hosted provider was selected without an API key
    MissingApiKey { provider: String },

    /// Configuration error
    Config(String),
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout { timeout_secs } => {
                write!(f, "LLM request timed out after {timeout_secs}s")
            }
            Self::Request(msg) => write!(f, "LLM request failed: {msg}"),
            Self::Status { status, body } => write!(f, "LLM API returned error {status}: {body}"),
            Self::Parse(msg) => write!(f, "Failed to parse LLM response: {msg}"),
            Self::MissingApiKey { provider } => write!(
                f,
                "API key required for provider '{provider}'. Set llm.api_key or LLM_API_KEY"
            ),
            Self::Config(msg) => write!(f, "Configuration error: {msg}"),
        }
    }
}

impl std::error::Error for LlmError {}

impl LlmError {
    /// Classifies a reqwest failure, keeping timeouts distinct
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_secs }
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<LlmError> for voicecart_core::error::Error {
    fn from(err: LlmError) -> Self {
        use voicecart_core::error::Error;
        match err {
            LlmError::Timeout { timeout_secs } => Error::upstream_timeout("llm", timeout_secs),
            LlmError::Request(_) | LlmError::Status { .. } => {
                Error::upstream_protocol(err.to_string())
            }
            LlmError::Parse(msg) => Error::parse(msg),
            LlmError::MissingApiKey { .. } | LlmError::Config(_) => Error::config(err.to_string()),
        }
    }
}
