//! Configuration module for voicecart
//!
//! This module provides configuration structures and loading mechanisms.
//! Configuration can be loaded from TOML files and/or environment variables.

mod defaults;
mod loading;


use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use defaults::*;

/// Providers understood by the LLM client factory
pub const VALID_LLM_PROVIDERS: [&str; 3] = ["openai", "anthropic", "local"];

/// Returns the path to the global configuration file
///
/// The global config is stored at `~/.voicecart/config.toml`.
pub fn global_config_path() -> Result<PathBuf> {
    let home_dir = dirs::home_dir()
        .ok_or_else(|| Error::config("Unable to determine home directory".to_string()))?;
    Ok(home_dir.join(".voicecart").join("config.toml"))
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// LLM completion service
    #[serde(default)]
    pub llm: LlmConfig,

    /// Catalog-search and web-search tools
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Pipeline thresholds and caps
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Configuration for the LLM completion service
///
/// # Providers
/// - `openai` (default): OpenAI chat completions, uses LLM_API_KEY / OPENAI_API_KEY
/// - `anthropic`: Anthropic messages API, uses LLM_API_KEY / ANTHROPIC_API_KEY
/// - `local`: any OpenAI-compatible server (vLLM, Ollama), no key required
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Provider type: "openai" (default), "anthropic", "local"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name to use
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// API key for authentication
    pub api_key: Option<String>,

    /// API base URL override (required shape for `local`)
    pub api_base_url: Option<String>,

    /// Default sampling temperature
    #[serde(default = "default_llm_temperature")]
    pub temperature: f32,

    /// Default completion token cap
    #[serde(default = "default_llm_max_tokens")]
    pub max_tokens: u32,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout_secs")]
    pub timeout_secs: u64,
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "***REDACTED***"))
            .field("api_base_url", &self.api_base_url)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl LlmConfig {
    /// API key from config, then `LLM_API_KEY`, then the provider's own variable
    pub fn resolve_api_key(&self) -> Option<String> {
        let provider_var = match self.provider.as_str() {
            "anthropic" => "ANTHROPIC_API_KEY",
            _ => "OPENAI_API_KEY",
        };
        self.api_key
            .clone()
            .or_else(|| std::env::var("LLM_API_KEY").ok())
            .or_else(|| std::env::var(provider_var).ok())
            .filter(|k| !k.is_empty())
    }

    /// Base URL for the provider, falling back to its public endpoint
    pub fn resolve_base_url(&self) -> String {
        if let Some(url) = &self.api_base_url {
            return url.trim_end_matches('/').to_string();
        }
        match self.provider.as_str() {
            "anthropic" => "https://api.anthropic.com/v1".to_string(),
            "local" => DEFAULT_LOCAL_API_BASE_URL.to_string(),
            _ => "https://api.openai.com/v1".to_string(),
        }
    }
}

/// Configuration for the retrieval tools endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Base URL of the tool server
    #[serde(default = "default_tools_base_url")]
    pub base_url: String,

    /// Path of the catalog-search endpoint
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Path of the web-search endpoint
    #[serde(default = "default_web_path")]
    pub web_path: String,

    /// Per-call timeout in seconds
    #[serde(default = "default_tools_timeout_secs")]
    pub timeout_secs: u64,

    /// Upper bound on results requested from web search
    #[serde(default = "default_web_top_k_cap")]
    pub web_top_k_cap: usize,
}

/// Thresholds and caps used by the answerer and critic
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Minimum fuzzy title score (exclusive, 0-100) for a web match
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Price disagreement (exclusive, percent of catalog price) that counts as a conflict
    #[serde(default = "default_conflict_threshold_pct")]
    pub conflict_threshold_pct: f64,

    /// Reconciled items used for answer synthesis
    #[serde(default = "default_answer_top_n")]
    pub answer_top_n: usize,

    /// Private citations the critic may backfill
    #[serde(default = "default_private_citation_backfill")]
    pub private_citation_backfill: usize,

    /// Web citations the critic may backfill
    #[serde(default = "default_web_citation_backfill")]
    pub web_citation_backfill: usize,

    /// Citations listed in an appended `(Sources: ...)` suffix
    #[serde(default = "default_citation_suffix_limit")]
    pub citation_suffix_limit: usize,

    /// Answers shorter than this are flagged
    #[serde(default = "default_min_answer_chars")]
    pub min_answer_chars: usize,

    /// Answers longer than this are flagged
    #[serde(default = "default_max_answer_chars")]
    pub max_answer_chars: usize,
}

// Default implementations

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            api_key: None,
            api_base_url: None,
            temperature: default_llm_temperature(),
            max_tokens: default_llm_max_tokens(),
            timeout_secs: default_llm_timeout_secs(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            base_url: default_tools_base_url(),
            catalog_path: default_catalog_path(),
            web_path: default_web_path(),
            timeout_secs: default_tools_timeout_secs(),
            web_top_k_cap: default_web_top_k_cap(),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            conflict_threshold_pct: default_conflict_threshold_pct(),
            answer_top_n: default_answer_top_n(),
            private_citation_backfill: default_private_citation_backfill(),
            web_citation_backfill: default_web_citation_backfill(),
            citation_suffix_limit: default_citation_suffix_limit(),
            min_answer_chars: default_min_answer_chars(),
            max_answer_chars: default_max_answer_chars(),
        }
    }
}

impl Config {
    /// Validates the configuration
    pub fn validate(&self) -> Result<()> {
        // Validate LLM configuration
        if !VALID_LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            return Err(Error::config(format!(
                "Invalid llm provider '{}'. Must be one of: {:?}",
                self.llm.provider, VALID_LLM_PROVIDERS
            )));
        }
        if self.llm.model.trim().is_empty() {
            return Err(Error::config("llm.model must not be empty".to_string()));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(Error::config(format!(
                "llm.temperature must be between 0.0 and 2.0 (got {})",
                self.llm.temperature
            )));
        }
        if self.llm.max_tokens == 0 {
            return Err(Error::config(
                "llm.max_tokens must be greater than 0".to_string(),
            ));
        }
        if self.llm.timeout_secs == 0 {
            return Err(Error::config(
                "llm.timeout_secs must be greater than 0".to_string(),
            ));
        }

        // Validate tools configuration
        if self.tools.base_url.trim().is_empty() {
            return Err(Error::config("tools.base_url must not be empty".to_string()));
        }
        if self.tools.timeout_secs == 0 {
            return Err(Error::config(
                "tools.timeout_secs must be greater than 0".to_string(),
            ));
        }
        if self.tools.web_top_k_cap == 0 {
            return Err(Error::config(
                "tools.web_top_k_cap must be greater than 0".to_string(),
            ));
        }

        // Validate pipeline configuration
        let p = &self.pipeline;
        for (name, value) in [
            ("match_threshold", p.match_threshold),
            ("conflict_threshold_pct", p.conflict_threshold_pct),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(Error::config(format!(
                    "pipeline.{name} must be between 0 and 100 (got {value})"
                )));
            }
        }
        for (name, value) in [
            ("answer_top_n", p.answer_top_n),
            ("private_citation_backfill", p.private_citation_backfill),
            ("web_citation_backfill", p.web_citation_backfill),
            ("citation_suffix_limit", p.citation_suffix_limit),
        ] {
            if value == 0 {
                return Err(Error::config(format!(
                    "pipeline.{name} must be greater than 0"
                )));
            }
        }
        if p.min_answer_chars >= p.max_answer_chars {
            return Err(Error::config(format!(
                "pipeline.min_answer_chars ({}) must be less than max_answer_chars ({})",
                p.min_answer_chars, p.max_answer_chars
            )));
        }

        Ok(())
    }
}
