//! Configuration loading from files and environment variables

use crate::error::{Error, Result};
use config::{Config as ConfigLib, ConfigBuilder as LibConfigBuilder, Environment, File};
use std::path::Path;
use tracing::debug;

use super::{global_config_path, Config};

type Builder = LibConfigBuilder<config::builder::DefaultState>;

/// Helper to set a config override with consistent error mapping
fn set_config_override<T: Into<config::Value>>(
    builder: Builder,
    key: &str,
    value: T,
    var: &str,
) -> Result<Builder> {
    builder
        .set_override(key, value)
        .map_err(|e| Error::config(format!("Failed to set {var}: {e}")))
}

/// Applies the unprefixed variables older deployments set
fn apply_legacy_env(mut builder: Builder) -> Result<Builder> {
    if let Ok(provider) = std::env::var("LLM_PROVIDER") {
        builder = set_config_override(
            builder,
            "llm.provider",
            provider.to_lowercase(),
            "LLM_PROVIDER",
        )?;
    }
    if let Ok(model) = std::env::var("LLM_MODEL") {
        builder = set_config_override(builder, "llm.model", model, "LLM_MODEL")?;
    }
    if let Ok(url) = std::env::var("LLM_BASE_URL") {
        builder = set_config_override(builder, "llm.api_base_url", url, "LLM_BASE_URL")?;
    }
    if let Ok(temperature) = std::env::var("LLM_TEMPERATURE") {
        if let Ok(value) = temperature.parse::<f64>() {
            builder = set_config_override(builder, "llm.temperature", value, "LLM_TEMPERATURE")?;
        }
    }
    if let Ok(base) = std::env::var("MCP_BASE") {
        builder = set_config_override(builder, "tools.base_url", base, "MCP_BASE")?;
    }
    Ok(builder)
}

impl Config {
    /// Loads configuration from a TOML file with environment variable overrides
    ///
    /// Environment variables are prefixed with `VOICECART_` and use double underscores
    /// for nested values. For example:
    /// - `VOICECART_LLM__PROVIDER=anthropic`
    /// - `VOICECART_TOOLS__TIMEOUT_SECS=10`
    pub fn from_file(path: &Path) -> Result<Self> {
        let mut builder = ConfigLib::builder();

        // Add the config file if it exists
        if path.exists() {
            debug!("Loading configuration from {}", path.display());
            builder = builder.add_source(File::from(path));
        } else {
            debug!("No config file at {}, using defaults", path.display());
        }

        // Add environment variables with VOICECART_ prefix
        builder = builder.add_source(
            Environment::with_prefix("VOICECART")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let builder = apply_legacy_env(builder)?;

        let config = builder
            .build()
            .map_err(|e| Error::config(format!("Failed to build config: {e}")))?;

        config
            .try_deserialize()
            .map_err(|e| Error::config(format!("Failed to deserialize config: {e}")))
    }

    /// Creates a config from a TOML string (useful for testing)
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from a single file
    ///
    /// Precedence (lowest to highest):
    /// 1. Hardcoded defaults
    /// 2. Config file (~/.voicecart/config.toml or custom --config path)
    /// 3. Environment variables (VOICECART_*)
    /// 4. Legacy variables (LLM_PROVIDER, LLM_MODEL, LLM_BASE_URL, LLM_TEMPERATURE, MCP_BASE)
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let path = match config_path {
            Some(p) => p.to_path_buf(),
            None => global_config_path()?,
        };
        Self::from_file(&path)
    }
}
