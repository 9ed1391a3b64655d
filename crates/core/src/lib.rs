//! Core types and traits for the voicecart product-search pipeline
//!
//! This crate provides the foundational abstractions shared by the LLM
//! client, the retrieval tool client and the agent pipeline:
//!
//! - **Search models**: catalog/web requests, results and citations
//! - **Traits**: the `ToolApi` seam over the two search backends
//! - **Configuration**: layered TOML + environment configuration
//! - **Error handling**: Unified error types
//!

#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

pub mod config;
pub mod error;
pub mod search_api;
pub mod search_models;

// Re-export main types for convenience
pub use config::{Config, LlmConfig, PipelineConfig, ToolsConfig};
pub use error::{Error, Result};
pub use search_api::{ToolApi, CATALOG_TOOL, WEB_TOOL};
pub use search_models::{
    url_domain, CatalogFilters, CatalogItem, CatalogSearchRequest, Citation, SearchResults,
    WebItem, WebSearchRequest,
};
