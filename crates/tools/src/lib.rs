//! Retrieval tool clients
//!
//! HTTP implementation of [`ToolApi`] for the catalog-search and web-search
//! endpoints, plus the catalog filter encoding both sides agree on.

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

use std::sync::Arc;
use tracing::info;
use voicecart_core::config::ToolsConfig;
use voicecart_core::error::Result;
use voicecart_core::search_api::ToolApi;

mod filters;
mod http_client;

pub use filters::normalize_filters;
pub use http_client::HttpToolClient;

/// Create the tool client described by configuration
pub fn create_tool_client(config: &ToolsConfig) -> Result<Arc<dyn ToolApi>> {
    info!("Creating tool client for {}", config.base_url);
    Ok(Arc::new(HttpToolClient::new(config)?))
}
