//! Retrieval tool trait definition
//!
//! This trait defines the interface to the two external search backends.
//! The HTTP implementation lives in the tools crate.

use crate::error::Result;
use async_trait::async_trait;

pub use super::search_models::*;

/// Name of the private catalog search tool, as used in logs and errors
pub const CATALOG_TOOL: &str = "rag.search";

/// Name of the open-web search tool
pub const WEB_TOOL: &str = "web.search";

/// Trait defining retrieval tool operations
#[async_trait]
pub trait ToolApi: Send + Sync {
    /// Vector search over the private product catalog
    async fn catalog_search(&self, request: CatalogSearchRequest) -> Result<Vec<CatalogItem>>;

    /// Open-web product search
    async fn web_search(&self, request: WebSearchRequest) -> Result<Vec<WebItem>>;
}
