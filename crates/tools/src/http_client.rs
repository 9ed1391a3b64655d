//! HTTP client for the catalog-search and web-search tool endpoints

use crate::filters::normalize_filters;
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};
use voicecart_core::config::ToolsConfig;
use voicecart_core::error::{Error, Result};
use voicecart_core::search_api::{
    CatalogItem, CatalogSearchRequest, SearchResults, ToolApi, WebItem, WebSearchRequest,
    CATALOG_TOOL, WEB_TOOL,
};

/// Catalog payload with filters already encoded for the store
#[derive(Debug, Serialize)]
struct CatalogPayload<'a> {
    query: &'a str,
    top_k: usize,
    filters: Value,
}

/// `ToolApi` over HTTP: one POST per search
pub struct HttpToolClient {
    client: Client,
    catalog_url: String,
    web_url: String,
    timeout_secs: u64,
}

impl HttpToolClient {
    /// Create a client for the tool server described by `config`
    pub fn new(config: &ToolsConfig) -> Result<Self> {
        let base = config.base_url.trim_end_matches('/');
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            catalog_url: join_url(base, &config.catalog_path),
            web_url: join_url(base, &config.web_path),
            timeout_secs: config.timeout_secs,
        })
    }

    async fn post<B, T>(&self, tool: &str, url: &str, body: &B) -> Result<Vec<T>>
    where
        B: Serialize + Sync,
        T: DeserializeOwned,
    {
        debug!("Calling {tool} at {url}");

        let response = self.client.post(url).json(body).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::upstream_timeout(tool, self.timeout_secs)
            } else {
                Error::upstream_protocol(format!("{tool} request failed: {e}"))
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error response".to_string());
            warn!("{tool} returned error {status}");
            return Err(Error::upstream_protocol(format!(
                "{tool} returned error {status}: {error_text}"
            )));
        }

        let envelope: SearchResults<T> = response.json().await.map_err(|e| {
            if e.is_timeout() {
                Error::upstream_timeout(tool, self.timeout_secs)
            } else {
                Error::upstream_protocol(format!("Failed to decode {tool} response: {e}"))
            }
        })?;

        Ok(envelope.results)
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{base}/{}", path.trim_start_matches('/'))
}

#[async_trait]
impl ToolApi for HttpToolClient {
    async fn catalog_search(&self, request: CatalogSearchRequest) -> Result<Vec<CatalogItem>> {
        let payload = CatalogPayload {
            query: &request.query,
            top_k: request.top_k,
            filters: normalize_filters(&request.filters),
        };
        self.post(CATALOG_TOOL, &self.catalog_url, &payload).await
    }

    async fn web_search(&self, request: WebSearchRequest) -> Result<Vec<WebItem>> {
        self.post(WEB_TOOL, &self.web_url, &request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_url() {
        assert_eq!(
            join_url("http://127.0.0.1:8000", "/rag.search"),
            "http://127.0.0.1:8000/rag.search"
        );
        assert_eq!(
            join_url("http://tools", "web.search"),
            "http://tools/web.search"
        );
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ToolsConfig {
            base_url: "http://tools.internal:9000/".to_string(),
            ..Default::default()
        };
        let client = HttpToolClient::new(&config).unwrap();
        assert_eq!(client.catalog_url, "http://tools.internal:9000/rag.search");
        assert_eq!(client.web_url, "http://tools.internal:9000/web.search");
    }
}
