//! Retriever: executes a plan against the search tools

use crate::pipeline::{millis_since, Stage};
use crate::record::{LogEvent, Node, RequestRecord, ToolCallRecord};
use crate::types::{EvidenceSet, Plan, Source};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use voicecart_core::config::ToolsConfig;
use voicecart_core::error::{Error, Result};
use voicecart_core::search_api::ToolApi;
use voicecart_core::search_models::{CatalogSearchRequest, WebSearchRequest};

/// The catalog store has no hierarchical category matching
const UNSUPPORTED_CATALOG_FILTER: &str = "category";

/// Removes unsupported fields from a filter mapping, descending into
/// operator clause lists (`$and`, `$or`, ...). Clauses left empty are dropped,
/// as are operators left with no clauses.
fn strip_unsupported(filters: &mut Map<String, Value>) {
    filters.remove(UNSUPPORTED_CATALOG_FILTER);
    filters.retain(|key, value| {
        if !key.starts_with('$') {
            return true;
        }
        match value {
            Value::Array(clauses) => {
                clauses.retain_mut(|clause| match clause {
                    Value::Object(inner) => {
                        strip_unsupported(inner);
                        !inner.is_empty()
                    }
                    _ => true,
                });
                !clauses.is_empty()
            }
            Value::Object(inner) => {
                strip_unsupported(inner);
                !inner.is_empty()
            }
            _ => true,
        }
    });
}

/// Evidence gathering stage
pub struct Retriever {
    tools: Arc<dyn ToolApi>,
    timeout_secs: u64,
    web_top_k_cap: usize,
}

impl Retriever {
    pub fn new(tools: Arc<dyn ToolApi>, config: &ToolsConfig) -> Self {
        Self {
            tools,
            timeout_secs: config.timeout_secs,
            web_top_k_cap: config.web_top_k_cap,
        }
    }

    /// Catalog request for a plan, with unsupported filters removed
    pub fn catalog_request(plan: &Plan) -> CatalogSearchRequest {
        let mut filters: Map<String, Value> = plan.filters.clone().into_iter().collect();
        strip_unsupported(&mut filters);
        CatalogSearchRequest {
            query: plan.query_text.clone(),
            top_k: plan.top_k,
            filters: filters.into_iter().collect(),
        }
    }

    /// Web request for a plan, with `top_k` capped
    pub fn web_request(&self, plan: &Plan) -> WebSearchRequest {
        WebSearchRequest {
            query: plan.query_text.clone(),
            top_k: plan.top_k.min(self.web_top_k_cap),
        }
    }

    /// Runs one tool call under the timeout and records it
    ///
    /// Failures resolve to an empty result set; the error is kept in the
    /// returned call record.
    async fn call<R, T, F>(
        &self,
        source: Source,
        request: &R,
        fut: F,
    ) -> (Vec<T>, ToolCallRecord)
    where
        R: Serialize,
        F: Future<Output = Result<Vec<T>>>,
    {
        let tool = source.tool_name();
        let payload = serde_json::to_value(request).unwrap_or(Value::Null);
        let started = Instant::now();

        let outcome = match tokio::time::timeout(Duration::from_secs(self.timeout_secs), fut).await
        {
            Ok(result) => result,
            Err(_) => Err(Error::upstream_timeout(tool, self.timeout_secs)),
        };
        let duration_ms = millis_since(started);

        let (items, error) = match outcome {
            Ok(items) => {
                debug!(tool, results = items.len(), duration_ms, "Tool call succeeded");
                (items, None)
            }
            Err(e) => {
                warn!(tool, duration_ms, "Tool call failed: {e}");
                (Vec::new(), Some(e.to_string()))
            }
        };

        let record = ToolCallRecord {
            tool: tool.to_string(),
            payload,
            results_count: items.len(),
            duration_ms,
            error,
        };
        (items, record)
    }
}

#[async_trait]
impl Stage for Retriever {
    fn node(&self) -> Node {
        Node::Retriever
    }

    async fn run(&self, record: &mut RequestRecord) {
        let plan = record
            .plan
            .clone()
            .unwrap_or_else(|| Plan::default_for(&record.transcript));

        let mut evidence = EvidenceSet::default();
        let mut tool_calls = Vec::new();
        let mut total_results = BTreeMap::new();

        if plan.wants(Source::CatalogSearch) {
            let request = Self::catalog_request(&plan);
            let (items, call) = self
                .call(
                    Source::CatalogSearch,
                    &request,
                    self.tools.catalog_search(request.clone()),
                )
                .await;
            total_results.insert("catalog".to_string(), items.len());
            tool_calls.push(call);
            evidence.catalog = Some(items);
        }

        if plan.wants(Source::WebSearch) {
            let request = self.web_request(&plan);
            let (items, call) = self
                .call(
                    Source::WebSearch,
                    &request,
                    self.tools.web_search(request.clone()),
                )
                .await;
            total_results.insert("web".to_string(), items.len());
            tool_calls.push(call);
            evidence.web = Some(items);
        }

        info!(
            catalog = evidence.catalog_items().len(),
            web = evidence.web_items().len(),
            "Retrieved evidence"
        );

        record.evidence = Some(evidence);
        record.log(
            Node::Retriever,
            LogEvent::Retrieved {
                tool_calls,
                total_results,
            },
        );
    }
}
