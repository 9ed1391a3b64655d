//! Stage seam and the sequential orchestrator

use crate::answerer::Answerer;
use crate::critic::Critic;
use crate::planner::Planner;
use crate::record::{Node, RequestRecord};
use crate::retriever::Retriever;
use crate::router::Router;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};
use voicecart_core::config::Config;
use voicecart_core::search_api::ToolApi;
use voicecart_llm::LlmProvider;

/// Milliseconds since `since`, saturating at `u64::MAX`
pub(crate) fn millis_since(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// One transformation over the request record
///
/// Stages never fail: every error is absorbed into a fallback result and a
/// log entry on the record.
#[async_trait]
pub trait Stage: Send + Sync {
    fn node(&self) -> Node;

    async fn run(&self, record: &mut RequestRecord);
}

/// Runs stages in order over a fresh record per query
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    /// Router, Planner, Retriever, Answerer, Critic
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<dyn ToolApi>, config: &Config) -> Self {
        Self::from_stages(vec![
            Box::new(Router::new(llm.clone())),
            Box::new(Planner::new(llm.clone())),
            Box::new(Retriever::new(tools, &config.tools)),
            Box::new(Answerer::new(llm, &config.pipeline)),
            Box::new(Critic::new(&config.pipeline)),
        ])
    }

    pub fn from_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    /// Processes one transcript; always returns a complete record
    pub async fn run(&self, transcript: impl Into<String>) -> RequestRecord {
        let mut record = RequestRecord::new(transcript);
        let started = Instant::now();
        info!("Processing query: {}", record.transcript);

        for stage in &self.stages {
            let stage_started = Instant::now();
            stage.run(&mut record).await;
            debug!(
                node = ?stage.node(),
                elapsed_ms = millis_since(stage_started),
                "Stage complete"
            );
        }

        info!(
            elapsed_ms = millis_since(started),
            log_entries = record.log.len(),
            "Query complete"
        );
        record
    }
}
