//! Library interface for the voicecart CLI
//!
//! Exposes pipeline construction and output rendering for testing while
//! keeping argument handling in main.rs.

use anyhow::{Context, Result};
use std::fmt::Write;
use voicecart_agents::{Pipeline, RequestRecord};
use voicecart_core::search_models::Citation;
use voicecart_core::Config;

/// Builds the LLM provider and tool client, then the five-stage pipeline
pub fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let llm = voicecart_llm::create_llm_provider(&config.llm)
        .context("Failed to create LLM provider")?;
    let tools = voicecart_tools::create_tool_client(&config.tools)
        .context("Failed to create tool client")?;
    Ok(Pipeline::new(llm, tools, config))
}

fn describe_citation(citation: &Citation) -> String {
    match citation {
        Citation::Private { doc_id, title } => match title {
            Some(title) => format!("catalog doc #{doc_id}: {title}"),
            None => format!("catalog doc #{doc_id}"),
        },
        Citation::Web { url, title } => match title {
            Some(title) => format!("web {url}: {title}"),
            None => format!("web {url}"),
        },
    }
}

/// Human-readable answer with a numbered citation list
pub fn render_answer(record: &RequestRecord) -> String {
    let mut out = record.answer.clone().unwrap_or_default();
    if !record.citations.is_empty() {
        out.push_str("\n\nCitations:");
        for (i, citation) in record.citations.iter().enumerate() {
            let _ = write!(out, "\n  [{}] {}", i + 1, describe_citation(citation));
        }
    }
    out
}

/// The whole record as pretty-printed JSON
pub fn render_json(record: &RequestRecord) -> Result<String> {
    serde_json::to_string_pretty(record).context("Failed to serialize request record")
}
