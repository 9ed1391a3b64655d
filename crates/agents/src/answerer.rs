//! Answerer: reconciled evidence -> spoken answer and citations

use crate::pipeline::Stage;
use crate::prompts::{format_prompt, ANSWERER_SYSTEM, ANSWERER_USER};
use crate::reconcile::{rank, reconcile, ReconciledItem, Thresholds};
use crate::record::{LogEvent, Node, RequestRecord};
use crate::types::{EvidenceSet, Plan};
use async_trait::async_trait;
use std::fmt::Write;
use std::sync::Arc;
use tracing::{debug, info, warn};
use voicecart_core::config::PipelineConfig;
use voicecart_core::error::{Error, Result};
use voicecart_core::search_models::Citation;
use voicecart_llm::{ChatMessage, LlmProvider};

const TEMPERATURE: f32 = 0.4;
const MAX_TOKENS: u32 = 300;

/// Answer given when neither source returned anything
pub const NO_RESULTS_ANSWER: &str = "I couldn't find any products matching those criteria. \
Try broadening your search or adjusting filters.";

const CITATION_TITLE_CHARS: usize = 100;
const SNIPPET_CHARS: usize = 100;
const TEMPLATE_TITLE_CHARS: usize = 60;

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn citation_title(title: &str) -> Option<String> {
    let title = truncate_chars(title.trim(), CITATION_TITLE_CHARS);
    (!title.is_empty()).then_some(title)
}

fn format_price(price: Option<f64>) -> String {
    price.map_or_else(|| "N/A".to_string(), |p| format!("${p:.2}"))
}

/// One private citation per item with an id, plus one web citation per
/// attached match with a URL
pub fn citations_for(top: &[ReconciledItem]) -> Vec<Citation> {
    let mut citations = Vec::new();
    for item in top {
        if let Some(id) = item.primary.citation_id() {
            citations.push(Citation::private(id, citation_title(&item.primary.title)));
        }
        if let Some(web) = item.web_match.as_ref().filter(|w| !w.url.is_empty()) {
            citations.push(Citation::web(web.url.clone(), citation_title(&web.title)));
        }
    }
    citations
}

/// Evidence block handed to the model
pub fn evidence_summary(top: &[ReconciledItem]) -> String {
    let mut out = String::from("## Evidence Retrieved:\n\n");
    for (i, item) in top.iter().enumerate() {
        let p = &item.primary;
        let title = if p.title.is_empty() { "Unknown" } else { &p.title };
        let _ = writeln!(out, "{}. **{title}**", i + 1);
        let _ = writeln!(out, "   - Doc ID: {}", p.citation_id().unwrap_or("N/A"));
        let _ = writeln!(out, "   - Price: {}", format_price(p.listed_price()));
        let _ = writeln!(
            out,
            "   - Rating: {}",
            p.rating.map_or_else(|| "N/A".to_string(), |r| r.to_string())
        );
        let _ = writeln!(out, "   - Brand: {}", p.brand.as_deref().unwrap_or("N/A"));
        let _ = writeln!(out, "   - Category: {}", p.category.as_deref().unwrap_or("N/A"));

        if let Some(web) = &item.web_match {
            let _ = writeln!(out, "   - Web Match (score {:.0}):", item.match_score);
            let _ = writeln!(out, "     - URL: {}", web.url);
            let _ = writeln!(out, "     - Price: {}", format_price(web.listed_price()));
            let snippet = web.snippet.as_deref().unwrap_or("N/A");
            let _ = writeln!(out, "     - Snippet: {}", truncate_chars(snippet, SNIPPET_CHARS));
            if let Some(conflict) = &item.conflict {
                let _ = writeln!(out, "     - **CONFLICT**: {conflict}");
            }
        }
        out.push('\n');
    }
    out
}

/// Templated answer used when the model call fails
pub fn template_answer(top: &[ReconciledItem]) -> String {
    let lines: Vec<String> = top
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let p = &item.primary;
            let title = if p.title.is_empty() {
                "Product".to_string()
            } else {
                truncate_chars(&p.title, TEMPLATE_TITLE_CHARS)
            };
            let price = p
                .listed_price()
                .map_or_else(|| "price N/A".to_string(), |v| format!("${v:.2}"));
            format!("{}. {title} — {price}", i + 1)
        })
        .collect();

    format!(
        "Here are options that fit your request. {} See details on your screen.",
        lines.join(" ")
    )
}

/// Answer synthesis stage
pub struct Answerer {
    llm: Arc<dyn LlmProvider>,
    thresholds: Thresholds,
    top_n: usize,
}

impl Answerer {
    pub fn new(llm: Arc<dyn LlmProvider>, config: &PipelineConfig) -> Self {
        Self {
            llm,
            thresholds: Thresholds::from(config),
            top_n: config.answer_top_n,
        }
    }

    /// Reconciled, ranked and truncated evidence
    pub fn select(&self, evidence: &EvidenceSet, plan: &Plan) -> Vec<ReconciledItem> {
        let mut items = reconcile(
            evidence.catalog_items(),
            evidence.web_items(),
            self.thresholds,
        );
        rank(&mut items, plan.ranking);
        items.truncate(self.top_n);
        items
    }

    /// Model-composed answer
    pub async fn attempt_primary(&self, transcript: &str, top: &[ReconciledItem]) -> Result<String> {
        let summary = evidence_summary(top);
        let messages = [
            ChatMessage::system(ANSWERER_SYSTEM),
            ChatMessage::user(format_prompt(
                ANSWERER_USER,
                &[("transcript", transcript), ("evidence", &summary)],
            )),
        ];

        let text = self
            .llm
            .complete_text(&messages, TEMPERATURE, MAX_TOKENS)
            .await?;
        let text = text.trim();
        if text.is_empty() {
            return Err(Error::upstream_protocol("LLM returned an empty answer"));
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl Stage for Answerer {
    fn node(&self) -> Node {
        Node::Answerer
    }

    async fn run(&self, record: &mut RequestRecord) {
        let evidence = record.evidence.clone().unwrap_or_default();

        if evidence.is_empty() {
            info!("No evidence retrieved, answering with the no-results message");
            record.answer = Some(NO_RESULTS_ANSWER.to_string());
            record.citations.clear();
            record.log(Node::Answerer, LogEvent::status("no_results"));
            return;
        }

        let plan = record
            .plan
            .clone()
            .unwrap_or_else(|| Plan::default_for(&record.transcript));
        let top = self.select(&evidence, &plan);
        let citations = citations_for(&top);

        let answer = match self.attempt_primary(&record.transcript, &top).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!("Answerer LLM call failed, using templated answer: {e}");
                record.log(Node::Answerer, LogEvent::llm_fallback(&e));
                template_answer(&top)
            }
        };

        debug!(
            top = top.len(),
            citations = citations.len(),
            "Synthesized answer"
        );

        let citations_count = citations.len();
        record.answer = Some(answer);
        record.citations = citations;
        record.log(
            Node::Answerer,
            LogEvent::Answered {
                top_k: top.len(),
                citations_count,
            },
        );
    }
}
