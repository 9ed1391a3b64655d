//! Planner: intent -> retrieval and ranking plan

use crate::pipeline::Stage;
use crate::prompts::{format_prompt, PLANNER_SYSTEM, PLANNER_USER};
use crate::record::{LogEvent, Node, RequestRecord};
use crate::types::{ComparisonStrategy, Intent, Plan, Ranking, Source, DEFAULT_TOP_K};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, warn};
use voicecart_core::error::Result;
use voicecart_core::search_models::CatalogFilters;
use voicecart_llm::{ChatMessage, LlmProvider};

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 500;

const CLEANING_KEYWORDS: [&str; 3] = ["clean", "cleaner", "disinfect"];
const CLEANING_CATEGORY: &str = "Household Cleaning";

/// Fields requested by the rule-based plan
const FALLBACK_FIELDS: [&str; 6] = ["sku", "title", "price", "rating", "brand", "ingredients"];

/// Rule-based plan used when the model call fails
pub fn fallback_plan(transcript: &str, intent: &Intent) -> Plan {
    let lower = transcript.to_lowercase();
    let budget = intent.constraints.budget.filter(|b| *b > 0.0);

    let mut filters = CatalogFilters::new();
    if CLEANING_KEYWORDS.iter().any(|k| lower.contains(k)) {
        filters.insert("category".to_string(), json!(CLEANING_CATEGORY));
    }
    if let Some(budget) = budget {
        filters.insert("price".to_string(), json!({ "$lte": budget }));
    }

    let mut sources = BTreeSet::from([Source::CatalogSearch]);
    if intent.needs_live {
        sources.insert(Source::WebSearch);
    }

    Plan {
        sources,
        filters,
        query_text: transcript.to_string(),
        fields: FALLBACK_FIELDS.map(String::from).to_vec(),
        ranking: if budget.is_some() {
            Ranking::PriceAsc
        } else {
            Ranking::Relevance
        },
        top_k: DEFAULT_TOP_K,
        comparison_strategy: if intent.needs_live {
            ComparisonStrategy::PriceCheck
        } else {
            ComparisonStrategy::None
        },
    }
}

fn parse_sources(value: Option<&Value>) -> BTreeSet<Source> {
    let sources: BTreeSet<Source> = match value {
        Some(Value::Array(names)) => names
            .iter()
            .filter_map(Value::as_str)
            .filter_map(Source::parse)
            .collect(),
        Some(Value::String(name)) => Source::parse(name).into_iter().collect(),
        _ => BTreeSet::new(),
    };
    if sources.is_empty() {
        BTreeSet::from([Source::CatalogSearch])
    } else {
        sources
    }
}

fn parse_top_k(value: Option<&Value>) -> usize {
    let top_k = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 1.0).map(|f| f as u64)),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    top_k
        .filter(|k| *k > 0)
        .and_then(|k| usize::try_from(k).ok())
        .unwrap_or(DEFAULT_TOP_K)
}

/// Reads a model response, defaulting every missing or malformed field
///
/// The result always has at least one source and a positive `top_k`.
pub fn parse_plan(response: &Value, transcript: &str) -> Plan {
    let defaults = Plan::default_for(transcript);

    let filters = match response.get("filters") {
        Some(Value::Object(map)) => map.clone().into_iter().collect(),
        _ => defaults.filters,
    };

    let query_text = response
        .get("query_text")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(str::to_string)
        .unwrap_or(defaults.query_text);

    let fields = match response.get("fields") {
        Some(Value::Array(fields)) => {
            let fields: Vec<String> = fields
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect();
            if fields.is_empty() {
                defaults.fields
            } else {
                fields
            }
        }
        _ => defaults.fields,
    };

    Plan {
        sources: parse_sources(response.get("sources")),
        filters,
        query_text,
        fields,
        ranking: response
            .get("ranking")
            .and_then(Value::as_str)
            .map(Ranking::parse)
            .unwrap_or(defaults.ranking),
        top_k: parse_top_k(response.get("top_k")),
        comparison_strategy: response
            .get("comparison_strategy")
            .and_then(Value::as_str)
            .map(ComparisonStrategy::parse)
            .unwrap_or(defaults.comparison_strategy),
    }
}

fn describe(value: Option<&str>) -> &str {
    value.unwrap_or("none")
}

/// Retrieval planning stage
pub struct Planner {
    llm: Arc<dyn LlmProvider>,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Model-backed planning
    pub async fn attempt_primary(&self, transcript: &str, intent: &Intent) -> Result<Plan> {
        let c = &intent.constraints;
        let budget = c.budget.map(|b| b.to_string());
        let needs_live = intent.needs_live.to_string();
        let user = format_prompt(
            PLANNER_USER,
            &[
                ("transcript", transcript),
                ("task", intent.task.as_str()),
                ("budget", describe(budget.as_deref())),
                ("material", describe(c.material.as_deref())),
                ("brand", describe(c.brand.as_deref())),
                ("category", describe(c.category.as_deref())),
                ("needs_live", &needs_live),
            ],
        );
        let messages = [ChatMessage::system(PLANNER_SYSTEM), ChatMessage::user(user)];

        let response = self
            .llm
            .complete_json(&messages, TEMPERATURE, MAX_TOKENS)
            .await?;
        Ok(parse_plan(&response, transcript))
    }
}

#[async_trait]
impl Stage for Planner {
    fn node(&self) -> Node {
        Node::Planner
    }

    async fn run(&self, record: &mut RequestRecord) {
        let transcript = record.transcript.clone();
        let intent = record.intent.clone().unwrap_or_else(Intent::out_of_scope);

        let plan = match self.attempt_primary(&transcript, &intent).await {
            Ok(plan) => plan,
            Err(e) => {
                warn!("Planner LLM call failed, using rule-based plan: {e}");
                record.log(Node::Planner, LogEvent::llm_fallback(&e));
                fallback_plan(&transcript, &intent)
            }
        };

        debug!(
            sources = plan.sources.len(),
            top_k = plan.top_k,
            ranking = ?plan.ranking,
            "Planned retrieval"
        );

        record.plan = Some(plan.clone());
        record.log(Node::Planner, LogEvent::Planned { plan });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Constraints, TaskKind};
    use pretty_assertions::assert_eq;

    fn intent(budget: Option<f64>, needs_live: bool) -> Intent {
        Intent {
            task: TaskKind::ProductRecommendation,
            constraints: Constraints {
                budget,
                ..Default::default()
            },
            needs_live,
        }
    }

    #[test]
    fn test_fallback_with_budget_and_live() {
        let plan = fallback_plan("disinfectant wipes under $8 in stock now", &intent(Some(8.0), true));
        assert_eq!(
            plan.sources,
            BTreeSet::from([Source::CatalogSearch, Source::WebSearch])
        );
        assert_eq!(plan.filters.get("category"), Some(&json!("Household Cleaning")));
        assert_eq!(plan.filters.get("price"), Some(&json!({"$lte": 8.0})));
        assert_eq!(plan.ranking, Ranking::PriceAsc);
        assert_eq!(plan.comparison_strategy, ComparisonStrategy::PriceCheck);
        assert_eq!(plan.top_k, 5);
        assert_eq!(plan.fields.len(), 6);
    }

    #[test]
    fn test_fallback_without_budget() {
        let plan = fallback_plan("bamboo toothbrush", &intent(None, false));
        assert_eq!(plan.sources, BTreeSet::from([Source::CatalogSearch]));
        assert!(plan.filters.is_empty());
        assert_eq!(plan.ranking, Ranking::Relevance);
        assert_eq!(plan.comparison_strategy, ComparisonStrategy::None);
    }

    #[test]
    fn test_parse_plan_defaults() {
        let plan = parse_plan(&json!({}), "glass cleaner");
        assert_eq!(plan, Plan::default_for("glass cleaner"));
    }

    #[test]
    fn test_parse_plan_accepts_tool_names() {
        let plan = parse_plan(
            &json!({
                "sources": ["rag.search", "web.search", "bing"],
                "filters": {"price": {"$lte": 15}},
                "query_text": "stainless steel cleaner",
                "ranking": "price_asc",
                "top_k": 8,
                "comparison_strategy": "price_check"
            }),
            "q",
        );
        assert_eq!(
            plan.sources,
            BTreeSet::from([Source::CatalogSearch, Source::WebSearch])
        );
        assert_eq!(plan.query_text, "stainless steel cleaner");
        assert_eq!(plan.ranking, Ranking::PriceAsc);
        assert_eq!(plan.top_k, 8);
        assert_eq!(plan.comparison_strategy, ComparisonStrategy::PriceCheck);
    }

    #[test]
    fn test_parse_plan_enforces_invariants() {
        let plan = parse_plan(
            &json!({"sources": ["bing"], "top_k": 0, "ranking": "vibes"}),
            "q",
        );
        assert_eq!(plan.sources, BTreeSet::from([Source::CatalogSearch]));
        assert_eq!(plan.top_k, 5);
        assert_eq!(plan.ranking, Ranking::Relevance);

        let plan = parse_plan(&json!({"sources": [], "top_k": "-3"}), "q");
        assert!(!plan.sources.is_empty());
        assert_eq!(plan.top_k, 5);

        let plan = parse_plan(&json!({"top_k": 3.0}), "q");
        assert_eq!(plan.top_k, 3);
    }
}
