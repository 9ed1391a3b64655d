//! Router: transcript -> intent, constraints and safety flags

use crate::pipeline::Stage;
use crate::prompts::{format_prompt, ROUTER_SYSTEM, ROUTER_USER};
use crate::record::{LogEvent, Node, RequestRecord};
use crate::types::{Constraints, Intent, TaskKind};
use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::{Arc, LazyLock};
use tracing::{debug, info, warn};
use voicecart_core::error::{Error, Result};
use voicecart_llm::{ChatMessage, LlmProvider};

const TEMPERATURE: f32 = 0.2;
const MAX_TOKENS: u32 = 500;

/// Phrases that mark a request as needing live prices or stock
const LIVE_KEYWORDS: [&str; 6] = [
    "now",
    "today",
    "in stock",
    "availability",
    "current price",
    "latest",
];

/// Topics the assistant refuses to advise on
const SAFETY_DENY_LIST: [&str; 4] = [
    "mixing chemicals",
    "medical claims",
    "mix bleach",
    "mix ammonia",
];

static BUDGET_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?i)under\s*\$?(\d+(\.\d{1,2})?)").ok());

/// Router verdict
#[derive(Debug, Clone, PartialEq)]
pub struct Routing {
    pub intent: Intent,
    pub safety_flags: BTreeSet<String>,
}

/// Rule-based routing used when the model call fails
pub fn fallback_routing(transcript: &str) -> Routing {
    let lower = transcript.to_lowercase();

    let budget = BUDGET_PATTERN
        .as_ref()
        .and_then(|re| re.captures(transcript))
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok());

    let constraints = Constraints {
        budget,
        material: lower
            .contains("stainless")
            .then(|| "stainless steel".to_string()),
        brand: None,
        category: lower
            .contains("clean")
            .then(|| "cleaning supplies".to_string()),
    };

    Routing {
        intent: Intent {
            task: TaskKind::ProductRecommendation,
            constraints,
            needs_live: LIVE_KEYWORDS.iter().any(|k| lower.contains(k)),
        },
        safety_flags: SAFETY_DENY_LIST
            .iter()
            .filter(|flag| lower.contains(*flag))
            .map(|flag| flag.to_string())
            .collect(),
    }
}

fn non_empty_string(value: &Value) -> Option<String> {
    value
        .as_str()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_budget(value: &Value) -> Option<f64> {
    let budget = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s
            .trim()
            .trim_start_matches('$')
            .replace(',', "")
            .parse::<f64>()
            .ok(),
        _ => None,
    };
    budget.filter(|b| b.is_finite() && *b > 0.0)
}

/// Reads a model response, defaulting every missing or malformed key
pub fn parse_routing(response: &Value) -> Routing {
    let task = response
        .get("task")
        .and_then(Value::as_str)
        .map(TaskKind::parse)
        .unwrap_or(TaskKind::ProductRecommendation);

    let constraints = match response.get("constraints") {
        Some(Value::Object(c)) => Constraints {
            budget: c.get("budget").and_then(parse_budget),
            material: c.get("material").and_then(non_empty_string),
            brand: c.get("brand").and_then(non_empty_string),
            category: c.get("category").and_then(non_empty_string),
        },
        _ => Constraints::default(),
    };

    let needs_live = response
        .get("needs_live")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let safety_flags = response
        .get("safety_flags")
        .and_then(Value::as_array)
        .map(|flags| flags.iter().filter_map(non_empty_string).collect())
        .unwrap_or_default();

    Routing {
        intent: Intent {
            task,
            constraints,
            needs_live,
        },
        safety_flags,
    }
}

/// Intent classification stage
pub struct Router {
    llm: Arc<dyn LlmProvider>,
}

impl Router {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self { llm }
    }

    /// Model-backed classification
    ///
    /// A blank transcript is rejected with [`Error::EmptyInput`] before any
    /// model call.
    pub async fn attempt_primary(&self, transcript: &str) -> Result<Routing> {
        if transcript.trim().is_empty() {
            return Err(Error::EmptyInput);
        }
        let messages = [
            ChatMessage::system(ROUTER_SYSTEM),
            ChatMessage::user(format_prompt(ROUTER_USER, &[("transcript", transcript)])),
        ];
        let response = self
            .llm
            .complete_json(&messages, TEMPERATURE, MAX_TOKENS)
            .await?;
        Ok(parse_routing(&response))
    }
}

#[async_trait]
impl Stage for Router {
    fn node(&self) -> Node {
        Node::Router
    }

    async fn run(&self, record: &mut RequestRecord) {
        let transcript = record.transcript.trim().to_string();

        let routing = match self.attempt_primary(&transcript).await {
            Ok(routing) => routing,
            Err(Error::EmptyInput) => {
                info!("Empty transcript, routing out of scope");
                record.intent = Some(Intent::out_of_scope());
                record.safety_flags.clear();
                record.log(Node::Router, LogEvent::error(Error::EmptyInput.to_string()));
                return;
            }
            Err(e) => {
                warn!("Router LLM call failed, using rule-based routing: {e}");
                record.log(Node::Router, LogEvent::llm_fallback(&e));
                fallback_routing(&transcript)
            }
        };

        debug!(
            task = routing.intent.task.as_str(),
            needs_live = routing.intent.needs_live,
            flags = routing.safety_flags.len(),
            "Routed query"
        );

        record.intent = Some(routing.intent.clone());
        record.safety_flags = routing.safety_flags.clone();
        record.log(
            Node::Router,
            LogEvent::Routed {
                intent: routing.intent,
                safety_flags: routing.safety_flags,
            },
        );
    }
}
