//! The request record threaded through every stage, and its audit log

use crate::types::{EvidenceSet, Intent, Plan};
use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use voicecart_core::search_models::Citation;

/// Pipeline stage that wrote a log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Node {
    Router,
    Planner,
    Retriever,
    Answerer,
    Critic,
}

/// One external tool invocation made by the retriever
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub tool: String,
    /// The plan-level request. Catalog filters appear here as a plain field
    /// mapping; the tool client encodes them into the store's clause format
    /// when sending.
    pub payload: Value,
    pub results_count: usize,
    pub duration_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Named validation performed by the critic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    Safety,
    Evidence,
    Citations,
    WebCitations,
    Grounding,
    Coherence,
    CitationFormat,
}

/// Outcome of one critic check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fixed,
    Fail,
}

impl CheckStatus {
    /// Overall verdict: any `fail` wins, then any `warn`; `fixed` counts as passing
    pub fn overall<I: IntoIterator<Item = CheckStatus>>(statuses: I) -> Self {
        statuses
            .into_iter()
            .fold(Self::Pass, |acc, status| match (acc, status) {
                (Self::Fail, _) | (_, Self::Fail) => Self::Fail,
                (Self::Warn, _) | (_, Self::Warn) => Self::Warn,
                _ => Self::Pass,
            })
    }
}

/// Verdict the critic records for a run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriticReport {
    pub checks: BTreeMap<CheckKind, CheckStatus>,
    pub status: CheckStatus,
    pub issues: Vec<String>,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub safety_flags: BTreeSet<String>,
}

impl CriticReport {
    pub fn check(&self, kind: CheckKind) -> Option<CheckStatus> {
        self.checks.get(&kind).copied()
    }
}

/// Stage-specific payload of a log entry
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum LogEvent {
    /// The stage could not run on its input
    Error { error: String },
    /// The primary path failed and the deterministic fallback ran
    Fallback { warning: String, error: String },
    Routed {
        intent: Intent,
        safety_flags: BTreeSet<String>,
    },
    Planned { plan: Plan },
    Retrieved {
        tool_calls: Vec<ToolCallRecord>,
        total_results: BTreeMap<String, usize>,
    },
    Status { status: String },
    Answered { top_k: usize, citations_count: usize },
    Critique(CriticReport),
}

impl LogEvent {
    pub const LLM_FALLBACK: &'static str = "llm_fallback";

    pub fn error(error: impl Into<String>) -> Self {
        Self::Error {
            error: error.into(),
        }
    }

    pub fn llm_fallback(error: impl ToString) -> Self {
        Self::Fallback {
            warning: Self::LLM_FALLBACK.to_string(),
            error: error.to_string(),
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self::Status {
            status: status.into(),
        }
    }
}

/// A single audit entry: `{node, ...event fields}` once serialized
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub node: Node,
    #[serde(flatten)]
    pub event: LogEvent,
}

/// Append-only execution log
///
/// Entries can be added and read, never edited or removed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct ExecutionLog(Vec<LogEntry>);

impl ExecutionLog {
    pub fn push(&mut self, node: Node, event: LogEvent) {
        self.0.push(LogEntry { node, event });
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &LogEntry> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Entries written by one stage, in order
    pub fn entries_for(&self, node: Node) -> impl Iterator<Item = &LogEvent> {
        self.0
            .iter()
            .filter(move |entry| entry.node == node)
            .map(|entry| &entry.event)
    }
}

// `(Source: ...)` / `(Sources: ...)` suffixes are for the screen, not for speech
static SOURCES_SUFFIX: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"(?is)\s*\(sources?:.*?\)").ok());

/// Mutable state for one query, owned by the pipeline for the whole run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RequestRecord {
    pub transcript: String,
    pub intent: Option<Intent>,
    pub plan: Option<Plan>,
    pub evidence: Option<EvidenceSet>,
    pub answer: Option<String>,
    pub citations: Vec<Citation>,
    pub safety_flags: BTreeSet<String>,
    pub log: ExecutionLog,
}

impl RequestRecord {
    pub fn new(transcript: impl Into<String>) -> Self {
        Self {
            transcript: transcript.into(),
            ..Default::default()
        }
    }

    /// Appends an entry to the audit log
    pub fn log(&mut self, node: Node, event: LogEvent) {
        self.log.push(node, event);
    }

    /// The answer as it should be read aloud, without the sources suffix
    pub fn spoken_answer(&self) -> Option<String> {
        let answer = self.answer.as_deref()?;
        let spoken = match SOURCES_SUFFIX.as_ref() {
            Some(re) => re.replace_all(answer, "").into_owned(),
            None => answer.to_string(),
        };
        Some(spoken.trim().to_string())
    }

    /// The critic's verdict, if the critic has run
    pub fn critic_report(&self) -> Option<&CriticReport> {
        self.log.iter().rev().find_map(|entry| match &entry.event {
            LogEvent::Critique(report) if entry.node == Node::Critic => Some(report),
            _ => None,
        })
    }
}
