//! Product-search agent pipeline
//!
//! A query passes through five stages that share one [`RequestRecord`]:
//!
//! 1. [`Router`] extracts intent, constraints and safety flags
//! 2. [`Planner`] turns the intent into a retrieval and ranking plan
//! 3. [`Retriever`] runs the plan against the catalog and web search tools
//! 4. [`Answerer`] reconciles the evidence and composes a spoken answer
//! 5. [`Critic`] checks safety, citations, grounding and length
//!
//! Each model-backed stage has a deterministic fallback, so a run always
//! completes; failures only show up as degraded answers and log entries.
//!
//! # Public API
//!
//! - [`Pipeline`] and the [`Stage`] seam
//! - the stages, each usable on its own
//! - the record types: [`RequestRecord`], [`ExecutionLog`], [`CriticReport`]
//! - plan and intent models: [`Intent`], [`Plan`], [`EvidenceSet`]
//! - reconciliation helpers: [`reconcile`], [`rank`], [`token_set_ratio`]

#![deny(warnings)]
#![cfg_attr(not(test), deny(clippy::unwrap_used))]
#![cfg_attr(not(test), deny(clippy::expect_used))]

mod answerer;
mod critic;
mod fuzzy;
mod pipeline;
mod planner;
mod prompts;
mod reconcile;
mod record;
mod retriever;
mod router;
mod types;

pub use answerer::{citations_for, evidence_summary, template_answer, Answerer, NO_RESULTS_ANSWER};
pub use critic::{Critic, Review};
pub use fuzzy::{ratio, token_set_ratio};
pub use pipeline::{Pipeline, Stage};
pub use planner::{fallback_plan, parse_plan, Planner};
pub use reconcile::{price_conflict, rank, reconcile, ReconciledItem, Thresholds};
pub use record::{
    CheckKind, CheckStatus, CriticReport, ExecutionLog, LogEntry, LogEvent, Node, RequestRecord,
    ToolCallRecord,
};
pub use retriever::Retriever;
pub use router::{fallback_routing, parse_routing, Router, Routing};
pub use types::{
    ComparisonStrategy, Constraints, EvidenceSet, Intent, Plan, Ranking, Source, TaskKind,
    DEFAULT_TOP_K,
};
