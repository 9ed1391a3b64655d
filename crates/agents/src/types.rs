//! Intermediate artifacts passed between stages

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use voicecart_core::search_models::{CatalogFilters, CatalogItem, WebItem};
use voicecart_core::{CATALOG_TOOL, WEB_TOOL};

/// What the shopper is asking for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    ProductRecommendation,
    ProductComparison,
    PriceCheck,
    OutOfScope,
    #[serde(other)]
    Other,
}

impl TaskKind {
    /// Parses a task label; unknown labels become [`TaskKind::Other`]
    pub fn parse(label: &str) -> Self {
        serde_json::from_value(serde_json::Value::String(label.trim().to_lowercase()))
            .unwrap_or(Self::Other)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProductRecommendation => "product_recommendation",
            Self::ProductComparison => "product_comparison",
            Self::PriceCheck => "price_check",
            Self::OutOfScope => "out_of_scope",
            Self::Other => "other",
        }
    }
}

/// Constraints extracted from the query
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    pub budget: Option<f64>,
    pub material: Option<String>,
    pub brand: Option<String>,
    pub category: Option<String>,
}

/// Router output; read-only once produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Intent {
    pub task: TaskKind,
    pub constraints: Constraints,
    pub needs_live: bool,
}

impl Intent {
    pub fn out_of_scope() -> Self {
        Self {
            task: TaskKind::OutOfScope,
            constraints: Constraints::default(),
            needs_live: false,
        }
    }
}

/// Retrieval backend named in a plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    #[serde(alias = "rag.search")]
    CatalogSearch,
    #[serde(alias = "web.search")]
    WebSearch,
}

impl Source {
    /// Accepts both the plan names and the tool endpoint names
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "catalog_search" | "catalog" | "rag.search" | "rag" => Some(Self::CatalogSearch),
            "web_search" | "web" | "web.search" => Some(Self::WebSearch),
            _ => None,
        }
    }

    /// Tool endpoint name used in retrieval logs
    pub fn tool_name(&self) -> &'static str {
        match self {
            Self::CatalogSearch => CATALOG_TOOL,
            Self::WebSearch => WEB_TOOL,
        }
    }
}

/// Ordering applied to reconciled evidence
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Ranking {
    #[default]
    Relevance,
    PriceAsc,
    RatingDesc,
    PricePerOzAsc,
}

impl Ranking {
    /// Unknown names rank by relevance
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "price_asc" => Self::PriceAsc,
            "rating_desc" => Self::RatingDesc,
            "price_per_oz_asc" => Self::PricePerOzAsc,
            _ => Self::Relevance,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComparisonStrategy {
    #[default]
    None,
    PriceCheck,
}

impl ComparisonStrategy {
    pub fn parse(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "price_check" => Self::PriceCheck,
            _ => Self::None,
        }
    }
}

/// Default number of catalog results requested
pub const DEFAULT_TOP_K: usize = 5;

/// Planner output
///
/// `sources` is never empty and `top_k` is always positive; both
/// constructors in the planner enforce this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub sources: BTreeSet<Source>,
    pub filters: CatalogFilters,
    pub query_text: String,
    pub fields: Vec<String>,
    pub ranking: Ranking,
    pub top_k: usize,
    pub comparison_strategy: ComparisonStrategy,
}

impl Plan {
    /// The plan used when the model omits every field
    pub fn default_for(transcript: &str) -> Self {
        Self {
            sources: BTreeSet::from([Source::CatalogSearch]),
            filters: CatalogFilters::new(),
            query_text: transcript.to_string(),
            fields: ["sku", "title", "price"].map(String::from).to_vec(),
            ranking: Ranking::Relevance,
            top_k: DEFAULT_TOP_K,
            comparison_strategy: ComparisonStrategy::None,
        }
    }

    pub fn wants(&self, source: Source) -> bool {
        self.sources.contains(&source)
    }
}

/// Evidence gathered by the retriever
///
/// `None` means the source was not queried; `Some(vec![])` means it was
/// queried (or failed) and returned nothing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceSet {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub catalog: Option<Vec<CatalogItem>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub web: Option<Vec<WebItem>>,
}

impl EvidenceSet {
    pub fn catalog_items(&self) -> &[CatalogItem] {
        self.catalog.as_deref().unwrap_or_default()
    }

    pub fn web_items(&self) -> &[WebItem] {
        self.web.as_deref().unwrap_or_default()
    }

    /// True when no source produced anything
    pub fn is_empty(&self) -> bool {
        self.catalog_items().is_empty() && self.web_items().is_empty()
    }

    /// Every known price across both sources
    pub fn prices(&self) -> impl Iterator<Item = f64> + '_ {
        self.catalog_items()
            .iter()
            .filter_map(CatalogItem::listed_price)
            .chain(self.web_items().iter().filter_map(WebItem::listed_price))
    }
}
