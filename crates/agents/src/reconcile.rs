//! Cross-source evidence reconciliation and ranking

use crate::fuzzy::token_set_ratio;
use crate::types::Ranking;
use serde::Serialize;
use std::cmp::Ordering;
use voicecart_core::config::PipelineConfig;
use voicecart_core::search_models::{CatalogItem, WebItem};

/// Thresholds governing matches and conflicts
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// A web item is attached only when its score is strictly above this
    pub match_score: f64,
    /// Price disagreement, in percent of the catalog price, strictly above which a conflict is tagged
    pub conflict_pct: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            match_score: 80.0,
            conflict_pct: 10.0,
        }
    }
}

impl From<&PipelineConfig> for Thresholds {
    fn from(config: &PipelineConfig) -> Self {
        Self {
            match_score: config.match_threshold,
            conflict_pct: config.conflict_threshold_pct,
        }
    }
}

/// A catalog item paired with its best web counterpart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconciledItem {
    pub primary: CatalogItem,
    pub web_match: Option<WebItem>,
    /// Best score seen, whether or not a match was attached
    pub match_score: f64,
    pub conflict: Option<String>,
}

/// `price_diff_<pct>%` when the two prices disagree by more than `threshold_pct`
pub fn price_conflict(catalog_price: f64, web_price: f64, threshold_pct: f64) -> Option<String> {
    let diff_pct = (catalog_price - web_price).abs() / catalog_price * 100.0;
    (diff_pct > threshold_pct).then(|| format!("price_diff_{diff_pct:.1}%"))
}

/// Pair every catalog item with the best-scoring web item
///
/// The first web item with the highest score wins ties. The conflict is
/// computed against that best candidate even when it stays below the match
/// threshold; items without a known price never conflict.
pub fn reconcile(
    catalog: &[CatalogItem],
    web: &[WebItem],
    thresholds: Thresholds,
) -> Vec<ReconciledItem> {
    catalog
        .iter()
        .map(|primary| {
            let mut best: Option<&WebItem> = None;
            let mut best_score = 0.0;
            for candidate in web {
                let score = token_set_ratio(&primary.title, &candidate.title);
                if score > best_score {
                    best_score = score;
                    best = Some(candidate);
                }
            }

            let conflict = best.and_then(|candidate| {
                let catalog_price = primary.listed_price()?;
                let web_price = candidate.listed_price()?;
                price_conflict(catalog_price, web_price, thresholds.conflict_pct)
            });

            ReconciledItem {
                primary: primary.clone(),
                web_match: best
                    .filter(|_| best_score > thresholds.match_score)
                    .cloned(),
                match_score: best_score,
                conflict,
            }
        })
        .collect()
}

fn ascending_missing_last(a: Option<f64>, b: Option<f64>) -> Ordering {
    a.unwrap_or(f64::INFINITY)
        .total_cmp(&b.unwrap_or(f64::INFINITY))
}

/// Stable sort by the plan's ranking; `Relevance` keeps catalog order
pub fn rank(items: &mut [ReconciledItem], ranking: Ranking) {
    match ranking {
        Ranking::Relevance => {}
        Ranking::PriceAsc => items.sort_by(|a, b| {
            ascending_missing_last(a.primary.listed_price(), b.primary.listed_price())
        }),
        Ranking::RatingDesc => items.sort_by(|a, b| {
            let ra = a.primary.rating.filter(|r| r.is_finite()).unwrap_or(0.0);
            let rb = b.primary.rating.filter(|r| r.is_finite()).unwrap_or(0.0);
            rb.total_cmp(&ra)
        }),
        Ranking::PricePerOzAsc => items.sort_by(|a, b| {
            ascending_missing_last(
                a.primary.listed_price_per_oz(),
                b.primary.listed_price_per_oz(),
            )
        }),
    }
}
