//! Critic: post-hoc validation of the synthesized answer
//!
//! Runs a fixed sequence of checks over the answer, its citations and the
//! retrieved evidence. Checks may rewrite the answer or add citations, and
//! later checks see the result of earlier ones. A non-empty safety flag set
//! short-circuits everything else with a refusal. The critic never calls
//! the model.

use crate::answerer::NO_RESULTS_ANSWER;
use crate::pipeline::Stage;
use crate::record::{CheckKind, CheckStatus, CriticReport, LogEvent, Node, RequestRecord};
use crate::types::EvidenceSet;
use async_trait::async_trait;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::LazyLock;
use tracing::{debug, info};
use voicecart_core::config::PipelineConfig;
use voicecart_core::search_models::Citation;

static PRICE_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\$(\d+(?:\.\d+)?)").ok());

const PRICE_TOLERANCE: f64 = 0.01;

const ACKNOWLEDGMENTS: [&str; 2] = ["couldn't find", "no products"];
const SOURCE_MARKERS: [&str; 2] = ["(source", "doc #"];

/// Answer, citations and verdict after review
#[derive(Debug, Clone, PartialEq)]
pub struct Review {
    pub answer: String,
    pub citations: Vec<Citation>,
    pub report: CriticReport,
}

fn refusal(flags: &BTreeSet<String>) -> String {
    let topics: Vec<&str> = flags.iter().map(String::as_str).collect();
    format!(
        "I can help with product recommendations, but I cannot provide advice on {}. \
         Please consult manufacturer instructions or a qualified professional.",
        topics.join(", ")
    )
}

fn mentions_any(text: &str, needles: &[&str]) -> bool {
    let lower = text.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// Dollar amounts in `answer` with no evidence price within a cent
fn ungrounded_prices(answer: &str, evidence: &EvidenceSet) -> Vec<String> {
    let Some(re) = PRICE_PATTERN.as_ref() else {
        return Vec::new();
    };
    let known: Vec<f64> = evidence.prices().collect();

    re.captures_iter(answer)
        .filter_map(|caps| {
            let amount: f64 = caps.get(1)?.as_str().parse().ok()?;
            let grounded = known
                .iter()
                .any(|p| (amount - p).abs() <= PRICE_TOLERANCE + f64::EPSILON);
            if grounded {
                None
            } else {
                caps.get(0).map(|m| m.as_str().to_string())
            }
        })
        .collect()
}

/// Answer validation stage
pub struct Critic {
    private_backfill: usize,
    web_backfill: usize,
    suffix_limit: usize,
    min_chars: usize,
    max_chars: usize,
}

impl Critic {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            private_backfill: config.private_citation_backfill,
            web_backfill: config.web_citation_backfill,
            suffix_limit: config.citation_suffix_limit,
            min_chars: config.min_answer_chars,
            max_chars: config.max_answer_chars,
        }
    }

    /// Checks catalog citations, backfilling when none are present
    fn check_private_citations(
        &self,
        evidence: &EvidenceSet,
        citations: &mut Vec<Citation>,
        issues: &mut Vec<String>,
    ) -> CheckStatus {
        let candidates: BTreeSet<&str> = evidence
            .catalog_items()
            .iter()
            .take(self.private_backfill)
            .filter_map(|item| item.citation_id())
            .collect();
        let present = citations.iter().filter(|c| c.is_private()).count();

        if !evidence.catalog_items().is_empty() && present == 0 {
            issues.push("missing_private_citations".to_string());
            let mut added = 0;
            for item in evidence.catalog_items().iter().take(self.private_backfill) {
                let Some(id) = item.citation_id() else {
                    continue;
                };
                let cited = citations
                    .iter()
                    .any(|c| matches!(c, Citation::Private { doc_id, .. } if doc_id == id));
                if !cited {
                    citations.push(Citation::private(id, None));
                    added += 1;
                }
            }
            if added > 0 {
                CheckStatus::Fixed
            } else {
                CheckStatus::Warn
            }
        } else if present > 0 && present < candidates.len() {
            issues.push("incomplete_private_citations".to_string());
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        }
    }

    /// Mirror of the catalog check for web evidence, keyed by URL
    fn check_web_citations(
        &self,
        evidence: &EvidenceSet,
        citations: &mut Vec<Citation>,
        issues: &mut Vec<String>,
    ) -> CheckStatus {
        let candidates: BTreeSet<&str> = evidence
            .web_items()
            .iter()
            .take(self.web_backfill)
            .map(|item| item.url.as_str())
            .filter(|url| !url.is_empty())
            .collect();
        let present = citations.iter().filter(|c| c.is_web()).count();

        if !evidence.web_items().is_empty() && present == 0 {
            issues.push("missing_web_citations".to_string());
            let mut added = 0;
            for url in evidence
                .web_items()
                .iter()
                .take(self.web_backfill)
                .map(|item| item.url.as_str())
                .filter(|url| !url.is_empty())
            {
                let cited = citations
                    .iter()
                    .any(|c| matches!(c, Citation::Web { url: u, .. } if u == url));
                if !cited {
                    citations.push(Citation::web(url, None));
                    added += 1;
                }
            }
            if added > 0 {
                CheckStatus::Fixed
            } else {
                CheckStatus::Warn
            }
        } else if present > 0 && present < candidates.len() {
            issues.push("incomplete_web_citations".to_string());
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        }
    }

    /// Runs every check in order over the given output
    pub fn review(
        &self,
        answer: &str,
        citations: &[Citation],
        evidence: &EvidenceSet,
        safety_flags: &BTreeSet<String>,
    ) -> Review {
        let mut checks = BTreeMap::new();

        if !safety_flags.is_empty() {
            checks.insert(CheckKind::Safety, CheckStatus::Fail);
            return Review {
                answer: refusal(safety_flags),
                citations: citations.to_vec(),
                report: CriticReport {
                    checks,
                    status: CheckStatus::Fail,
                    issues: Vec::new(),
                    safety_flags: safety_flags.clone(),
                },
            };
        }
        checks.insert(CheckKind::Safety, CheckStatus::Pass);

        let mut answer = answer.to_string();
        let mut citations = citations.to_vec();
        let mut issues = Vec::new();

        let evidence_status = if evidence.is_empty() {
            if !mentions_any(&answer, &ACKNOWLEDGMENTS) {
                answer = NO_RESULTS_ANSWER.to_string();
                issues.push("empty_evidence_not_acknowledged".to_string());
            }
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        checks.insert(CheckKind::Evidence, evidence_status);

        let status = self.check_private_citations(evidence, &mut citations, &mut issues);
        checks.insert(CheckKind::Citations, status);
        let status = self.check_web_citations(evidence, &mut citations, &mut issues);
        checks.insert(CheckKind::WebCitations, status);

        let ungrounded = ungrounded_prices(&answer, evidence);
        let grounding = if ungrounded.is_empty() {
            CheckStatus::Pass
        } else {
            issues.push(format!(
                "potentially_ungrounded_prices: {}",
                ungrounded.join(", ")
            ));
            CheckStatus::Warn
        };
        checks.insert(CheckKind::Grounding, grounding);

        let length = answer.chars().count();
        let coherence = if length < self.min_chars {
            issues.push("answer_too_short".to_string());
            CheckStatus::Warn
        } else if length > self.max_chars {
            issues.push("answer_too_long".to_string());
            CheckStatus::Warn
        } else {
            CheckStatus::Pass
        };
        checks.insert(CheckKind::Coherence, coherence);

        let format = if !citations.is_empty() && !mentions_any(&answer, &SOURCE_MARKERS) {
            let labels: Vec<String> = citations
                .iter()
                .take(self.suffix_limit)
                .map(Citation::label)
                .collect();
            answer.push_str(&format!("\n\n(Sources: {})", labels.join(", ")));
            CheckStatus::Fixed
        } else {
            CheckStatus::Pass
        };
        checks.insert(CheckKind::CitationFormat, format);

        let status = CheckStatus::overall(checks.values().copied());
        Review {
            answer,
            citations,
            report: CriticReport {
                checks,
                status,
                issues,
                safety_flags: BTreeSet::new(),
            },
        }
    }
}

#[async_trait]
impl Stage for Critic {
    fn node(&self) -> Node {
        Node::Critic
    }

    async fn run(&self, record: &mut RequestRecord) {
        let evidence = record.evidence.clone().unwrap_or_default();
        let answer = record.answer.clone().unwrap_or_default();

        let review = self.review(&answer, &record.citations, &evidence, &record.safety_flags);

        debug!(checks = ?review.report.checks, "Critic checks complete");
        info!(
            status = ?review.report.status,
            issues = review.report.issues.len(),
            "Critic verdict"
        );

        record.answer = Some(review.answer);
        record.citations = review.citations;
        record.log(Node::Critic, LogEvent::Critique(review.report));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use voicecart_core::search_models::{CatalogItem, WebItem};

    fn critic() -> Critic {
        Critic::new(&PipelineConfig::default())
    }

    fn catalog(id: &str, price: f64) -> CatalogItem {
        CatalogItem {
            doc_id: id.to_string(),
            title: format!("Product {id}"),
            price: Some(price),
            ..Default::default()
        }
    }

    fn web(url: &str, price: f64) -> WebItem {
        WebItem {
            title: "Product".to_string(),
            url: url.to_string(),
            price: Some(price),
            ..Default::default()
        }
    }

    fn evidence(catalog: Vec<CatalogItem>, web: Vec<WebItem>) -> EvidenceSet {
        EvidenceSet {
            catalog: Some(catalog),
            web: Some(web),
        }
    }

    const ANSWER: &str = "EcoClean Stainless Steel Spray costs $12.99 and is plant based.";

    #[test]
    fn test_safety_refusal_short_circuits() {
        let flags = BTreeSet::from(["mix bleach".to_string(), "medical claims".to_string()]);
        let review = critic().review(
            ANSWER,
            &[Citation::private("B1", None)],
            &evidence(vec![catalog("B1", 12.99)], vec![]),
            &flags,
        );

        assert_eq!(
            review.answer,
            "I can help with product recommendations, but I cannot provide advice on \
             medical claims, mix bleach. Please consult manufacturer instructions or a \
             qualified professional."
        );
        assert_eq!(review.report.status, CheckStatus::Fail);
        assert_eq!(review.report.checks.len(), 1);
        assert_eq!(review.report.check(CheckKind::Safety), Some(CheckStatus::Fail));
        assert_eq!(review.report.safety_flags, flags);
    }

    #[test]
    fn test_unacknowledged_empty_evidence_is_replaced() {
        let review = critic().review(ANSWER, &[], &EvidenceSet::default(), &BTreeSet::new());
        assert_eq!(review.answer, NO_RESULTS_ANSWER);
        assert_eq!(review.report.check(CheckKind::Evidence), Some(CheckStatus::Warn));
        assert!(review
            .report
            .issues
            .contains(&"empty_evidence_not_acknowledged".to_string()));
        assert_eq!(review.report.status, CheckStatus::Warn);
    }

    #[test]
    fn test_acknowledged_empty_evidence_is_kept() {
        let review = critic().review(
            NO_RESULTS_ANSWER,
            &[],
            &evidence(vec![], vec![]),
            &BTreeSet::new(),
        );
        assert_eq!(review.answer, NO_RESULTS_ANSWER);
        assert!(review.report.issues.is_empty());
        assert_eq!(review.report.status, CheckStatus::Warn);
    }

    #[test]
    fn test_private_citations_are_backfilled() {
        let review = critic().review(
            ANSWER,
            &[],
            &evidence(
                vec![
                    catalog("B1", 12.99),
                    catalog("B1", 12.99),
                    catalog("B2", 9.0),
                    catalog("B3", 7.0),
                ],
                vec![],
            ),
            &BTreeSet::new(),
        );
        assert_eq!(
            review.citations,
            vec![Citation::private("B1", None), Citation::private("B2", None)]
        );
        assert_eq!(review.report.check(CheckKind::Citations), Some(CheckStatus::Fixed));
        assert!(review.answer.ends_with("\n\n(Sources: doc #B1, doc #B2)"));
    }

    #[test]
    fn test_web_citations_are_backfilled() {
        let review = critic().review(
            ANSWER,
            &[Citation::private("B1", None)],
            &evidence(
                vec![catalog("B1", 12.99)],
                vec![
                    web("https://a.test/1", 12.99),
                    web("", 12.99),
                    web("https://c.test/3", 12.99),
                ],
            ),
            &BTreeSet::new(),
        );
        assert_eq!(
            review.citations,
            vec![
                Citation::private("B1", None),
                Citation::web("https://a.test/1", None)
            ]
        );
        assert_eq!(
            review.report.check(CheckKind::WebCitations),
            Some(CheckStatus::Fixed)
        );
        assert!(review.answer.ends_with("(Sources: doc #B1, a.test)"));
    }

    #[test]
    fn test_incomplete_private_citations_warn() {
        let review = critic().review(
            &format!("{ANSWER} (Sources: doc #B1)"),
            &[Citation::private("B1", None)],
            &evidence(vec![catalog("B1", 12.99), catalog("B2", 9.0)], vec![]),
            &BTreeSet::new(),
        );
        assert_eq!(review.report.check(CheckKind::Citations), Some(CheckStatus::Warn));
        assert_eq!(review.citations.len(), 1);
    }

    #[test]
    fn test_ungrounded_prices_are_flagged_not_fixed() {
        let answer = "The spray is $12.99 today and the wipes are $3.50 (Sources: doc #B1)";
        let review = critic().review(
            answer,
            &[Citation::private("B1", None)],
            &evidence(vec![catalog("B1", 12.99)], vec![]),
            &BTreeSet::new(),
        );
        assert_eq!(review.answer, answer);
        assert_eq!(review.report.check(CheckKind::Grounding), Some(CheckStatus::Warn));
        assert!(review
            .report
            .issues
            .contains(&"potentially_ungrounded_prices: $3.50".to_string()));
    }

    #[test]
    fn test_prices_within_a_cent_are_grounded() {
        let review = critic().review(
            "Both sprays cost about $13 or $12.99 (Sources: doc #B1)",
            &[Citation::private("B1", None)],
            &evidence(vec![catalog("B1", 12.99)], vec![web("https://a.test/1", 13.0)]),
            &BTreeSet::new(),
        );
        assert_eq!(review.report.check(CheckKind::Grounding), Some(CheckStatus::Pass));
    }

    #[test]
    fn test_length_bounds() {
        let ev = evidence(vec![catalog("B1", 1.0)], vec![]);
        let cited = [Citation::private("B1", None)];

        let review = critic().review("doc #B1 ok", &cited, &ev, &BTreeSet::new());
        assert_eq!(review.report.check(CheckKind::Coherence), Some(CheckStatus::Warn));
        assert!(review.report.issues.contains(&"answer_too_short".to_string()));

        let long = format!("doc #B1 {}", "very ".repeat(120));
        let review = critic().review(&long, &cited, &ev, &BTreeSet::new());
        assert!(review.report.issues.contains(&"answer_too_long".to_string()));
    }

    #[test]
    fn test_existing_source_marker_is_left_alone() {
        let answer = "Try EcoClean spray, doc #B1, at $12.99 for a streak-free finish.";
        let review = critic().review(
            answer,
            &[Citation::private("B1", None)],
            &evidence(vec![catalog("B1", 12.99)], vec![]),
            &BTreeSet::new(),
        );
        assert_eq!(review.answer, answer);
        assert_eq!(review.report.status, CheckStatus::Pass);
    }

    #[test]
    fn test_second_review_is_a_no_op() {
        let ev = evidence(
            vec![catalog("B1", 12.99), catalog("B2", 9.0)],
            vec![web("https://shop.example.com/p/1", 14.5)],
        );
        let first = critic().review(ANSWER, &[], &ev, &BTreeSet::new());
        assert_eq!(first.report.status, CheckStatus::Pass);

        let second = critic().review(&first.answer, &first.citations, &ev, &BTreeSet::new());
        assert_eq!(second.answer, first.answer);
        assert_eq!(second.citations, first.citations);
        assert!(second
            .report
            .checks
            .values()
            .all(|s| *s == CheckStatus::Pass));
        assert!(second.report.issues.is_empty());
    }

    proptest! {
        #[test]
        fn prop_backfill_is_capped(catalog_len in 0usize..20, web_len in 0usize..20) {
            let items = (0..catalog_len)
                .map(|i| catalog(&format!("B{i}"), 5.0))
                .collect();
            let links = (0..web_len)
                .map(|i| web(&format!("https://shop{i}.test/p"), 5.0))
                .collect();
            let review = critic().review(
                "A perfectly reasonable answer at $5.00.",
                &[],
                &evidence(items, links),
                &BTreeSet::new(),
            );
            let private = review.citations.iter().filter(|c| c.is_private()).count();
            let web = review.citations.iter().filter(|c| c.is_web()).count();
            prop_assert_eq!(private, catalog_len.min(3));
            prop_assert_eq!(web, web_len.min(2));
        }

        #[test]
        fn prop_safety_refusal_hides_products(
            flag in "(mix bleach|mixing chemicals|medical claims|mix ammonia)",
            price in 1.0f64..100.0,
        ) {
            let answer = format!("Buy EcoClean Stainless Steel Spray for ${price:.2} today.");
            let review = critic().review(
                &answer,
                &[],
                &evidence(vec![catalog("B1", price)], vec![]),
                &BTreeSet::from([flag]),
            );
            prop_assert_eq!(review.report.status, CheckStatus::Fail);
            prop_assert!(!review.answer.contains("EcoClean"));
            prop_assert!(!review.answer.contains('$'));
        }
    }
}
