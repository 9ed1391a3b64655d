//! Request and response models for the retrieval tools
//!
//! These types form the contract between the pipeline and the two search
//! backends (private catalog, open web). They are shared by the tool client
//! and the agents without circular dependencies.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Filters sent to the catalog store, keyed by metadata field
pub type CatalogFilters = BTreeMap<String, Value>;

/// Catalog search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogSearchRequest {
    pub query: String,
    pub top_k: usize,
    #[serde(default)]
    pub filters: CatalogFilters,
}

/// Web search request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebSearchRequest {
    pub query: String,
    pub top_k: usize,
}

/// Response envelope shared by both tools
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResults<T> {
    #[serde(default = "Vec::new")]
    pub results: Vec<T>,
}

/// A product from the private catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub doc_id: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub sku: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub rating: Option<f64>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub brand: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub ingredients: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price_per_oz: Option<f64>,
}

impl CatalogItem {
    /// Identifier used in citations: the document id, or the SKU when the
    /// store did not return one
    pub fn citation_id(&self) -> Option<&str> {
        if !self.doc_id.is_empty() {
            return Some(&self.doc_id);
        }
        self.sku.as_deref().filter(|s| !s.is_empty())
    }

    /// Price, with the indexer's `0` placeholder treated as unknown
    pub fn listed_price(&self) -> Option<f64> {
        known_amount(self.price)
    }

    /// Price per ounce, with `0` treated as unknown
    pub fn listed_price_per_oz(&self) -> Option<f64> {
        known_amount(self.price_per_oz)
    }
}

/// A result from the open-web search tool
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WebItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(default, deserialize_with = "lenient_opt_string")]
    pub snippet: Option<String>,
    #[serde(default, deserialize_with = "lenient_f64")]
    pub price: Option<f64>,
}

impl WebItem {
    /// Price, with `0` treated as unknown
    pub fn listed_price(&self) -> Option<f64> {
        known_amount(self.price)
    }
}

/// A source reference attached to the final answer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum Citation {
    Private {
        doc_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
    Web {
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
    },
}

impl Citation {
    pub fn private(doc_id: impl Into<String>, title: Option<String>) -> Self {
        Self::Private {
            doc_id: doc_id.into(),
            title,
        }
    }

    pub fn web(url: impl Into<String>, title: Option<String>) -> Self {
        Self::Web {
            url: url.into(),
            title,
        }
    }

    pub fn is_private(&self) -> bool {
        matches!(self, Self::Private { .. })
    }

    pub fn is_web(&self) -> bool {
        matches!(self, Self::Web { .. })
    }

    /// Short human-readable label: `doc #<id>` or the URL's host
    pub fn label(&self) -> String {
        match self {
            Self::Private { doc_id, .. } => format!("doc #{doc_id}"),
            Self::Web { url, .. } => url_domain(url).to_string(),
        }
    }
}

/// Host part of a URL, taken as the third `/`-delimited segment
/// (`https://example.com/x` -> `example.com`); the whole string when there
/// is no such segment
pub fn url_domain(url: &str) -> &str {
    url.split('/').nth(2).unwrap_or(url)
}

fn known_amount(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

// The catalog store writes "" for absent metadata and may serialise numbers
// as strings, so every optional field is decoded leniently.

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().trim_start_matches('$').parse::<f64>().ok(),
        _ => None,
    })
}

fn lenient_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_opt_string(deserializer)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_catalog_item_lenient_decoding() {
        let json = r#"{
            "doc_id": "B00123",
            "sku": "",
            "title": "EcoClean Stainless Steel Spray",
            "price": "12.99",
            "rating": "",
            "brand": "",
            "price_per_oz": 0.0
        }"#;
        let item: CatalogItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.doc_id, "B00123");
        assert_eq!(item.sku, None);
        assert_eq!(item.price, Some(12.99));
        assert_eq!(item.rating, None);
        assert_eq!(item.brand, None);
        assert_eq!(item.listed_price_per_oz(), None);
    }

    #[test]
    fn test_citation_id_falls_back_to_sku() {
        let item = CatalogItem {
            sku: Some("SKU-9".to_string()),
            ..Default::default()
        };
        assert_eq!(item.citation_id(), Some("SKU-9"));

        let item = CatalogItem::default();
        assert_eq!(item.citation_id(), None);
    }

    #[test]
    fn test_zero_price_is_unknown() {
        let item = CatalogItem {
            price: Some(0.0),
            ..Default::default()
        };
        assert_eq!(item.listed_price(), None);
    }

    #[test]
    fn test_citation_serialization_tags_source() {
        let private = Citation::private("42", None);
        let json = serde_json::to_value(&private).unwrap();
        assert_eq!(json, serde_json::json!({"source": "private", "doc_id": "42"}));

        let web = Citation::web("https://shop.example.com/p/1", Some("Spray".to_string()));
        let json = serde_json::to_value(&web).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"source": "web", "url": "https://shop.example.com/p/1", "title": "Spray"})
        );
    }

    #[test]
    fn test_url_domain() {
        assert_eq!(url_domain("https://www.example.com/item/7"), "www.example.com");
        assert_eq!(url_domain("https://example.com"), "example.com");
        assert_eq!(url_domain("example.com/item"), "example.com/item");
        assert_eq!(url_domain("no-slashes"), "no-slashes");
    }

    #[test]
    fn test_citation_label() {
        assert_eq!(Citation::private("7", None).label(), "doc #7");
        assert_eq!(
            Citation::web("https://store.test/a", None).label(),
            "store.test"
        );
    }

    #[test]
    fn test_search_results_missing_key_is_empty() {
        let parsed: SearchResults<WebItem> = serde_json::from_str("{}").unwrap();
        assert!(parsed.results.is_empty());
    }
}
