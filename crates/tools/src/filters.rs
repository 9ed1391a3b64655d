//! Catalog filter encoding
//!
//! The catalog store takes a single `where` clause. Plain `field -> value`
//! mappings are turned into that clause here: one field stays as is,
//! several become an explicit `$and` conjunction.

use serde_json::{Map, Value};
use voicecart_core::search_models::CatalogFilters;

fn is_operator(key: &str) -> bool {
    key.starts_with('$')
}

/// Encode plan filters into the catalog store's clause format
///
/// - empty mapping: `{}`
/// - any operator key (`$and`, `$or`, ...): passed through unchanged
/// - one field: `{field: value}`
/// - several fields: `{"$and": [{field: value}, ...]}` in key order
pub fn normalize_filters(filters: &CatalogFilters) -> Value {
    if filters.is_empty() || filters.keys().any(|k| is_operator(k)) {
        return Value::Object(filters.clone().into_iter().collect());
    }

    let mut clauses: Vec<Value> = filters
        .iter()
        .map(|(key, value)| {
            let mut clause = Map::new();
            clause.insert(key.clone(), value.clone());
            Value::Object(clause)
        })
        .collect();

    if clauses.len() == 1 {
        return clauses.remove(0);
    }

    let mut conjunction = Map::new();
    conjunction.insert("$and".to_string(), Value::Array(clauses));
    Value::Object(conjunction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn filters(value: Value) -> CatalogFilters {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_filters() {
        assert_eq!(normalize_filters(&CatalogFilters::new()), json!({}));
    }

    #[test]
    fn test_single_field_kept() {
        let f = filters(json!({"price": {"$lte": 15.0}}));
        assert_eq!(normalize_filters(&f), json!({"price": {"$lte": 15.0}}));
    }

    #[test]
    fn test_multiple_fields_become_conjunction() {
        let f = filters(json!({"price": {"$lte": 15.0}, "brand": "EcoClean"}));
        assert_eq!(
            normalize_filters(&f),
            json!({"$and": [{"brand": "EcoClean"}, {"price": {"$lte": 15.0}}]})
        );
    }

    #[test]
    fn test_operator_passes_through() {
        let f = filters(json!({"$or": [{"brand": "A"}, {"brand": "B"}]}));
        assert_eq!(
            normalize_filters(&f),
            json!({"$or": [{"brand": "A"}, {"brand": "B"}]})
        );
    }

    #[test]
    fn test_normalizing_twice_is_stable() {
        let f = filters(json!({"price": {"$lte": 15.0}, "brand": "EcoClean"}));
        let once = normalize_filters(&f);
        let again = normalize_filters(&serde_json::from_value(once.clone()).unwrap());
        assert_eq!(once, again);
    }
}
