//! Tests for the HTTP tool client against a mock tool server

use pretty_assertions::assert_eq;
use serde_json::json;
use std::time::Duration;
use voicecart_core::config::ToolsConfig;
use voicecart_core::error::Error;
use voicecart_core::search_api::{CatalogSearchRequest, ToolApi, WebSearchRequest};
use voicecart_tools::create_tool_client;
use wiremock::matchers::{body_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn tools_config(server: &MockServer, timeout_secs: u64) -> ToolsConfig {
    ToolsConfig {
        base_url: server.uri(),
        timeout_secs,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_catalog_search_encodes_filters_and_decodes_items() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rag.search"))
        .and(body_json(json!({
            "query": "stainless steel cleaner",
            "top_k": 5,
            "filters": {"$and": [{"brand": "EcoClean"}, {"price": {"$lte": 15.0}}]}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "doc_id": "B0001",
                    "sku": "SKU-1",
                    "title": "EcoClean Stainless Steel Spray",
                    "price": 12.99,
                    "rating": 4.6,
                    "brand": "EcoClean",
                    "category": "Household Cleaning",
                    "ingredients": "",
                    "price_per_oz": 0.81
                },
                {"doc_id": "B0002", "title": "Budget Wipes", "price": 0.0}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 5)).unwrap();
    let mut request = CatalogSearchRequest {
        query: "stainless steel cleaner".to_string(),
        top_k: 5,
        filters: Default::default(),
    };
    request
        .filters
        .insert("price".to_string(), json!({"$lte": 15.0}));
    request
        .filters
        .insert("brand".to_string(), json!("EcoClean"));

    let items = client.catalog_search(request).await.unwrap();

    assert_eq!(items.len(), 2);
    assert_eq!(items[0].doc_id, "B0001");
    assert_eq!(items[0].listed_price(), Some(12.99));
    assert_eq!(items[0].ingredients, None);
    assert_eq!(items[1].listed_price(), None);
}

#[tokio::test]
async fn test_web_search_payload() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/web.search"))
        .and(body_json(json!({"query": "cleaner price today", "top_k": 3})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {
                    "title": "EcoClean Stainless Steel Spray 16oz",
                    "url": "https://shop.example.com/ecoclean",
                    "snippet": "Streak-free shine",
                    "price": 14.5
                }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 5)).unwrap();
    let items = client
        .web_search(WebSearchRequest {
            query: "cleaner price today".to_string(),
            top_k: 3,
        })
        .await
        .unwrap();

    assert_eq!(items.len(), 1);
    assert_eq!(items[0].url, "https://shop.example.com/ecoclean");
    assert_eq!(items[0].listed_price(), Some(14.5));
}

#[tokio::test]
async fn test_missing_results_key_is_empty() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/web.search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 5)).unwrap();
    let items = client
        .web_search(WebSearchRequest {
            query: "q".to_string(),
            top_k: 5,
        })
        .await
        .unwrap();
    assert!(items.is_empty());
}

#[tokio::test]
async fn test_error_status_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rag.search"))
        .respond_with(ResponseTemplate::new(500).set_body_string("index unavailable"))
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 5)).unwrap();
    let err = client
        .catalog_search(CatalogSearchRequest {
            query: "q".to_string(),
            top_k: 5,
            filters: Default::default(),
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamProtocol(_)));
    assert!(err.to_string().contains("index unavailable"));
}

#[tokio::test]
async fn test_undecodable_body_is_protocol_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/rag.search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 5)).unwrap();
    let err = client
        .catalog_search(CatalogSearchRequest {
            query: "q".to_string(),
            top_k: 5,
            filters: Default::default(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, Error::UpstreamProtocol(_)));
}

#[tokio::test]
async fn test_slow_tool_times_out() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/web.search"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"results": []}))
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let client = create_tool_client(&tools_config(&server, 1)).unwrap();
    let err = client
        .web_search(WebSearchRequest {
            query: "q".to_string(),
            top_k: 5,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, Error::UpstreamTimeout { timeout_secs: 1, .. }));
}
