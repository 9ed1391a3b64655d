//! Full-stack run against mock LLM and tool servers

use serde_json::json;
use voicecart::{build_pipeline, render_answer, render_json};
use voicecart_core::Config;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mock_stack(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rag.search"))
        .and(body_partial_json(json!({"filters": {"price": {"$lte": 20.0}}})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"doc_id": "B7", "title": "Steel Shine Cleaner", "price": 18.49, "brand": ""}
            ]
        })))
        .mount(server)
        .await;

    Mock::given(method("POST"))
        .and(path("/web.search"))
        .and(body_partial_json(json!({"top_k": 5})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                {"title": "Steel Shine Cleaner", "url": "https://deals.test/steel-shine", "price": 18.99}
            ]
        })))
        .mount(server)
        .await;
}

fn config_for(server: &MockServer) -> Config {
    let mut config = Config::default();
    config.llm.provider = "local".to_string();
    config.llm.api_base_url = Some(format!("{}/v1", server.uri()));
    config.tools.base_url = server.uri();
    config
}

#[tokio::test]
async fn test_ask_degrades_to_templated_answer() {
    let server = MockServer::start().await;
    mock_stack(&server).await;

    let pipeline = build_pipeline(&config_for(&server)).unwrap();
    let record = pipeline
        .run("stainless cleaner available now under $20")
        .await;

    assert_eq!(
        record.answer.as_deref(),
        Some(
            "Here are options that fit your request. 1. Steel Shine Cleaner — $18.49 \
             See details on your screen.\n\n(Sources: doc #B7, deals.test)"
        )
    );
    assert_eq!(record.citations.len(), 2);

    let rendered = render_answer(&record);
    assert!(rendered.contains("[1] catalog doc #B7: Steel Shine Cleaner"));
    assert!(rendered.contains("[2] web https://deals.test/steel-shine"));

    let json: serde_json::Value = serde_json::from_str(&render_json(&record).unwrap()).unwrap();
    let retriever = json["log"]
        .as_array()
        .unwrap()
        .iter()
        .find(|e| e["node"] == "retriever")
        .cloned()
        .unwrap();
    assert_eq!(retriever["total_results"], json!({"catalog": 1, "web": 1}));
    assert_eq!(retriever["tool_calls"][0]["tool"], "rag.search");
}

#[tokio::test]
async fn test_ask_survives_tool_outage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let pipeline = build_pipeline(&config_for(&server)).unwrap();
    let record = pipeline.run("glass cleaner").await;

    assert_eq!(
        record.answer.as_deref(),
        Some(voicecart_agents::NO_RESULTS_ANSWER)
    );
    assert!(record.citations.is_empty());
    assert!(render_answer(&record).starts_with("I couldn't find any products"));
}
