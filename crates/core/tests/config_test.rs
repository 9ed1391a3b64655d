use voicecart_core::config::{Config, LlmConfig, PipelineConfig, ToolsConfig};

#[test]
fn test_llm_config_defaults() {
    let config = LlmConfig::default();
    assert_eq!(config.provider, "openai");
    assert_eq!(config.model, "gpt-4o-mini");
    assert_eq!(config.api_key, None);
    assert_eq!(config.temperature, 0.3);
    assert_eq!(config.max_tokens, 2000);
    assert_eq!(config.timeout_secs, 60);
}

#[test]
fn test_tools_config_defaults() {
    let config = ToolsConfig::default();
    assert_eq!(config.base_url, "http://127.0.0.1:8000");
    assert_eq!(config.catalog_path, "/rag.search");
    assert_eq!(config.web_path, "/web.search");
    assert_eq!(config.timeout_secs, 20);
    assert_eq!(config.web_top_k_cap, 5);
}

#[test]
fn test_pipeline_config_defaults() {
    let config = PipelineConfig::default();
    assert_eq!(config.match_threshold, 80.0);
    assert_eq!(config.conflict_threshold_pct, 10.0);
    assert_eq!(config.answer_top_n, 3);
    assert_eq!(config.private_citation_backfill, 3);
    assert_eq!(config.web_citation_backfill, 2);
    assert_eq!(config.citation_suffix_limit, 5);
    assert_eq!(config.min_answer_chars, 20);
    assert_eq!(config.max_answer_chars, 500);
}

#[test]
fn test_default_config_is_valid() {
    assert!(Config::default().validate().is_ok());
}

#[test]
fn test_config_validation_llm_provider() {
    let mut config = Config::default();

    for provider in ["openai", "anthropic", "local"] {
        config.llm.provider = provider.to_string();
        assert!(config.validate().is_ok(), "{provider} should be accepted");
    }

    config.llm.provider = "invalid".to_string();
    let result = config.validate();
    assert!(result.is_err());
    assert!(result
        .unwrap_err()
        .to_string()
        .contains("Invalid llm provider"));
}

#[test]
fn test_config_validation_temperature() {
    let mut config = Config::default();

    config.llm.temperature = 0.0;
    assert!(config.validate().is_ok());

    config.llm.temperature = 2.5;
    assert!(config.validate().is_err());
}

#[test]
fn test_partial_toml_keeps_other_defaults() {
    let config = Config::from_toml_str(
        r#"
        [llm]
        provider = "local"
        api_base_url = "http://gpu-box:8000/v1"

        [pipeline]
        match_threshold = 85.0
        "#,
    )
    .unwrap();

    assert_eq!(config.llm.provider, "local");
    assert_eq!(config.llm.model, "gpt-4o-mini");
    assert_eq!(config.llm.resolve_base_url(), "http://gpu-box:8000/v1");
    assert_eq!(config.pipeline.match_threshold, 85.0);
    assert_eq!(config.pipeline.answer_top_n, 3);
    assert_eq!(config.tools.timeout_secs, 20);
    assert!(config.validate().is_ok());
}
