//! Default values and functions for configuration

// Default constants
pub(crate) const DEFAULT_LLM_PROVIDER: &str = "openai";
pub(crate) const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub(crate) const DEFAULT_LOCAL_API_BASE_URL: &str = "http://localhost:8000/v1";
pub(crate) const DEFAULT_TOOLS_BASE_URL: &str = "http://127.0.0.1:8000";
pub(crate) const DEFAULT_CATALOG_PATH: &str = "/rag.search";
pub(crate) const DEFAULT_WEB_PATH: &str = "/web.search";

pub(crate) fn default_llm_provider() -> String {
    DEFAULT_LLM_PROVIDER.to_string()
}

pub(crate) fn default_llm_model() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

pub(crate) fn default_llm_temperature() -> f32 {
    0.3
}

pub(crate) fn default_llm_max_tokens() -> u32 {
    2000
}

pub(crate) fn default_llm_timeout_secs() -> u64 {
    60
}

pub(crate) fn default_tools_base_url() -> String {
    DEFAULT_TOOLS_BASE_URL.to_string()
}

pub(crate) fn default_catalog_path() -> String {
    DEFAULT_CATALOG_PATH.to_string()
}

pub(crate) fn default_web_path() -> String {
    DEFAULT_WEB_PATH.to_string()
}

pub(crate) fn default_tools_timeout_secs() -> u64 {
    20
}

pub(crate) fn default_web_top_k_cap() -> usize {
    5
}

pub(crate) fn default_match_threshold() -> f64 {
    80.0
}

pub(crate) fn default_conflict_threshold_pct() -> f64 {
    10.0
}

pub(crate) fn default_answer_top_n() -> usize {
    3
}

pub(crate) fn default_private_citation_backfill() -> usize {
    3
}

pub(crate) fn default_web_citation_backfill() -> usize {
    2
}

pub(crate) fn default_citation_suffix_limit() -> usize {
    5
}

pub(crate) fn default_min_answer_chars() -> usize {
    20
}

pub(crate) fn default_max_answer_chars() -> usize {
    500
}
