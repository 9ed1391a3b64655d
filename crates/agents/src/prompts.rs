//! Prompt templates for the LLM-backed stages
//!
//! PRIVATE MODULE - Not exported from crate
//!
//! Each stage sends a static system prompt and a user prompt filled in per
//! request with [`format_prompt`].

pub const ROUTER_SYSTEM: &str = include_str!("../assets/prompts/router_system.txt");
pub const ROUTER_USER: &str = include_str!("../assets/prompts/router_user.txt");

pub const PLANNER_SYSTEM: &str = include_str!("../assets/prompts/planner_system.txt");
pub const PLANNER_USER: &str = include_str!("../assets/prompts/planner_user.txt");

pub const ANSWERER_SYSTEM: &str = include_str!("../assets/prompts/answerer_system.txt");
pub const ANSWERER_USER: &str = include_str!("../assets/prompts/answerer_user.txt");

pub fn format_prompt(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{key}}}"), value);
    }
    result
}
