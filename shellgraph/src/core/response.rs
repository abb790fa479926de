//! Parsing of free-form model replies into typed values.
//!
//! Models wrap JSON in code fences or prose often enough that the parser looks
//! for the outermost object instead of demanding a bare document.

use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::core::types::PromptKind;
use crate::error::GatewayError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TaskVerification {
    pub is_task_done: bool,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GoalCheck {
    pub is_goal_met: bool,
    #[serde(default)]
    pub explanation: String,
}

/// Routing reply. `next_node` stays raw so the caller can raise a typed routing error.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RouteDecision {
    #[serde(default)]
    pub next_node: String,
    #[serde(default)]
    pub goal: String,
    #[serde(default)]
    pub explanation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ContentNeed {
    #[serde(alias = "needsContent")]
    pub needs_content: bool,
    #[serde(default, alias = "filePatterns")]
    pub file_patterns: Vec<String>,
}

/// Deserialize the first JSON object found in `text`.
pub fn parse_json<T: DeserializeOwned>(stage: PromptKind, text: &str) -> Result<T, GatewayError> {
    let body = json_object_slice(text).ok_or_else(|| {
        GatewayError::parse(stage, format!("no JSON object in {:?}", preview(text)))
    })?;
    serde_json::from_str(body).map_err(|err| GatewayError::parse(stage, err.to_string()))
}

fn json_object_slice(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Pull a single shell command out of a model reply.
///
/// Accepts bare text, inline backticks or a fenced block. Unfenced replies
/// keep only their first non-empty line, so trailing prose never reaches the
/// shell. Returns `None` when nothing is left after cleanup.
pub fn extract_command(text: &str) -> Option<String> {
    let trimmed = text.trim();
    let inner = match trimmed.find("```") {
        Some(open) => {
            let after = &trimmed[open + 3..];
            // Skip the info string (e.g. `bash`) on the fence line.
            let body = after.split_once('\n').map_or(after, |(_, rest)| rest);
            body.split("```").next().unwrap_or_default()
        }
        None => trimmed
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default(),
    };
    let cleaned = inner.trim().trim_matches('`').trim();
    let command = cleaned.strip_prefix("$ ").unwrap_or(cleaned).trim();
    (!command.is_empty()).then(|| command.to_string())
}

fn preview(text: &str) -> String {
    const LIMIT: usize = 80;
    match text.char_indices().nth(LIMIT) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
