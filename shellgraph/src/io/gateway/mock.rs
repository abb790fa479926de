use anyhow::Result;
use tracing::debug;

use super::ModelGateway;
use crate::core::types::PromptKind;
use crate::io::prompt::Prompt;

/// Offline gateway with deterministic, keyword-driven replies.
///
/// Good enough to walk a request through the graph end to end without a
/// network or credentials. Every run routes to one node and then finishes.
#[derive(Debug, Default, Clone, Copy)]
pub struct MockGateway;

/// Value of the first `Label: value` line in a rendered prompt.
fn field<'a>(text: &'a str, label: &str) -> &'a str {
    text.lines()
        .find_map(|line| line.strip_prefix(label)?.strip_prefix(": "))
        .unwrap_or_default()
        .trim()
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

fn route(text: &str) -> String {
    if text.contains("Completed tasks:") {
        return r#"{"next_node": "terminal", "goal": "", "explanation": "mock: work already done"}"#
            .to_string();
    }
    let request = field(text, "Request").to_lowercase();
    let node = if contains_any(&request, &["how does", "explain the", "about the", "works"]) {
        "code_analyzer"
    } else if contains_any(&request, &["read", "summarize", "summarise", "contents of"]) {
        "content_collection"
    } else if contains_any(&request, &["what is", "why ", "define "]) {
        "direct_response"
    } else {
        "bash"
    };
    format!(
        r#"{{"next_node": "{node}", "goal": {goal}, "explanation": "mock keyword routing"}}"#,
        goal = serde_json::Value::String(request)
    )
}

fn bash_command(text: &str) -> &'static str {
    let goal = field(text, "Goal").to_lowercase();
    if contains_any(&goal, &["disk", "space"]) {
        "df -h ."
    } else if contains_any(&goal, &["size", "how big"]) {
        "du -sh ."
    } else if contains_any(&goal, &["where am i", "current directory", "pwd"]) {
        "pwd"
    } else if goal.contains("git") {
        "git status"
    } else {
        "ls -la"
    }
}

fn formatted_output(text: &str) -> String {
    text.split_once("Output:\n")
        .map(|(_, rest)| rest.split("\n\nKeep every piece").next().unwrap_or(rest))
        .unwrap_or_default()
        .trim()
        .to_string()
}

impl ModelGateway for MockGateway {
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        let text = prompt.text.as_str();
        let reply = match prompt.kind {
            PromptKind::VerifyTask => {
                r#"{"is_task_done": true, "explanation": "mock: accepted"}"#.to_string()
            }
            PromptKind::GoalCheck => {
                r#"{"is_goal_met": true, "explanation": "mock: accepted"}"#.to_string()
            }
            PromptKind::Route => route(text),
            PromptKind::BashCommand => bash_command(text).to_string(),
            PromptKind::SafetyReview => "SAFE [2] Mock review: treated as read-only.".to_string(),
            PromptKind::Alternative | PromptKind::ExtractSubject | PromptKind::RelatedTerms => {
                String::new()
            }
            PromptKind::FormatOutput => formatted_output(text),
            PromptKind::ContentNeed => {
                r#"{"needs_content": false, "file_patterns": []}"#.to_string()
            }
            PromptKind::Analytics => {
                "Mock analytics: the directory listing was collected but not analysed offline."
                    .to_string()
            }
            PromptKind::DirectResponse => format!(
                "Mock answer for: {}. Run without --mock for a real response.",
                field(text, "Question")
            ),
            PromptKind::AnalyzeSubject => {
                let subject = text
                    .lines()
                    .next()
                    .and_then(|line| line.split('"').nth(1))
                    .unwrap_or("the subject");
                format!("Mock analysis of {subject}: code context gathered, not analysed offline.")
            }
        };
        debug!(stage = %prompt.kind, reply_bytes = reply.len(), "mock reply");
        Ok(reply)
    }
}
