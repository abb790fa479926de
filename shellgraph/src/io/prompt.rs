//! Prompt rendering for every model call.
//!
//! Templates live in `prompts/*.md` and are compiled into the binary. Each
//! [`PromptKind`] maps to exactly one template of the same name.

use anyhow::{Context, Result};
use minijinja::{Environment, Value};
use serde::Serialize;

use crate::core::types::{PromptKind, Task};

const TEMPLATES: &[(PromptKind, &str)] = &[
    (PromptKind::VerifyTask, include_str!("prompts/verify_task.md")),
    (PromptKind::GoalCheck, include_str!("prompts/goal_check.md")),
    (PromptKind::Route, include_str!("prompts/route.md")),
    (PromptKind::BashCommand, include_str!("prompts/bash_command.md")),
    (PromptKind::SafetyReview, include_str!("prompts/safety_review.md")),
    (PromptKind::Alternative, include_str!("prompts/alternative.md")),
    (PromptKind::FormatOutput, include_str!("prompts/format_output.md")),
    (PromptKind::ContentNeed, include_str!("prompts/content_need.md")),
    (PromptKind::Analytics, include_str!("prompts/analytics.md")),
    (PromptKind::DirectResponse, include_str!("prompts/direct_response.md")),
    (PromptKind::ExtractSubject, include_str!("prompts/extract_subject.md")),
    (PromptKind::RelatedTerms, include_str!("prompts/related_terms.md")),
    (PromptKind::AnalyzeSubject, include_str!("prompts/analyze_subject.md")),
];

/// Task results longer than this are clipped when shown back to the model.
const HISTORY_RESULT_LIMIT: usize = 2000;

/// A rendered prompt, tagged with the stage it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub kind: PromptKind,
    pub text: String,
}

/// Template engine wrapper around minijinja.
pub struct PromptEngine {
    env: Environment<'static>,
}

impl PromptEngine {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        for (kind, source) in TEMPLATES {
            env.add_template(kind.as_str(), *source)
                .with_context(|| format!("compile {kind} template"))?;
        }
        Ok(Self { env })
    }

    /// Render the template for `kind` with `ctx` (built with `minijinja::context!`).
    pub fn render(&self, kind: PromptKind, ctx: Value) -> Result<Prompt> {
        let template = self
            .env
            .get_template(kind.as_str())
            .with_context(|| format!("load {kind} template"))?;
        let text = template
            .render(ctx)
            .with_context(|| format!("render {kind} template"))?;
        Ok(Prompt { kind, text })
    }
}

/// Task as shown to the model: result clipped, fields flattened.
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    pub node_type: String,
    pub goal: String,
    pub result: String,
}

impl TaskView {
    pub fn from_task(task: &Task) -> Self {
        Self {
            node_type: task.node_type.to_string(),
            goal: task.goal.clone(),
            result: clip(&task.result, HISTORY_RESULT_LIMIT),
        }
    }
}

pub fn history_view(history: &[Task]) -> Vec<TaskView> {
    history.iter().map(TaskView::from_task).collect()
}

/// Cut `text` to at most `max_bytes`, on a char boundary, marking the cut.
pub fn clip(text: &str, max_bytes: usize) -> String {
    if text.len() <= max_bytes {
        return text.to_string();
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}\n[... truncated {} bytes]", &text[..end], text.len() - end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NodeType;
    use minijinja::context;

    #[test]
    fn every_prompt_kind_has_a_template() {
        let engine = PromptEngine::new().expect("engine");
        for (kind, _) in TEMPLATES {
            assert!(engine.env.get_template(kind.as_str()).is_ok(), "{kind}");
        }
        assert_eq!(TEMPLATES.len(), 13);
    }

    #[test]
    fn route_prompt_lists_history_and_nodes() {
        let engine = PromptEngine::new().expect("engine");
        let mut done = Task::new(NodeType::Bash, "list files");
        done.result = "a.txt".to_string();
        let nodes: Vec<_> = NodeType::routable().map(NodeType::as_str).collect();
        let prompt = engine
            .render(
                PromptKind::Route,
                context! {
                    input => "show files",
                    global_goal => "show files",
                    working_dir => "/tmp",
                    history => history_view(&[done]),
                    nodes => nodes,
                },
            )
            .expect("render");
        assert_eq!(prompt.kind, PromptKind::Route);
        assert!(prompt.text.contains("1. [bash] list files"));
        assert!(prompt.text.contains("Result: a.txt"));
        assert!(prompt.text.contains("bash, formatter, content_collection"));
    }

    #[test]
    fn safety_prompt_carries_command_and_directory() {
        let engine = PromptEngine::new().expect("engine");
        let prompt = engine
            .render(
                PromptKind::SafetyReview,
                context! { command => "ls -la", working_dir => "/srv" },
            )
            .expect("render");
        assert!(prompt.text.contains("Command: ls -la"));
        assert!(prompt.text.contains("Working directory: /srv"));
    }

    #[test]
    fn clip_respects_char_boundaries() {
        assert_eq!(clip("short", 10), "short");
        let clipped = clip("héllo", 2);
        assert!(clipped.starts_with("h\n"));
        assert!(clipped.ends_with("[... truncated 5 bytes]"));
    }
}
