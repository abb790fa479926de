//! Node handlers.
//!
//! Each handler takes the run state by mutable reference, does one unit of
//! work and sets `next_node` before returning. Handlers never own state.

pub mod analytics;
pub mod bash;
pub mod classifier;
pub mod code_analyzer;
pub mod content;
pub mod direct;
pub mod formatter;
pub mod validation;

use anyhow::{Context, Result, bail};
use minijinja::Value;
use serde::de::DeserializeOwned;

use crate::core::response::parse_json;
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind};
use crate::io::console::Operator;
use crate::io::gateway::ModelGateway;
use crate::io::prompt::PromptEngine;
use crate::io::shell::ShellRunner;

/// Per-run switches that are not part of the file config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSettings {
    /// Execute commands without safety review or confirmation.
    pub force_approve: bool,
    /// Cap on alternatives tried after an execution failure.
    pub max_alternatives: u32,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            force_approve: false,
            max_alternatives: 3,
        }
    }
}

/// Collaborators available to every node.
pub struct Toolkit<'a> {
    pub gateway: &'a dyn ModelGateway,
    pub operator: &'a dyn Operator,
    pub shell: &'a dyn ShellRunner,
    pub prompts: &'a PromptEngine,
    pub settings: RunSettings,
}

impl Toolkit<'_> {
    /// Render the `kind` prompt and return the raw model reply.
    pub fn ask(&self, kind: PromptKind, ctx: Value) -> Result<String> {
        let prompt = self.prompts.render(kind, ctx)?;
        self.gateway.complete(&prompt)
    }

    /// Like [`Toolkit::ask`], but parse the reply as a JSON object.
    pub fn ask_json<T: DeserializeOwned>(&self, kind: PromptKind, ctx: Value) -> Result<T> {
        let reply = self.ask(kind, ctx)?;
        Ok(parse_json(kind, &reply)?)
    }
}

/// Run the handler for `node`.
pub fn dispatch(node: NodeType, state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let outcome = match node {
        NodeType::Classifier => classifier::run(state, kit),
        NodeType::Bash => bash::run(state, kit),
        NodeType::Validation => validation::run(state, kit),
        NodeType::Formatter => formatter::run(state, kit),
        NodeType::ContentCollection => content::run(state, kit),
        NodeType::Analytics => analytics::run(state, kit),
        NodeType::DirectResponse => direct::run(state, kit),
        NodeType::CodeAnalyzer => code_analyzer::run(state, kit),
        NodeType::Terminal => bail!("terminal has no handler"),
    };
    outcome.with_context(|| format!("node {node} failed"))
}

/// Record a node's answer as the run's result and hand control back to the classifier.
pub(crate) fn finish_with_answer(state: &mut RunState, answer: String) {
    state.record_result(answer.clone());
    state.final_result = answer;
    state.route(NodeType::Classifier);
}
