//! The execution graph: drives the run state from node to node until terminal.

use std::path::PathBuf;

use anyhow::Result;
use tracing::{debug, info, instrument};

use crate::core::state::RunState;
use crate::core::types::NodeType;
use crate::error::{RoutingError, StepLimitExceeded};
use crate::io::collect::CollectLimits;
use crate::io::config::AgentConfig;
use crate::io::console::Operator;
use crate::io::gateway::ModelGateway;
use crate::io::prompt::PromptEngine;
use crate::io::shell::ShellRunner;
use crate::nodes::{RunSettings, Toolkit, dispatch};

/// Default cap on node visits per run.
pub const DEFAULT_MAX_STEPS: u32 = 32;

/// Owns the collaborators for a run and loops over node handlers.
pub struct ExecutionGraph<G, O, S> {
    gateway: G,
    operator: O,
    shell: S,
    prompts: PromptEngine,
    settings: RunSettings,
    max_steps: u32,
    collection: CollectLimits,
}

impl<G: ModelGateway, O: Operator, S: ShellRunner> ExecutionGraph<G, O, S> {
    pub fn new(gateway: G, operator: O, shell: S) -> Result<Self> {
        Ok(Self {
            gateway,
            operator,
            shell,
            prompts: PromptEngine::new()?,
            settings: RunSettings::default(),
            max_steps: DEFAULT_MAX_STEPS,
            collection: CollectLimits {
                file_count_limit: 500,
                file_size_limit_bytes: 100 * 1024,
            },
        })
    }

    /// Apply the loop bound, alternative cap and collection limits from `config`.
    pub fn configured(mut self, config: &AgentConfig) -> Self {
        self.max_steps = config.max_steps;
        self.settings.max_alternatives = config.max_alternatives;
        self.collection = config.collection.limits();
        self
    }

    pub fn with_settings(mut self, settings: RunSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Run `input` to completion and return the final result text.
    pub fn run(&self, input: &str, working_dir: PathBuf) -> Result<String> {
        Ok(self.execute(input, working_dir)?.final_result)
    }

    /// Like [`ExecutionGraph::run`], but hand back the whole final state.
    #[instrument(skip_all, fields(max_steps = self.max_steps))]
    pub fn execute(&self, input: &str, working_dir: PathBuf) -> Result<RunState> {
        let mut state = RunState::new(input, working_dir).with_collection_limits(
            self.collection.file_count_limit,
            self.collection.file_size_limit_bytes,
        );
        let kit = Toolkit {
            gateway: &self.gateway,
            operator: &self.operator,
            shell: &self.shell,
            prompts: &self.prompts,
            settings: self.settings,
        };

        let mut current = NodeType::Classifier;
        let mut steps = 0u32;
        loop {
            let Some(next) = state.next_node.take() else {
                return Err(RoutingError::Unset { after: current }.into());
            };
            if next == NodeType::Terminal {
                info!(steps, history = state.history().len(), "run reached terminal");
                state.route(NodeType::Terminal);
                return Ok(state);
            }
            if steps >= self.max_steps {
                return Err(StepLimitExceeded {
                    max_steps: self.max_steps,
                }
                .into());
            }
            steps += 1;
            current = next;
            debug!(step = steps, node = %current, "dispatching");
            dispatch(current, &mut state, &kit)?;
        }
    }
}
