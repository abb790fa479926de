//! The single mutable record threaded through every node of a run.

use std::path::PathBuf;

use crate::core::types::{CollectedEntry, NodeType, Task};

/// Parameters and output of the content-collection stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollectionParams {
    pub needs_content: bool,
    /// Glob patterns matched against file names; empty means everything.
    pub patterns: Vec<String>,
    pub file_count_limit: usize,
    pub file_size_limit_bytes: u64,
    pub entries: Vec<CollectedEntry>,
}

/// Run-scoped state owned by the execution graph.
///
/// History is append-only: the only way in is [`RunState::complete_current_task`].
#[derive(Debug, Clone)]
pub struct RunState {
    pub input: String,
    pub global_goal: String,
    pub working_dir: PathBuf,
    pub current_task: Option<Task>,
    history: Vec<Task>,
    pub final_result: String,
    pub raw_output: String,
    pub command: String,
    pub next_node: Option<NodeType>,
    pub collection: CollectionParams,
}

impl RunState {
    pub fn new(input: impl Into<String>, working_dir: PathBuf) -> Self {
        let input = input.into();
        Self {
            global_goal: input.clone(),
            input,
            working_dir,
            current_task: None,
            history: Vec::new(),
            final_result: String::new(),
            raw_output: String::new(),
            command: String::new(),
            next_node: Some(NodeType::Classifier),
            collection: CollectionParams::default(),
        }
    }

    pub fn with_collection_limits(
        mut self,
        file_count_limit: usize,
        file_size_limit_bytes: u64,
    ) -> Self {
        self.collection.file_count_limit = file_count_limit;
        self.collection.file_size_limit_bytes = file_size_limit_bytes;
        self
    }

    pub fn history(&self) -> &[Task] {
        &self.history
    }

    /// Replace the current task with a fresh one for `node_type`.
    pub fn start_task(&mut self, node_type: NodeType, goal: impl Into<String>) {
        self.current_task = Some(Task::new(node_type, goal));
    }

    /// Record `result` on the current task, if there is one.
    pub fn record_result(&mut self, result: impl Into<String>) {
        if let Some(task) = self.current_task.as_mut() {
            task.result = result.into();
        }
    }

    /// Mark the current task completed and move it into history.
    ///
    /// Returns the archived task, or `None` when no task was active.
    pub fn complete_current_task(&mut self) -> Option<&Task> {
        let mut task = self.current_task.take()?;
        task.is_completed = true;
        self.history.push(task);
        self.history.last()
    }

    /// Goal of the active task, falling back to the global goal.
    pub fn active_goal(&self) -> &str {
        self.current_task
            .as_ref()
            .map(|task| task.goal.as_str())
            .filter(|goal| !goal.trim().is_empty())
            .unwrap_or(&self.global_goal)
    }

    pub fn route(&mut self, node: NodeType) {
        self.next_node = Some(node);
    }
}
