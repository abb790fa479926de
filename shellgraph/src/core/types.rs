//! Closed vocabularies shared by the graph, the nodes and the model boundary.
//!
//! Model output is parsed into these types as soon as it arrives so nothing past
//! the boundary ever matches on raw strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RoutingError;

/// A processing stage of the execution graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeType {
    Classifier,
    Bash,
    Validation,
    Formatter,
    ContentCollection,
    Analytics,
    DirectResponse,
    CodeAnalyzer,
    /// The only accepting state.
    Terminal,
}

impl NodeType {
    pub const ALL: [NodeType; 9] = [
        NodeType::Classifier,
        NodeType::Bash,
        NodeType::Validation,
        NodeType::Formatter,
        NodeType::ContentCollection,
        NodeType::Analytics,
        NodeType::DirectResponse,
        NodeType::CodeAnalyzer,
        NodeType::Terminal,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            NodeType::Classifier => "classifier",
            NodeType::Bash => "bash",
            NodeType::Validation => "validation",
            NodeType::Formatter => "formatter",
            NodeType::ContentCollection => "content_collection",
            NodeType::Analytics => "analytics",
            NodeType::DirectResponse => "direct_response",
            NodeType::CodeAnalyzer => "code_analyzer",
            NodeType::Terminal => "terminal",
        }
    }

    /// Whether the classifier may hand control to this node.
    ///
    /// `classifier` would loop without progress and `validation` needs a command
    /// produced by `bash`.
    pub fn is_routable(self) -> bool {
        !matches!(self, NodeType::Classifier | NodeType::Validation)
    }

    /// Targets offered to the model when routing.
    pub fn routable() -> impl Iterator<Item = NodeType> {
        Self::ALL.into_iter().filter(|node| node.is_routable())
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeType {
    type Err = RoutingError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(RoutingError::Empty);
        }
        NodeType::ALL
            .into_iter()
            .find(|node| node.as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| RoutingError::Unknown(name.to_string()))
    }
}

/// One attempted step toward the global goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Task {
    pub node_type: NodeType,
    pub goal: String,
    pub is_completed: bool,
    pub result: String,
}

impl Task {
    pub fn new(node_type: NodeType, goal: impl Into<String>) -> Self {
        Self {
            node_type,
            goal: goal.into(),
            is_completed: false,
            result: String::new(),
        }
    }
}

/// Coarse safety class assigned to a candidate command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Safe,
    Caution,
    Dangerous,
}

impl Verdict {
    /// Inclusive risk-score band for the verdict.
    pub fn band(self) -> (u8, u8) {
        match self {
            Verdict::Safe => (1, 3),
            Verdict::Caution => (4, 6),
            Verdict::Dangerous => (7, 10),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Verdict::Safe => "SAFE",
            Verdict::Caution => "CAUTION",
            Verdict::Dangerous => "DANGEROUS",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Parsed model safety rating for a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyAssessment {
    pub verdict: Verdict,
    /// Always inside `verdict.band()`.
    pub risk_score: u8,
    pub rationale: String,
}

/// What to do with a candidate command before running it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafetyDecision {
    Execute,
    Confirm,
}

/// Coarse class of an execution failure, used to steer the alternative prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    CommandNotFound,
    PermissionDenied,
    FileNotFound,
    NotADirectory,
    InvalidOption,
    SyntaxError,
    Timeout,
    Unknown,
}

impl FailureKind {
    pub fn as_str(self) -> &'static str {
        match self {
            FailureKind::CommandNotFound => "command_not_found",
            FailureKind::PermissionDenied => "permission_denied",
            FailureKind::FileNotFound => "file_not_found",
            FailureKind::NotADirectory => "not_a_directory",
            FailureKind::InvalidOption => "invalid_option",
            FailureKind::SyntaxError => "syntax_error",
            FailureKind::Timeout => "timeout",
            FailureKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stage of a model call. Selects the prompt template and labels gateway errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    VerifyTask,
    GoalCheck,
    Route,
    BashCommand,
    SafetyReview,
    Alternative,
    FormatOutput,
    ContentNeed,
    Analytics,
    DirectResponse,
    ExtractSubject,
    RelatedTerms,
    AnalyzeSubject,
}

impl PromptKind {
    pub fn as_str(self) -> &'static str {
        match self {
            PromptKind::VerifyTask => "verify_task",
            PromptKind::GoalCheck => "goal_check",
            PromptKind::Route => "route",
            PromptKind::BashCommand => "bash_command",
            PromptKind::SafetyReview => "safety_review",
            PromptKind::Alternative => "alternative",
            PromptKind::FormatOutput => "format_output",
            PromptKind::ContentNeed => "content_need",
            PromptKind::Analytics => "analytics",
            PromptKind::DirectResponse => "direct_response",
            PromptKind::ExtractSubject => "extract_subject",
            PromptKind::RelatedTerms => "related_terms",
            PromptKind::AnalyzeSubject => "analyze_subject",
        }
    }
}

impl fmt::Display for PromptKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry produced by content collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedEntry {
    /// Path relative to the collection root.
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub body: Option<String>,
}
