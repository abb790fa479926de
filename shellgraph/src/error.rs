//! Typed leaf errors.
//!
//! Everything propagates as `anyhow::Error`; these types exist so callers and
//! tests can `downcast_ref` the failure class without string matching.

use thiserror::Error;

use crate::core::types::{NodeType, PromptKind};

/// Startup or credential problem. Always fatal.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("environment variable {var} is not set; export it or pass --mock")]
    MissingCredential { var: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// The next-node pointer could not be resolved to a dispatchable node.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RoutingError {
    #[error("next node is empty")]
    Empty,
    #[error("unknown next node {0:?}")]
    Unknown(String),
    #[error("{0} is not a routable target")]
    NotRoutable(NodeType),
    #[error("{after} returned without setting the next node")]
    Unset { after: NodeType },
}

/// Why a model call failed.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayFailure {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("status {code}: {message}")]
    Status { code: u16, message: String },
    #[error("unparsable response: {0}")]
    Parse(String),
}

/// A model call failed at a named stage.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("model call for {stage} failed: {failure}")]
pub struct GatewayError {
    pub stage: PromptKind,
    pub failure: GatewayFailure,
}

impl GatewayError {
    pub fn parse(stage: PromptKind, reason: impl Into<String>) -> Self {
        Self {
            stage,
            failure: GatewayFailure::Parse(reason.into()),
        }
    }
}

/// The graph visited more nodes than `max_steps` allows.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("run exceeded {max_steps} steps without reaching terminal")]
pub struct StepLimitExceeded {
    pub max_steps: u32,
}
