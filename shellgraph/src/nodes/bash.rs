//! Turns the active sub-goal into one shell command.

use anyhow::Result;
use minijinja::context;
use tracing::{info, instrument};

use super::Toolkit;
use crate::core::response::extract_command;
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind};
use crate::error::GatewayError;

#[instrument(skip_all)]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let reply = kit.ask(
        PromptKind::BashCommand,
        context! {
            goal => state.active_goal(),
            input => &state.input,
            working_dir => state.working_dir.display().to_string(),
        },
    )?;
    let command = extract_command(&reply)
        .ok_or_else(|| GatewayError::parse(PromptKind::BashCommand, "model returned no command"))?;
    info!(command = %command, "command generated");

    state.command = command;
    state.route(NodeType::Validation);
    Ok(())
}
