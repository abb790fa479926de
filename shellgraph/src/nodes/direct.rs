//! Answers conceptual questions without running anything.

use anyhow::Result;
use minijinja::context;
use tracing::instrument;

use super::{Toolkit, finish_with_answer};
use crate::core::state::RunState;
use crate::core::types::PromptKind;

#[instrument(skip_all)]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let answer = kit.ask(
        PromptKind::DirectResponse,
        context! {
            goal => state.active_goal(),
            working_dir => state.working_dir.display().to_string(),
        },
    )?;
    finish_with_answer(state, answer.trim().to_string());
    Ok(())
}
