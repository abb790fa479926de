//! Rewrites raw command output for readability.

use anyhow::Result;
use minijinja::context;
use tracing::{debug, instrument};

use super::{Toolkit, finish_with_answer};
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind};
use crate::io::prompt::clip;

/// Output beyond this is clipped before it is sent for formatting.
const FORMAT_INPUT_LIMIT: usize = 20_000;

#[instrument(skip_all, fields(raw_bytes = state.raw_output.len()))]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    if state.raw_output.trim().is_empty() {
        debug!("nothing to format");
        state.record_result("");
        state.route(NodeType::Classifier);
        return Ok(());
    }

    let formatted = kit.ask(
        PromptKind::FormatOutput,
        context! {
            command => &state.command,
            working_dir => state.working_dir.display().to_string(),
            output => clip(&state.raw_output, FORMAT_INPUT_LIMIT),
        },
    )?;
    finish_with_answer(state, formatted.trim_end().to_string());
    Ok(())
}
