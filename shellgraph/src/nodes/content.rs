//! Content collection: plan what to read, then walk the working directory.

use anyhow::{Context, Result};
use minijinja::context;
use tracing::{info, instrument};

use super::Toolkit;
use crate::core::response::ContentNeed;
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind};
use crate::io::collect::{CollectLimits, collect_entries};

#[instrument(skip_all, fields(cwd = %state.working_dir.display()))]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let need: ContentNeed = kit.ask_json(
        PromptKind::ContentNeed,
        context! {
            goal => state.active_goal(),
            working_dir => state.working_dir.display().to_string(),
        },
    )?;
    state.collection.needs_content = need.needs_content;
    state.collection.patterns = need.file_patterns;

    let limits = CollectLimits {
        file_count_limit: state.collection.file_count_limit,
        file_size_limit_bytes: state.collection.file_size_limit_bytes,
    };
    let entries = collect_entries(
        &state.working_dir,
        &state.collection.patterns,
        state.collection.needs_content,
        limits,
    )
    .context("collect directory contents")?;
    info!(
        entries = entries.len(),
        needs_content = state.collection.needs_content,
        "content collected"
    );

    state.record_result(format!("collected {} entries", entries.len()));
    state.collection.entries = entries;
    state.route(NodeType::Analytics);
    Ok(())
}
