//! Answers a question from collected directory content.

use anyhow::Result;
use minijinja::context;
use serde::Serialize;
use tracing::{debug, instrument};

use super::{Toolkit, finish_with_answer};
use crate::core::state::RunState;
use crate::core::types::{CollectedEntry, PromptKind};
use crate::io::prompt::clip;

/// Per-file body cap in the analytics prompt.
pub const BODY_LIMIT: usize = 10_000;
/// Cap on all bodies together.
pub const TOTAL_BODY_LIMIT: usize = 100_000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
struct BodyView {
    path: String,
    text: String,
}

/// Bodies to include, in listing order, within both caps.
fn select_bodies(entries: &[CollectedEntry]) -> Vec<BodyView> {
    let mut total = 0usize;
    let mut bodies = Vec::new();
    for entry in entries {
        let Some(body) = entry.body.as_deref() else {
            continue;
        };
        let text = clip(body, BODY_LIMIT);
        if total + text.len() > TOTAL_BODY_LIMIT {
            debug!(path = %entry.path, "total body budget exhausted");
            break;
        }
        total += text.len();
        bodies.push(BodyView {
            path: entry.path.clone(),
            text,
        });
    }
    bodies
}

#[instrument(skip_all, fields(entries = state.collection.entries.len()))]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let bodies = select_bodies(&state.collection.entries);
    let answer = kit.ask(
        PromptKind::Analytics,
        context! {
            goal => state.active_goal(),
            working_dir => state.working_dir.display().to_string(),
            entries => &state.collection.entries,
            bodies => bodies,
        },
    )?;
    let answer = answer.trim().to_string();
    state.raw_output = answer.clone();
    finish_with_answer(state, answer);
    Ok(())
}
