//! Explains a part of the codebase in the working directory.
//!
//! Subject extraction, code search (with a related-terms fallback), snippet
//! assembly and a final analysis call.

use std::path::{Path, PathBuf};

use anyhow::{Result, anyhow};
use minijinja::context;
use tracing::{debug, info, instrument, warn};

use super::{Toolkit, finish_with_answer};
use crate::core::state::RunState;
use crate::core::subject::{
    CONTEXT_CHAR_LIMIT, FileSnippets, condense_context, extract_snippets, fallback_subject,
    parse_related_terms, render_context,
};
use crate::core::types::PromptKind;
use crate::io::collect::{find_code_files, read_code_file};

#[instrument(skip_all, fields(cwd = %state.working_dir.display()))]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let subject = extract_subject(state, kit)?;
    info!(subject = %subject, "analyzing subject");

    let mut terms = vec![subject.clone()];
    let mut files = find_code_files(&state.working_dir, &subject)?;
    if files.is_empty() {
        let reply = kit.ask(PromptKind::RelatedTerms, context! { subject => &subject })?;
        let related = parse_related_terms(&reply, &subject);
        debug!(?related, "no direct matches, trying related terms");
        for term in &related {
            for path in find_code_files(&state.working_dir, term)? {
                if !files.contains(&path) {
                    files.push(path);
                }
            }
        }
        terms.extend(related);
    }
    info!(files = files.len(), "relevant files found");

    let snippets = gather_snippets(&state.working_dir, &files, &terms);
    let rendered = render_context(&snippets);
    let code_context = if rendered.len() > CONTEXT_CHAR_LIMIT {
        debug!(bytes = rendered.len(), "condensing code context");
        condense_context(&snippets, &subject)
    } else {
        rendered
    };

    let analysis = kit.ask(
        PromptKind::AnalyzeSubject,
        context! {
            subject => &subject,
            goal => state.active_goal(),
            working_dir => state.working_dir.display().to_string(),
            context => code_context,
        },
    )?;
    finish_with_answer(state, analysis.trim().to_string());
    Ok(())
}

/// Model-extracted subject, falling back to phrase patterns in the request.
fn extract_subject(state: &RunState, kit: &Toolkit<'_>) -> Result<String> {
    let reply = kit.ask(PromptKind::ExtractSubject, context! { input => state.active_goal() })?;
    let from_model = reply
        .lines()
        .map(|line| line.trim().trim_matches(|c: char| c == '"' || c == '`' || c == '.'))
        .find(|line| !line.is_empty())
        .map(str::to_string);
    from_model
        .or_else(|| fallback_subject(state.active_goal()))
        .or_else(|| fallback_subject(&state.input))
        .ok_or_else(|| anyhow!("could not identify what to analyze in {:?}", state.input))
}

/// Snippets per file for the first term that matches anything in it.
fn gather_snippets(root: &Path, files: &[PathBuf], terms: &[String]) -> Vec<FileSnippets> {
    files
        .iter()
        .filter_map(|path| {
            let content = match read_code_file(path) {
                Ok(content) => content,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        err = %format!("{err:#}"),
                        "skipping unreadable file"
                    );
                    return None;
                }
            };
            let snippets = terms
                .iter()
                .map(|term| extract_snippets(&content, term))
                .find(|snippets| !snippets.is_empty())?;
            let relative = path.strip_prefix(root).unwrap_or(path);
            Some(FileSnippets {
                path: relative.display().to_string(),
                snippets,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::types::NodeType;
    use crate::test_support::{Harness, ScriptedGateway, workspace_with};

    #[test]
    fn analyzes_files_mentioning_the_subject() {
        let workspace = workspace_with(&[
            ("src/parser.rs", "pub struct Parser {\n    pos: usize,\n}\n"),
            ("src/main.rs", "fn main() {}\n"),
        ])
        .expect("workspace");
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::ExtractSubject, "Parser"),
            (PromptKind::AnalyzeSubject, "Parser tracks a position.\n"),
        ]));
        let mut state = RunState::new("how does the parser work", workspace.path().to_path_buf());
        state.start_task(NodeType::CodeAnalyzer, "explain the parser");

        run(&mut state, &harness.toolkit()).expect("analyze");

        assert_eq!(state.final_result, "Parser tracks a position.");
        assert_eq!(state.next_node, Some(NodeType::Classifier));
        let prompts = harness.gateway.prompts();
        let analysis = &prompts[1].text;
        assert!(analysis.contains("File: src/parser.rs"));
        assert!(analysis.contains("pub struct Parser"));
        assert!(!analysis.contains("src/main.rs"));
    }

    #[test]
    fn falls_back_to_related_terms_and_phrase_patterns() {
        let workspace =
            workspace_with(&[("src/fmt.rs", "fn pretty_print() {}\n")]).expect("workspace");
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::ExtractSubject, ""),
            (PromptKind::RelatedTerms, "pretty, format"),
            (PromptKind::AnalyzeSubject, "Formatting lives in fmt.rs."),
        ]));
        let mut state =
            RunState::new("tell me about the formatter", workspace.path().to_path_buf());

        run(&mut state, &harness.toolkit()).expect("analyze");

        let prompts = harness.gateway.prompts();
        assert!(prompts[1].text.contains("\"formatter\""));
        assert!(prompts[2].text.contains("File: src/fmt.rs"));
        assert_eq!(state.final_result, "Formatting lives in fmt.rs.");
    }

    #[test]
    fn missing_subject_is_an_error() {
        let workspace = workspace_with(&[]).expect("workspace");
        let harness = Harness::new(ScriptedGateway::new([(PromptKind::ExtractSubject, "")]));
        let mut state = RunState::new("list files", workspace.path().to_path_buf());

        assert!(run(&mut state, &harness.toolkit()).is_err());
    }
}
