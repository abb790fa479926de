//! Subject extraction and snippet assembly for code analysis.

use std::sync::LazyLock;

use regex::Regex;

/// Lines of context kept on each side of a matching line.
pub const SNIPPET_CONTEXT_LINES: usize = 3;

/// Code context longer than this is condensed before analysis.
pub const CONTEXT_CHAR_LIMIT: usize = 5000;

static SUBJECT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"about the (\w+)",
        r"about (\w+)",
        r"regarding (\w+)",
        r"how (\w+) works",
        r"how does the (\w+)",
        r"how does (\w+)",
        r"explain the (\w+)",
        r"explain (\w+)",
        r"\bon (\w+)",
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
});

/// Guess the subject from phrasing like "tell me about the parser".
pub fn fallback_subject(input: &str) -> Option<String> {
    let lowered = input.to_lowercase();
    SUBJECT_PATTERNS
        .iter()
        .find_map(|re| re.captures(&lowered)?.get(1).map(|m| m.as_str().to_string()))
}

/// Split a comma-separated term list, dropping blanks, duplicates and `subject` itself.
pub fn parse_related_terms(reply: &str, subject: &str) -> Vec<String> {
    let mut terms: Vec<String> = Vec::new();
    for term in reply.split([',', '\n']) {
        let term = term.trim().trim_matches(|c: char| c == '"' || c == '\'' || c == '-').trim();
        if term.is_empty() || term.eq_ignore_ascii_case(subject) {
            continue;
        }
        if !terms.iter().any(|seen| seen.eq_ignore_ascii_case(term)) {
            terms.push(term.to_string());
        }
    }
    terms
}

/// Fenced snippets around each line mentioning `subject`.
///
/// Overlapping windows are merged so a dense file does not repeat itself.
pub fn extract_snippets(content: &str, subject: &str) -> Vec<String> {
    let needle = subject.to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }
    let lines: Vec<&str> = content.lines().collect();
    let mut windows: Vec<(usize, usize)> = Vec::new();
    for (idx, line) in lines.iter().enumerate() {
        if !line.to_lowercase().contains(&needle) {
            continue;
        }
        let start = idx.saturating_sub(SNIPPET_CONTEXT_LINES);
        let end = (idx + SNIPPET_CONTEXT_LINES + 1).min(lines.len());
        match windows.last_mut() {
            Some(last) if start <= last.1 => last.1 = end,
            _ => windows.push((start, end)),
        }
    }
    windows
        .into_iter()
        .map(|(start, end)| format!("```\n{}\n```", lines[start..end].join("\n")))
        .collect()
}

/// One file's worth of snippets, as fed to the analysis prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileSnippets {
    pub path: String,
    pub snippets: Vec<String>,
}

pub fn render_context(files: &[FileSnippets]) -> String {
    files
        .iter()
        .filter(|file| !file.snippets.is_empty())
        .map(|file| format!("File: {}\n{}\n", file.path, file.snippets.join("\n\n")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Shrink oversized context to fit [`CONTEXT_CHAR_LIMIT`].
///
/// Files whose path names the subject go first, then the rest while they fit.
pub fn condense_context(files: &[FileSnippets], subject: &str) -> String {
    let needle = subject.to_lowercase();
    let (named, others): (Vec<&FileSnippets>, Vec<&FileSnippets>) = files
        .iter()
        .filter(|file| !file.snippets.is_empty())
        .partition(|file| file.path.to_lowercase().contains(&needle));

    let mut out = String::from("Note: the code context was condensed due to size.\n\n");
    for file in named.into_iter().chain(others) {
        let block = format!("File: {}\n{}\n\n", file.path, file.snippets.join("\n\n"));
        if out.len() + block.len() > CONTEXT_CHAR_LIMIT {
            continue;
        }
        out.push_str(&block);
    }
    out
}
