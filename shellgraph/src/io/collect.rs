//! Bounded file-system walks for content collection and code search.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::Pattern;
use tracing::{debug, instrument, warn};
use walkdir::{DirEntry, WalkDir};

use crate::core::types::CollectedEntry;

/// Body marker for files that are not read as text.
pub const BINARY_MARKER: &str = "[binary file]";

/// Files larger than this are never searched by the code analyzer.
pub const CODE_FILE_SIZE_LIMIT: u64 = 1024 * 1024;

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "rst", "csv", "tsv", "json", "yaml", "yml", "toml", "ini", "cfg",
    "conf", "xml", "html", "htm", "css", "scss", "sql", "log", "env", "lock", "go", "rs", "py",
    "js", "ts", "jsx", "tsx", "java", "c", "h", "cpp", "hpp", "cs", "rb", "php", "swift", "kt",
    "scala", "sh", "bash", "zsh", "pl", "ex", "exs", "ml", "lua", "r", "vue", "svelte",
];

const TEXT_FILE_NAMES: &[&str] = &["Makefile", "Dockerfile", "LICENSE", "README", "Justfile"];

const CODE_EXTENSIONS: &[&str] = &[
    "go", "js", "ts", "py", "java", "c", "cpp", "h", "rb", "php", "cs", "rs", "swift", "kt",
    "scala", "sh", "bash", "pl", "ex", "ml",
];

/// Limits for [`collect_entries`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectLimits {
    pub file_count_limit: usize,
    pub file_size_limit_bytes: u64,
}

fn is_visible(entry: &DirEntry) -> bool {
    entry.depth() == 0 || !entry.file_name().to_string_lossy().starts_with('.')
}

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
}

pub fn is_text_file(path: &Path) -> bool {
    if let Some(ext) = extension(path) {
        return TEXT_EXTENSIONS.contains(&ext.as_str());
    }
    path.file_name()
        .map(|name| name.to_string_lossy())
        .is_some_and(|name| TEXT_FILE_NAMES.iter().any(|known| name.starts_with(known)))
}

pub fn is_code_file(path: &Path) -> bool {
    extension(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext.as_str()))
}

fn compile_patterns(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|raw| match Pattern::new(raw) {
            Ok(pattern) => Some(pattern),
            Err(err) => {
                warn!(pattern = %raw, err = %err, "ignoring invalid glob pattern");
                None
            }
        })
        .collect()
}

/// Walk `root` and describe what is there.
///
/// Hidden entries are pruned. Directories are always listed; files are listed
/// only when they match one of `patterns` (or when no patterns are given).
/// Bodies are read when `read_bodies` is set and the file fits the size limit.
#[instrument(skip_all, fields(root = %root.display(), read_bodies, patterns = patterns.len()))]
pub fn collect_entries(
    root: &Path,
    patterns: &[String],
    read_bodies: bool,
    limits: CollectLimits,
) -> Result<Vec<CollectedEntry>> {
    if !root.is_dir() {
        anyhow::bail!("collection root {} is not a directory", root.display());
    }
    let globs = compile_patterns(patterns);
    let mut entries = Vec::new();

    for entry in WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible)
        .filter_map(|e| e.ok())
    {
        if entries.len() >= limits.file_count_limit {
            debug!(limit = limits.file_count_limit, "file count limit reached");
            break;
        }

        let is_dir = entry.file_type().is_dir();
        if !is_dir && !globs.is_empty() {
            let name = entry.file_name().to_string_lossy();
            if !globs.iter().any(|glob| glob.matches(&name)) {
                continue;
            }
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let size = metadata.len();
        let body = (read_bodies && !is_dir && size <= limits.file_size_limit_bytes)
            .then(|| read_body(entry.path()));

        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        entries.push(CollectedEntry {
            path: relative.display().to_string(),
            size,
            is_dir,
            body,
        });
    }

    debug!(collected = entries.len(), "collection finished");
    Ok(entries)
}

fn read_body(path: &Path) -> String {
    if !is_text_file(path) {
        return BINARY_MARKER.to_string();
    }
    match fs::read(path) {
        Ok(bytes) => String::from_utf8(bytes).unwrap_or_else(|_| BINARY_MARKER.to_string()),
        Err(err) => format!("[error reading file: {err}]"),
    }
}

/// Code files under `root` whose name or content mentions `term`, case-insensitively.
#[instrument(skip_all, fields(root = %root.display(), term))]
pub fn find_code_files(root: &Path, term: &str) -> Result<Vec<PathBuf>> {
    let needle = term.to_lowercase();
    if needle.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut found = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_visible)
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() || !is_code_file(entry.path()) {
            continue;
        }
        if entry
            .metadata()
            .ok()
            .is_none_or(|meta| meta.len() > CODE_FILE_SIZE_LIMIT)
        {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_lowercase();
        let mentions = name.contains(&needle)
            || fs::read_to_string(entry.path())
                .map(|content| content.to_lowercase().contains(&needle))
                .unwrap_or(false);
        if mentions {
            found.push(entry.into_path());
        }
    }
    debug!(found = found.len(), "code search finished");
    Ok(found)
}

/// Read a file found by [`find_code_files`].
pub fn read_code_file(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}
