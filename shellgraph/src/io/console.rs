//! Operator interaction: notices and yes/no confirmation.
//!
//! Everything here writes to stderr so stdout carries only the final result.

use std::io::{self, BufRead, Write};

use anyhow::{Context, Result};

/// The human at the terminal.
pub trait Operator {
    /// Ask a yes/no question. Only an explicit "y" or "yes" counts as consent.
    fn confirm(&self, question: &str) -> Result<bool>;

    /// Show an informational line.
    fn notice(&self, message: &str);
}

/// Whether a reply line grants consent.
pub fn is_affirmative(reply: &str) -> bool {
    matches!(reply.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Reads answers from stdin, prints to stderr.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinOperator;

impl Operator for StdinOperator {
    fn confirm(&self, question: &str) -> Result<bool> {
        let mut stderr = io::stderr().lock();
        write!(stderr, "{question} [y/N]: ").context("write confirmation prompt")?;
        stderr.flush().context("flush stderr")?;

        let mut line = String::new();
        let read = io::stdin()
            .lock()
            .read_line(&mut line)
            .context("read confirmation")?;
        // EOF is a refusal.
        Ok(read > 0 && is_affirmative(&line))
    }

    fn notice(&self, message: &str) {
        eprintln!("{message}");
    }
}
