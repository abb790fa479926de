//! Execution failure classification and reporting.

use crate::core::types::FailureKind;

/// Output markers, checked in order. The first hit wins.
const MARKERS: &[(FailureKind, &[&str])] = &[
    (
        FailureKind::CommandNotFound,
        &["command not found", "not recognized as"],
    ),
    (
        FailureKind::PermissionDenied,
        &["permission denied", "operation not permitted"],
    ),
    (
        FailureKind::NotADirectory,
        &["not a directory"],
    ),
    (
        FailureKind::FileNotFound,
        &["no such file", "not exist", "cannot find"],
    ),
    (
        FailureKind::InvalidOption,
        &["invalid option", "invalid argument", "unrecognized option", "illegal option"],
    ),
    (
        FailureKind::SyntaxError,
        &["syntax error", "unexpected token"],
    ),
];

/// A command that ran (or tried to) and did not succeed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    pub command: String,
    /// Short description: exit status, timeout or spawn error.
    pub reason: String,
    pub exit_code: Option<i32>,
    /// Combined stdout and stderr.
    pub output: String,
    pub timed_out: bool,
}

impl ExecutionFailure {
    pub fn kind(&self) -> FailureKind {
        if self.timed_out {
            return FailureKind::Timeout;
        }
        classify_failure(&format!("{}\n{}", self.reason, self.output))
    }

    /// Text shown to the operator when no retry happens.
    pub fn report(&self) -> String {
        let code = self
            .exit_code
            .map_or_else(|| "none".to_string(), |code| code.to_string());
        format!(
            "Command execution failed: {}\nExit code: {}\nOutput: {}",
            self.reason,
            code,
            self.output.trim_end()
        )
    }
}

/// Classify raw error text by case-insensitive marker search.
pub fn classify_failure(text: &str) -> FailureKind {
    let lowered = text.to_lowercase();
    MARKERS
        .iter()
        .find(|(_, needles)| needles.iter().any(|needle| lowered.contains(needle)))
        .map_or(FailureKind::Unknown, |(kind, _)| *kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_common_shell_errors() {
        let cases = [
            ("bash: lss: command not found", FailureKind::CommandNotFound),
            ("ls: cannot open directory '/root': Permission denied", FailureKind::PermissionDenied),
            ("cat: missing.txt: No such file or directory", FailureKind::FileNotFound),
            ("cd: README.md: Not a directory", FailureKind::NotADirectory),
            ("ls: invalid option -- 'z'", FailureKind::InvalidOption),
            ("bash: -c: line 1: syntax error near unexpected token `)'", FailureKind::SyntaxError),
            ("something odd happened", FailureKind::Unknown),
        ];
        for (text, expected) in cases {
            assert_eq!(classify_failure(text), expected, "{text}");
        }
    }

    #[test]
    fn timeout_wins_over_output_markers() {
        let failure = ExecutionFailure {
            command: "sleep 100".to_string(),
            reason: "timed out after 1s".to_string(),
            exit_code: None,
            output: "permission denied".to_string(),
            timed_out: true,
        };
        assert_eq!(failure.kind(), FailureKind::Timeout);
    }

    #[test]
    fn report_includes_reason_code_and_output() {
        let failure = ExecutionFailure {
            command: "lss".to_string(),
            reason: "exit status 127".to_string(),
            exit_code: Some(127),
            output: "bash: lss: command not found\n".to_string(),
            timed_out: false,
        };
        assert_eq!(
            failure.report(),
            "Command execution failed: exit status 127\nExit code: 127\nOutput: bash: lss: command not found"
        );
        assert_eq!(failure.kind(), FailureKind::CommandNotFound);
    }
}
