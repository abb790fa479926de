//! Static and model-assisted command safety checks.
//!
//! The blocklist is a coarse substring heuristic. It only ever escalates a
//! command to interactive confirmation; it is not a sandbox.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

use crate::core::types::{SafetyAssessment, SafetyDecision, Verdict};

/// Fragments that force confirmation when found anywhere in a command.
pub const BLOCKLIST: &[&str] = &[
    // deletion
    "rm -rf",
    "rm -r",
    "rmdir",
    // permissions and ownership
    "chmod",
    "chown",
    // privilege escalation
    "sudo",
    "su ",
    // raw disk tools
    "dd if=",
    "mkfs",
    "fdisk",
    // fork bomb
    ":(){:|:&};:",
    ":(){ :|:& };:",
    // power state
    "shutdown",
    "reboot",
    "poweroff",
    // output redirection
    ">",
    ">>",
    "2>",
    // moves and copies rooted at /
    "mv /",
    "cp /",
    // package management
    "apt",
    "yum",
    "pacman",
    "dnf",
    "zypper",
];

/// Return every blocklisted fragment contained in `command`, case-insensitively.
pub fn blocklist_matches(command: &str) -> Vec<&'static str> {
    let lowered = command.to_lowercase();
    BLOCKLIST
        .iter()
        .copied()
        .filter(|fragment| lowered.contains(fragment))
        .collect()
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AssessmentError {
    #[error("no SAFE/CAUTION/DANGEROUS rating found")]
    Missing,
    #[error("risk score {score} is outside 1-10")]
    OutOfRange { score: u32 },
    #[error("risk score {score} does not match verdict {verdict}")]
    BandMismatch { verdict: Verdict, score: u8 },
}

static RATING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(SAFE|CAUTION|DANGEROUS)\b\s*[:\-]?\s*\[?\s*(\d{1,4})\s*\]?")
        .expect("rating regex is valid")
});

/// Parse a model rating such as `SAFE [2] lists files`.
///
/// The first rating in the text wins. Scores outside 1-10, or outside the band
/// of the stated verdict, are rejected rather than clamped.
pub fn parse_assessment(text: &str) -> Result<SafetyAssessment, AssessmentError> {
    let caps = RATING_RE.captures(text).ok_or(AssessmentError::Missing)?;
    let (Some(whole), Some(label), Some(digits)) = (caps.get(0), caps.get(1), caps.get(2)) else {
        return Err(AssessmentError::Missing);
    };

    let verdict = match label.as_str().to_ascii_uppercase().as_str() {
        "SAFE" => Verdict::Safe,
        "CAUTION" => Verdict::Caution,
        _ => Verdict::Dangerous,
    };
    let score: u32 = digits
        .as_str()
        .parse()
        .map_err(|_| AssessmentError::Missing)?;
    let score = u8::try_from(score)
        .ok()
        .filter(|s| (1..=10).contains(s))
        .ok_or(AssessmentError::OutOfRange { score })?;
    let (low, high) = verdict.band();
    if !(low..=high).contains(&score) {
        return Err(AssessmentError::BandMismatch { verdict, score });
    }

    let rationale = text[whole.end()..]
        .trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ':' | '-' | '.' | ','))
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(SafetyAssessment {
        verdict,
        risk_score: score,
        rationale,
    })
}

/// Decide whether a command may run without asking the operator.
///
/// Auto-execution requires a SAFE rating and a clean blocklist; every other
/// combination, including a missing rating, asks first. `force` overrides all.
pub fn decide(
    assessment: Option<&SafetyAssessment>,
    blocklist_hits: &[&str],
    force: bool,
) -> SafetyDecision {
    if force {
        return SafetyDecision::Execute;
    }
    match assessment {
        Some(a) if a.verdict == Verdict::Safe && blocklist_hits.is_empty() => {
            SafetyDecision::Execute
        }
        _ => SafetyDecision::Confirm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assessment(verdict: Verdict, risk_score: u8) -> SafetyAssessment {
        SafetyAssessment {
            verdict,
            risk_score,
            rationale: String::new(),
        }
    }

    #[test]
    fn parses_safe_with_brackets() {
        let a = parse_assessment("SAFE [2] Lists directory contents.").expect("parse");
        assert_eq!(a.verdict, Verdict::Safe);
        assert_eq!(a.risk_score, 2);
        assert_eq!(a.rationale, "Lists directory contents.");
    }

    #[test]
    fn parses_dangerous_without_brackets_case_insensitive() {
        let a = parse_assessment("dangerous 9 - wipes the disk").expect("parse");
        assert_eq!(a.verdict, Verdict::Dangerous);
        assert_eq!(a.risk_score, 9);
        assert_eq!(a.rationale, "wipes the disk");
    }

    #[test]
    fn parses_ten_as_dangerous() {
        let a = parse_assessment("DANGEROUS [10]").expect("parse");
        assert_eq!(a.risk_score, 10);
        assert_eq!(a.rationale, "");
    }

    #[test]
    fn rejects_out_of_range_scores() {
        assert_eq!(
            parse_assessment("DANGEROUS [11]"),
            Err(AssessmentError::OutOfRange { score: 11 })
        );
        assert_eq!(
            parse_assessment("SAFE [0]"),
            Err(AssessmentError::OutOfRange { score: 0 })
        );
        assert_eq!(
            parse_assessment("SAFE [9999]"),
            Err(AssessmentError::OutOfRange { score: 9999 })
        );
    }

    #[test]
    fn rejects_score_outside_verdict_band() {
        assert_eq!(
            parse_assessment("SAFE [8] looks fine"),
            Err(AssessmentError::BandMismatch {
                verdict: Verdict::Safe,
                score: 8
            })
        );
    }

    #[test]
    fn rejects_text_without_rating() {
        assert_eq!(parse_assessment("looks fine to me"), Err(AssessmentError::Missing));
        assert_eq!(parse_assessment("UNSAFE [2]"), Err(AssessmentError::Missing));
    }

    #[test]
    fn blocklist_is_case_insensitive() {
        assert_eq!(blocklist_matches("SUDO ls"), vec!["sudo"]);
        assert!(blocklist_matches("ls -la").is_empty());
    }

    #[test]
    fn blocklist_reports_all_fragments() {
        let hits = blocklist_matches("rm -rf /tmp/x");
        assert_eq!(hits, vec!["rm -rf", "rm -r"]);
        let hits = blocklist_matches("echo hi >> log");
        assert_eq!(hits, vec![">", ">>"]);
    }

    #[test]
    fn decide_executes_only_clean_safe_commands() {
        let safe = assessment(Verdict::Safe, 2);
        let caution = assessment(Verdict::Caution, 5);
        assert_eq!(decide(Some(&safe), &[], false), SafetyDecision::Execute);
        assert_eq!(decide(Some(&safe), &["sudo"], false), SafetyDecision::Confirm);
        assert_eq!(decide(Some(&caution), &[], false), SafetyDecision::Confirm);
        assert_eq!(decide(None, &[], false), SafetyDecision::Confirm);
    }

    #[test]
    fn decide_force_overrides_everything() {
        let dangerous = assessment(Verdict::Dangerous, 9);
        assert_eq!(decide(Some(&dangerous), &["rm -rf"], true), SafetyDecision::Execute);
        assert_eq!(decide(None, &[], true), SafetyDecision::Execute);
    }
}
