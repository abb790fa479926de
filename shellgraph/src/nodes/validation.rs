//! Safety gate, execution and failure recovery for the pending command.
//!
//! Flow per attempt: static blocklist check, model safety review, optional
//! confirmation, execution. A failed execution may be retried with one
//! model-suggested alternative at a time, up to `max_alternatives`.

use anyhow::{Result, bail};
use minijinja::context;
use tracing::{debug, info, instrument, warn};

use super::Toolkit;
use crate::core::failure::ExecutionFailure;
use crate::core::response::extract_command;
use crate::core::safety::{blocklist_matches, decide, parse_assessment};
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind, SafetyAssessment, SafetyDecision};
use crate::error::GatewayError;
use crate::io::shell::ExecOutcome;

/// Final result when the operator declines a command.
pub const CANCELLED: &str = "Command execution cancelled by user.";

#[instrument(skip_all, fields(command = %state.command))]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    let mut command = state.command.trim().to_string();
    if command.is_empty() {
        bail!("no command to validate");
    }
    let mut alternatives_tried = 0u32;

    loop {
        state.command = command.clone();
        if !approve(&command, state, kit)? {
            info!("operator declined command");
            kit.operator.notice(CANCELLED);
            state.record_result(CANCELLED);
            state.final_result = CANCELLED.to_string();
            state.route(NodeType::Terminal);
            return Ok(());
        }

        let failure = match kit.shell.run(&command, &state.working_dir) {
            ExecOutcome::Success { output } => {
                info!(output_bytes = output.len(), "command succeeded");
                state.record_result(output.clone());
                state.raw_output = output.clone();
                state.final_result = output;
                state.route(NodeType::Classifier);
                return Ok(());
            }
            ExecOutcome::Failure(failure) => failure,
        };

        warn!(reason = %failure.reason, kind = %failure.kind(), "command failed");
        kit.operator.notice(&failure.report());

        if alternatives_tried >= kit.settings.max_alternatives {
            warn!(alternatives_tried, "alternative limit reached");
            return report_failure(state, &failure);
        }
        let Some(alternative) = suggest_alternative(state, &failure, kit)? else {
            return report_failure(state, &failure);
        };
        kit.operator
            .notice(&format!("Suggested alternative: {alternative}"));
        // Asked even under force approval.
        if !kit.operator.confirm("Try the suggested command?")? {
            return report_failure(state, &failure);
        }
        alternatives_tried += 1;
        command = alternative;
    }
}

/// Show the command and decide whether it may run.
fn approve(command: &str, state: &RunState, kit: &Toolkit<'_>) -> Result<bool> {
    kit.operator.notice(&format!("Command: {command}"));
    let hits = blocklist_matches(command);
    if !hits.is_empty() {
        kit.operator.notice(&format!(
            "Warning: command contains potentially dangerous fragments: {}",
            hits.join(", ")
        ));
    }
    if kit.settings.force_approve {
        debug!("force approval, skipping safety review");
        return Ok(decide(None, &hits, true) == SafetyDecision::Execute);
    }

    let assessment = review(command, state, kit)?;
    match &assessment {
        Some(a) => kit.operator.notice(&format!(
            "Safety: {} [{}] {}",
            a.verdict, a.risk_score, a.rationale
        )),
        None => kit
            .operator
            .notice("Safety review unavailable; confirmation required."),
    }

    match decide(assessment.as_ref(), &hits, false) {
        SafetyDecision::Execute => Ok(true),
        SafetyDecision::Confirm => kit.operator.confirm("Execute this command?"),
    }
}

/// Ask the model to rate `command`.
///
/// Gateway failures and unparsable ratings yield `None`; anything else propagates.
fn review(command: &str, state: &RunState, kit: &Toolkit<'_>) -> Result<Option<SafetyAssessment>> {
    let reply = kit.ask(
        PromptKind::SafetyReview,
        context! {
            command => command,
            working_dir => state.working_dir.display().to_string(),
        },
    );
    let reply = match absorb_gateway_error(reply)? {
        Some(reply) => reply,
        None => return Ok(None),
    };
    match parse_assessment(&reply) {
        Ok(assessment) => Ok(Some(assessment)),
        Err(err) => {
            warn!(err = %err, "unusable safety rating");
            Ok(None)
        }
    }
}

/// Ask for one corrected command. `None` when the model has nothing new to offer.
fn suggest_alternative(
    state: &RunState,
    failure: &ExecutionFailure,
    kit: &Toolkit<'_>,
) -> Result<Option<String>> {
    let reply = kit.ask(
        PromptKind::Alternative,
        context! {
            input => &state.input,
            working_dir => state.working_dir.display().to_string(),
            command => &failure.command,
            failure_kind => failure.kind().as_str(),
            error => format!("{}\n{}", failure.reason, failure.output.trim_end()),
        },
    );
    let Some(reply) = absorb_gateway_error(reply)? else {
        return Ok(None);
    };
    let alternative = extract_command(&reply).filter(|alt| alt != failure.command.trim());
    if alternative.is_none() {
        info!("no usable alternative suggested");
    }
    Ok(alternative)
}

/// Turn a gateway failure into `None`; propagate every other error.
fn absorb_gateway_error(reply: Result<String>) -> Result<Option<String>> {
    match reply {
        Ok(reply) => Ok(Some(reply)),
        Err(err) if err.downcast_ref::<GatewayError>().is_some() => {
            warn!(err = %format!("{err:#}"), "model call failed, continuing without it");
            Ok(None)
        }
        Err(err) => Err(err),
    }
}

fn report_failure(state: &mut RunState, failure: &ExecutionFailure) -> Result<()> {
    let report = failure.report();
    state.record_result(report.clone());
    state.raw_output = failure.output.clone();
    state.final_result = report;
    state.route(NodeType::Terminal);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::error::GatewayFailure;
    use crate::nodes::RunSettings;
    use crate::test_support::{Harness, ScriptedGateway, ScriptedOperator, ScriptedShell};

    fn state(command: &str) -> RunState {
        let mut state = RunState::new("list files", PathBuf::from("/tmp"));
        state.start_task(NodeType::Bash, "list files");
        state.command = command.to_string();
        state
    }

    #[test]
    fn safe_clean_command_runs_without_confirmation() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::SafetyReview,
            "SAFE [2] read-only",
        )]))
        .with_shell(ScriptedShell::succeeding(["a.txt\n"]));
        let mut state = state("ls -la");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(state.final_result, "a.txt\n");
        assert_eq!(state.raw_output, "a.txt\n");
        assert_eq!(state.next_node, Some(NodeType::Classifier));
        assert!(harness.operator.questions().is_empty());
        assert_eq!(harness.shell.commands(), ["ls -la"]);
    }

    #[test]
    fn caution_rating_requires_confirmation() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::SafetyReview,
            "CAUTION [5] writes files",
        )]))
        .with_operator(ScriptedOperator::answering([true]))
        .with_shell(ScriptedShell::succeeding([""]));
        let mut state = state("touch x");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.operator.questions().len(), 1);
        assert_eq!(harness.shell.commands(), ["touch x"]);
    }

    #[test]
    fn blocklist_hit_forces_confirmation_even_when_rated_safe() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::SafetyReview,
            "SAFE [1] harmless",
        )]))
        .with_operator(ScriptedOperator::answering([false]));
        let mut state = state("echo hi > out.txt");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(state.final_result, CANCELLED);
        assert_eq!(state.next_node, Some(NodeType::Terminal));
        assert!(harness.shell.commands().is_empty());
        assert!(
            harness
                .operator
                .notices()
                .iter()
                .any(|n| n.starts_with("Warning:") && n.contains(">"))
        );
    }

    #[test]
    fn failed_safety_review_falls_back_to_confirmation() {
        let gateway = ScriptedGateway::new(Vec::<(PromptKind, String)>::new()).then_fail(
            PromptKind::SafetyReview,
            GatewayFailure::Transport("connection reset".to_string()),
        );
        let harness = Harness::new(gateway)
            .with_operator(ScriptedOperator::answering([true]))
            .with_shell(ScriptedShell::succeeding(["ok"]));
        let mut state = state("ls");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.operator.questions().len(), 1);
        assert_eq!(state.final_result, "ok");
    }

    #[test]
    fn unparsable_rating_falls_back_to_confirmation() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::SafetyReview,
            "SAFE [9] contradictory",
        )]))
        .with_operator(ScriptedOperator::answering([false]));
        let mut state = state("ls");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(state.final_result, CANCELLED);
    }

    #[test]
    fn force_approval_skips_review_and_confirmation() {
        let harness = Harness::new(ScriptedGateway::new(Vec::<(PromptKind, String)>::new()))
            .with_shell(ScriptedShell::succeeding(["gone"]))
            .with_settings(RunSettings {
                force_approve: true,
                max_alternatives: 3,
            });
        let mut state = state("rm -rf ./build");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(state.final_result, "gone");
        assert!(harness.gateway.prompts().is_empty());
        assert!(harness.operator.questions().is_empty());
    }

    #[test]
    fn force_approval_still_asks_before_running_an_alternative() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::Alternative,
            "sudo rm -rf ./build",
        )]))
        .with_operator(ScriptedOperator::answering([false]))
        .with_shell(ScriptedShell::new([ScriptedShell::failure(
            "lss",
            127,
            "bash: lss: command not found",
        )]))
        .with_settings(RunSettings {
            force_approve: true,
            max_alternatives: 3,
        });
        let mut state = state("lss");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.operator.questions(), ["Try the suggested command?"]);
        assert_eq!(harness.shell.commands(), ["lss"]);
        assert!(state.final_result.starts_with("Command execution failed"));
        assert_eq!(state.next_node, Some(NodeType::Terminal));
    }

    #[test]
    fn identical_alternative_reports_original_failure() {
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::SafetyReview, "SAFE [2] ok"),
            (PromptKind::Alternative, "lss"),
        ]))
        .with_shell(ScriptedShell::new([ScriptedShell::failure(
            "lss",
            127,
            "bash: lss: command not found",
        )]));
        let mut state = state("lss");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.shell.commands(), ["lss"]);
        assert_eq!(state.next_node, Some(NodeType::Terminal));
        assert!(state.final_result.starts_with("Command execution failed: exit status 127"));
        assert!(harness.operator.questions().is_empty());
    }

    #[test]
    fn alternative_prompt_carries_failure_details() {
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::SafetyReview, "SAFE [2] ok"),
            (PromptKind::Alternative, ""),
        ]))
        .with_shell(ScriptedShell::new([ScriptedShell::failure(
            "cat nope",
            1,
            "cat: nope: No such file or directory",
        )]));
        let mut state = state("cat nope");

        run(&mut state, &harness.toolkit()).expect("validate");

        let prompts = harness.gateway.prompts();
        let alternative = &prompts[1].text;
        assert!(alternative.contains("Original user request: list files"));
        assert!(alternative.contains("Failed command: cat nope"));
        assert!(alternative.contains("Error type: file_not_found"));
        assert!(alternative.contains("No such file or directory"));
    }

    #[test]
    fn accepted_alternative_is_validated_and_run() {
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::SafetyReview, "SAFE [2] ok"),
            (PromptKind::Alternative, "ls"),
            (PromptKind::SafetyReview, "SAFE [1] ok"),
        ]))
        .with_operator(ScriptedOperator::answering([true]))
        .with_shell(ScriptedShell::new([
            ScriptedShell::failure("lss", 127, "bash: lss: command not found"),
            ExecOutcome::Success {
                output: "a.txt\n".to_string(),
            },
        ]));
        let mut state = state("lss");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.shell.commands(), ["lss", "ls"]);
        assert_eq!(state.final_result, "a.txt\n");
        assert_eq!(state.command, "ls");
        assert_eq!(state.next_node, Some(NodeType::Classifier));
    }

    #[test]
    fn declined_alternative_reports_failure() {
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::SafetyReview, "SAFE [2] ok"),
            (PromptKind::Alternative, "ls"),
        ]))
        .with_operator(ScriptedOperator::answering([false]))
        .with_shell(ScriptedShell::new([ScriptedShell::failure(
            "lss",
            127,
            "bash: lss: command not found",
        )]));
        let mut state = state("lss");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.shell.commands(), ["lss"]);
        assert!(state.final_result.starts_with("Command execution failed"));
        assert_eq!(state.next_node, Some(NodeType::Terminal));
    }

    #[test]
    fn alternatives_stop_at_the_configured_limit() {
        let harness = Harness::new(ScriptedGateway::new([
            (PromptKind::SafetyReview, "SAFE [2] ok"),
            (PromptKind::Alternative, "b"),
            (PromptKind::SafetyReview, "SAFE [2] ok"),
        ]))
        .with_operator(ScriptedOperator::answering([true]))
        .with_shell(ScriptedShell::new([
            ScriptedShell::failure("a", 1, "boom"),
            ScriptedShell::failure("b", 1, "boom again"),
        ]))
        .with_settings(RunSettings {
            force_approve: false,
            max_alternatives: 1,
        });
        let mut state = state("a");

        run(&mut state, &harness.toolkit()).expect("validate");

        assert_eq!(harness.shell.commands(), ["a", "b"]);
        assert!(state.final_result.contains("boom again"));
        assert_eq!(state.next_node, Some(NodeType::Terminal));
        assert_eq!(harness.gateway.remaining(), 0);
    }

    #[test]
    fn empty_command_is_an_error() {
        let harness = Harness::new(ScriptedGateway::new(Vec::<(PromptKind, String)>::new()));
        let mut state = state("   ");
        assert!(run(&mut state, &harness.toolkit()).is_err());
    }
}
