//! Task verification, goal bookkeeping and routing.

use anyhow::Result;
use minijinja::context;
use tracing::{debug, info, instrument};

use super::Toolkit;
use crate::core::response::{GoalCheck, RouteDecision, TaskVerification};
use crate::core::state::RunState;
use crate::core::types::{NodeType, PromptKind};
use crate::error::RoutingError;
use crate::io::prompt::{TaskView, history_view};

/// Verify the active task, close the run if the goal is met, else pick the next node.
#[instrument(
    skip_all,
    fields(history = state.history().len(), has_task = state.current_task.is_some())
)]
pub fn run(state: &mut RunState, kit: &Toolkit<'_>) -> Result<()> {
    if let Some(task) = state.current_task.as_ref() {
        let verification: TaskVerification = kit.ask_json(
            PromptKind::VerifyTask,
            context! { task => TaskView::from_task(task) },
        )?;
        debug!(
            done = verification.is_task_done,
            explanation = %verification.explanation,
            "task verified"
        );

        if verification.is_task_done {
            state.complete_current_task();
            let check: GoalCheck = kit.ask_json(
                PromptKind::GoalCheck,
                context! {
                    global_goal => &state.global_goal,
                    working_dir => state.working_dir.display().to_string(),
                    history => history_view(state.history()),
                },
            )?;
            debug!(met = check.is_goal_met, explanation = %check.explanation, "goal checked");
            if check.is_goal_met {
                info!(tasks = state.history().len(), "global goal met");
                state.route(NodeType::Terminal);
                return Ok(());
            }
        }
    }

    let decision: RouteDecision = kit.ask_json(
        PromptKind::Route,
        context! {
            input => &state.input,
            global_goal => &state.global_goal,
            working_dir => state.working_dir.display().to_string(),
            history => history_view(state.history()),
            nodes => NodeType::routable().map(NodeType::as_str).collect::<Vec<_>>(),
        },
    )?;
    let next: NodeType = decision.next_node.parse()?;
    if !next.is_routable() {
        return Err(RoutingError::NotRoutable(next).into());
    }
    info!(next = %next, goal = %decision.goal, "routed");

    if next != NodeType::Terminal {
        state.start_task(next, decision.goal);
    }
    state.route(next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;
    use crate::core::types::Task;
    use crate::test_support::{Harness, ScriptedGateway};

    fn state() -> RunState {
        RunState::new("list files", PathBuf::from("/tmp"))
    }

    #[test]
    fn first_visit_routes_and_creates_task() {
        let gateway = ScriptedGateway::new([(
            PromptKind::Route,
            r#"{"next_node": "bash", "goal": "list the files"}"#,
        )]);
        let harness = Harness::new(gateway);
        let mut state = state();

        run(&mut state, &harness.toolkit()).expect("classify");

        assert_eq!(state.next_node, Some(NodeType::Bash));
        assert_eq!(state.current_task, Some(Task::new(NodeType::Bash, "list the files")));
        assert!(state.history().is_empty());
    }

    #[test]
    fn completed_task_and_met_goal_terminates_without_new_task() {
        let gateway = ScriptedGateway::new([
            (PromptKind::VerifyTask, r#"{"is_task_done": true}"#),
            (PromptKind::GoalCheck, r#"{"is_goal_met": true}"#),
        ]);
        let harness = Harness::new(gateway);
        let mut state = state();
        state.start_task(NodeType::Bash, "list the files");
        state.record_result("a.txt");

        run(&mut state, &harness.toolkit()).expect("classify");

        assert_eq!(state.next_node, Some(NodeType::Terminal));
        assert_eq!(state.history().len(), 1);
        assert!(state.history()[0].is_completed);
        assert!(state.current_task.is_none());
        assert_eq!(harness.gateway.remaining(), 0);
    }

    #[test]
    fn completed_task_with_unmet_goal_routes_again() {
        let gateway = ScriptedGateway::new([
            (PromptKind::VerifyTask, r#"{"is_task_done": true}"#),
            (PromptKind::GoalCheck, r#"{"is_goal_met": false}"#),
            (
                PromptKind::Route,
                r#"{"next_node": "formatter", "goal": "tidy output"}"#,
            ),
        ]);
        let harness = Harness::new(gateway);
        let mut state = state();
        state.start_task(NodeType::Bash, "list the files");

        run(&mut state, &harness.toolkit()).expect("classify");

        assert_eq!(state.history().len(), 1);
        assert_eq!(state.next_node, Some(NodeType::Formatter));
        assert_eq!(
            state.current_task.as_ref().map(|t| t.node_type),
            Some(NodeType::Formatter)
        );
    }

    #[test]
    fn unfinished_task_is_replaced_not_archived() {
        let gateway = ScriptedGateway::new([
            (PromptKind::VerifyTask, r#"{"is_task_done": false}"#),
            (
                PromptKind::Route,
                r#"{"next_node": "bash", "goal": "try again"}"#,
            ),
        ]);
        let harness = Harness::new(gateway);
        let mut state = state();
        state.start_task(NodeType::Bash, "list the files");

        run(&mut state, &harness.toolkit()).expect("classify");

        assert!(state.history().is_empty());
        assert_eq!(state.active_goal(), "try again");
    }

    #[test]
    fn unknown_next_node_is_routing_error() {
        let gateway = ScriptedGateway::new([(
            PromptKind::Route,
            r#"{"next_node": "teleport", "goal": "x"}"#,
        )]);
        let harness = Harness::new(gateway);
        let mut state = state();

        let err = run(&mut state, &harness.toolkit()).expect_err("should fail");

        assert_eq!(
            err.downcast_ref::<RoutingError>(),
            Some(&RoutingError::Unknown("teleport".to_string()))
        );
    }

    #[test]
    fn empty_and_non_routable_targets_are_rejected() {
        for (reply, expected) in [
            (r#"{"next_node": "", "goal": "x"}"#, RoutingError::Empty),
            (
                r#"{"next_node": "validation", "goal": "x"}"#,
                RoutingError::NotRoutable(NodeType::Validation),
            ),
            (
                r#"{"next_node": "classifier", "goal": "x"}"#,
                RoutingError::NotRoutable(NodeType::Classifier),
            ),
        ] {
            let harness = Harness::new(ScriptedGateway::new([(PromptKind::Route, reply)]));
            let mut state = state();
            let err = run(&mut state, &harness.toolkit()).expect_err("should fail");
            assert_eq!(err.downcast_ref::<RoutingError>(), Some(&expected));
        }
    }

    #[test]
    fn routing_to_terminal_creates_no_task() {
        let harness = Harness::new(ScriptedGateway::new([(
            PromptKind::Route,
            r#"{"next_node": "terminal", "goal": ""}"#,
        )]));
        let mut state = state();

        run(&mut state, &harness.toolkit()).expect("classify");

        assert_eq!(state.next_node, Some(NodeType::Terminal));
        assert!(state.current_task.is_none());
    }

    #[test]
    fn non_json_reply_is_gateway_parse_error() {
        let harness = Harness::new(ScriptedGateway::new([(PromptKind::Route, "bash please")]));
        let mut state = state();
        let err = run(&mut state, &harness.toolkit()).expect_err("should fail");
        let gateway_err = err
            .downcast_ref::<crate::error::GatewayError>()
            .expect("gateway error");
        assert_eq!(gateway_err.stage, PromptKind::Route);
    }
}
