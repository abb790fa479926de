//! Test-only fakes for the model, the operator and the shell.
//!
//! Each fake replays a script in order and records what it was asked, so tests
//! can assert on both the outcome and the conversation that produced it.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};

use crate::core::failure::ExecutionFailure;
use crate::core::types::PromptKind;
use crate::error::{GatewayError, GatewayFailure};
use crate::io::console::Operator;
use crate::io::gateway::ModelGateway;
use crate::io::prompt::{Prompt, PromptEngine};
use crate::io::shell::{ExecOutcome, ShellRunner};
use crate::nodes::{RunSettings, Toolkit};

enum Scripted {
    Reply(PromptKind, String),
    Fail(PromptKind, GatewayFailure),
}

/// Replays canned replies, one per prompt, checking the prompt kind.
pub struct ScriptedGateway {
    script: RefCell<VecDeque<Scripted>>,
    seen: RefCell<Vec<Prompt>>,
}

impl ScriptedGateway {
    pub fn new<S: Into<String>>(replies: impl IntoIterator<Item = (PromptKind, S)>) -> Self {
        Self {
            script: RefCell::new(
                replies
                    .into_iter()
                    .map(|(kind, reply)| Scripted::Reply(kind, reply.into()))
                    .collect(),
            ),
            seen: RefCell::new(Vec::new()),
        }
    }

    /// Queue a transport-level failure for the next `kind` prompt.
    pub fn then_fail(self, kind: PromptKind, failure: GatewayFailure) -> Self {
        self.script
            .borrow_mut()
            .push_back(Scripted::Fail(kind, failure));
        self
    }

    /// Scripted steps not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.borrow().len()
    }

    /// Every prompt received, in order.
    pub fn prompts(&self) -> Vec<Prompt> {
        self.seen.borrow().clone()
    }
}

impl ModelGateway for ScriptedGateway {
    fn complete(&self, prompt: &Prompt) -> Result<String> {
        self.seen.borrow_mut().push(prompt.clone());
        let next = self
            .script
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected {} prompt: script exhausted", prompt.kind))?;
        match next {
            Scripted::Reply(kind, reply) if kind == prompt.kind => Ok(reply),
            Scripted::Fail(kind, failure) if kind == prompt.kind => Err(GatewayError {
                stage: kind,
                failure,
            }
            .into()),
            Scripted::Reply(kind, _) | Scripted::Fail(kind, _) => {
                bail!("expected a {kind} prompt, got {}", prompt.kind)
            }
        }
    }
}

/// Answers confirmations from a script and records notices.
#[derive(Default)]
pub struct ScriptedOperator {
    answers: RefCell<VecDeque<bool>>,
    questions: RefCell<Vec<String>>,
    notices: RefCell<Vec<String>>,
}

impl ScriptedOperator {
    pub fn answering(answers: impl IntoIterator<Item = bool>) -> Self {
        Self {
            answers: RefCell::new(answers.into_iter().collect()),
            ..Self::default()
        }
    }

    pub fn questions(&self) -> Vec<String> {
        self.questions.borrow().clone()
    }

    pub fn notices(&self) -> Vec<String> {
        self.notices.borrow().clone()
    }
}

impl Operator for ScriptedOperator {
    fn confirm(&self, question: &str) -> Result<bool> {
        self.questions.borrow_mut().push(question.to_string());
        self.answers
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("unexpected confirmation: {question}"))
    }

    fn notice(&self, message: &str) {
        self.notices.borrow_mut().push(message.to_string());
    }
}

/// Returns scripted outcomes in order and records the commands it was given.
#[derive(Default)]
pub struct ScriptedShell {
    outcomes: RefCell<VecDeque<ExecOutcome>>,
    commands: RefCell<Vec<String>>,
}

impl ScriptedShell {
    pub fn new(outcomes: impl IntoIterator<Item = ExecOutcome>) -> Self {
        Self {
            outcomes: RefCell::new(outcomes.into_iter().collect()),
            commands: RefCell::new(Vec::new()),
        }
    }

    /// Every command succeeds with the given outputs, in order.
    pub fn succeeding<'a>(outputs: impl IntoIterator<Item = &'a str>) -> Self {
        Self::new(outputs.into_iter().map(|output| ExecOutcome::Success {
            output: output.to_string(),
        }))
    }

    /// A nonzero exit the way [`crate::io::shell::SystemShell`] reports it.
    pub fn failure(command: &str, code: i32, output: &str) -> ExecOutcome {
        ExecOutcome::Failure(ExecutionFailure {
            command: command.to_string(),
            reason: format!("exit status {code}"),
            exit_code: Some(code),
            output: output.to_string(),
            timed_out: false,
        })
    }

    pub fn commands(&self) -> Vec<String> {
        self.commands.borrow().clone()
    }
}

impl ShellRunner for ScriptedShell {
    fn run(&self, command: &str, _working_dir: &Path) -> ExecOutcome {
        self.commands.borrow_mut().push(command.to_string());
        self.outcomes.borrow_mut().pop_front().unwrap_or_else(|| {
            ExecOutcome::Failure(ExecutionFailure {
                command: command.to_string(),
                reason: "no scripted outcome".to_string(),
                exit_code: None,
                output: String::new(),
                timed_out: false,
            })
        })
    }
}

/// Owns the fakes a [`Toolkit`] borrows.
pub struct Harness {
    pub gateway: ScriptedGateway,
    pub operator: ScriptedOperator,
    pub shell: ScriptedShell,
    pub settings: RunSettings,
    prompts: PromptEngine,
}

impl Harness {
    /// A harness whose operator refuses to be asked and whose shell has no script.
    pub fn new(gateway: ScriptedGateway) -> Self {
        Self {
            gateway,
            operator: ScriptedOperator::default(),
            shell: ScriptedShell::default(),
            settings: RunSettings::default(),
            prompts: PromptEngine::new().expect("prompt templates"),
        }
    }

    pub fn with_operator(self, operator: ScriptedOperator) -> Self {
        Self { operator, ..self }
    }

    pub fn with_shell(self, shell: ScriptedShell) -> Self {
        Self { shell, ..self }
    }

    pub fn with_settings(self, settings: RunSettings) -> Self {
        Self { settings, ..self }
    }

    pub fn toolkit(&self) -> Toolkit<'_> {
        Toolkit {
            gateway: &self.gateway,
            operator: &self.operator,
            shell: &self.shell,
            prompts: &self.prompts,
            settings: self.settings,
        }
    }
}

/// A temporary directory populated with `files` (relative path, contents).
pub fn workspace_with(files: &[(&str, &str)]) -> Result<tempfile::TempDir> {
    let dir = tempfile::tempdir().context("create temp workspace")?;
    for (relative, contents) in files {
        let path = dir.path().join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create {}", parent.display()))?;
        }
        fs::write(&path, contents).with_context(|| format!("write {}", path.display()))?;
    }
    Ok(dir)
}
