//! Mock implementations of the external seams.
//!
//! These mocks provide controllable test doubles for the tool runner, the
//! VCS backend and the owner prompt, enabling deterministic unit tests.

use crate::changes::VcsBackend;
use crate::error::{PremergeError, Result};
use crate::quality::copyright::OwnerPrompt;
use crate::runner::{ToolInvocation, ToolResult, ToolRunner};
use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

type Responder = Box<dyn Fn(&ToolInvocation) -> Result<ToolResult> + Send + Sync>;

struct Rule {
    binary: String,
    arg: Option<String>,
    respond: Responder,
}

impl Rule {
    fn matches(&self, invocation: &ToolInvocation) -> bool {
        invocation.binary == self.binary
            && self
                .arg
                .as_ref()
                .map_or(true, |a| invocation.args.iter().any(|x| x == a))
    }
}

/// Tool runner that answers from a script instead of spawning processes.
///
/// Rules are tried in the order they were added; the first rule whose
/// binary matches (and whose argument, when given, is present) answers.
/// Unmatched invocations succeed with empty output.
///
/// # Example
///
/// ```rust,ignore
/// let runner = ScriptedRunner::new()
///     .respond("black", None, ToolResult::ok("reformatted a.py"))
///     .fail("pylint", None, "not installed");
/// ```
#[derive(Default)]
pub struct ScriptedRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<ToolInvocation>>,
}

impl ScriptedRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer matching invocations with a fixed result.
    #[must_use]
    pub fn respond(self, binary: &str, arg: Option<&str>, result: ToolResult) -> Self {
        self.respond_with(binary, arg, move |_| Ok(result.clone()))
    }

    /// Answer matching invocations with a closure, which may touch the
    /// filesystem to emulate a formatter.
    #[must_use]
    pub fn respond_with<F>(mut self, binary: &str, arg: Option<&str>, respond: F) -> Self
    where
        F: Fn(&ToolInvocation) -> Result<ToolResult> + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            binary: binary.to_string(),
            arg: arg.map(str::to_string),
            respond: Box::new(respond),
        });
        self
    }

    /// Make matching invocations fail as if the process could not start.
    #[must_use]
    pub fn fail(self, binary: &str, arg: Option<&str>, message: &str) -> Self {
        let tool = binary.to_string();
        let message = message.to_string();
        self.respond_with(binary, arg, move |_| {
            Err(PremergeError::ToolSpawn {
                tool: tool.clone(),
                message: message.clone(),
            })
        })
    }

    /// Every invocation seen so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<ToolInvocation> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of invocations of `binary`.
    #[must_use]
    pub fn call_count(&self, binary: &str) -> usize {
        self.calls().iter().filter(|c| c.binary == binary).count()
    }
}

#[async_trait]
impl ToolRunner for ScriptedRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(invocation.clone());
        }

        match self.rules.iter().find(|r| r.matches(invocation)) {
            Some(rule) => (rule.respond)(invocation),
            None => Ok(ToolResult::default()),
        }
    }
}

/// VCS backend with canned answers.
#[derive(Debug, Clone)]
pub struct MockVcs {
    status: Vec<String>,
    last_commit: Vec<String>,
    branch: String,
    error: Option<String>,
}

impl Default for MockVcs {
    fn default() -> Self {
        Self {
            status: Vec::new(),
            last_commit: Vec::new(),
            branch: "feature".to_string(),
            error: None,
        }
    }
}

impl MockVcs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the porcelain status lines.
    #[must_use]
    pub fn with_status<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.status = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the last commit's file list.
    #[must_use]
    pub fn with_last_commit<I, S>(mut self, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.last_commit = lines.into_iter().map(Into::into).collect();
        self
    }

    /// Set the current branch name.
    #[must_use]
    pub fn with_branch(mut self, branch: &str) -> Self {
        self.branch = branch.to_string();
        self
    }

    /// Make every query fail.
    #[must_use]
    pub fn failing(mut self, message: &str) -> Self {
        self.error = Some(message.to_string());
        self
    }

    fn check(&self, operation: &str) -> Result<()> {
        match &self.error {
            Some(message) => Err(PremergeError::git(operation, message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl VcsBackend for MockVcs {
    async fn status_lines(&self) -> Result<Vec<String>> {
        self.check("status")?;
        Ok(self.status.clone())
    }

    async fn last_commit_files(&self) -> Result<Vec<String>> {
        self.check("log")?;
        Ok(self.last_commit.clone())
    }

    async fn current_branch(&self) -> Result<String> {
        self.check("rev-parse")?;
        Ok(self.branch.clone())
    }
}

/// Owner prompt with a fixed answer.
#[derive(Debug, Default)]
pub struct MockPrompt {
    answer: Option<String>,
    asked: AtomicU32,
}

impl MockPrompt {
    /// Prompt that answers with `owner`.
    #[must_use]
    pub fn answering(owner: &str) -> Self {
        Self {
            answer: Some(owner.to_string()),
            asked: AtomicU32::new(0),
        }
    }

    /// Prompt that cannot be answered (no terminal).
    #[must_use]
    pub fn unavailable() -> Self {
        Self::default()
    }

    /// How many times the prompt was shown.
    #[must_use]
    pub fn times_asked(&self) -> u32 {
        self.asked.load(Ordering::SeqCst)
    }
}

impl OwnerPrompt for MockPrompt {
    fn ask(&self, _message: &str) -> Result<String> {
        self.asked.fetch_add(1, Ordering::SeqCst);
        self.answer
            .clone()
            .ok_or_else(|| PremergeError::owner_unavailable("no interactive input"))
    }
}
