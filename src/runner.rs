//! External tool execution.
//!
//! Every formatter, linter and git query goes through a [`ToolRunner`].
//! The production [`ProcessRunner`] spawns a real process with a timeout;
//! tests substitute [`ScriptedRunner`](crate::testing::ScriptedRunner).

use crate::error::{PremergeError, Result};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::process::Command;
use tracing::debug;

/// One call of an external binary.
///
/// File paths are appended after `args`, so the same invocation shape
/// covers single-file tools and batch tools such as cpplint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub binary: String,
    pub args: Vec<String>,
    pub files: Vec<PathBuf>,
}

impl ToolInvocation {
    /// Create an invocation with no arguments.
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            args: Vec::new(),
            files: Vec::new(),
        }
    }

    /// Append an argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Target a single file.
    #[must_use]
    pub fn file(mut self, file: impl AsRef<Path>) -> Self {
        self.files.push(file.as_ref().to_path_buf());
        self
    }

    /// Target a batch of files.
    #[must_use]
    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.files
            .extend(files.into_iter().map(|f| f.as_ref().to_path_buf()));
        self
    }

    /// Render as a shell-like command line for logs.
    #[must_use]
    pub fn command_line(&self) -> String {
        let mut parts = vec![self.binary.clone()];
        parts.extend(self.args.iter().cloned());
        parts.extend(self.files.iter().map(|f| f.display().to_string()));
        parts.join(" ")
    }
}

/// Normalized outcome of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolResult {
    /// Exit code, `-1` when the process was killed by a signal.
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ToolResult {
    /// Create a successful result with the given stdout.
    pub fn ok(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a result with an explicit exit code.
    pub fn with_exit_code(exit_code: i32) -> Self {
        Self {
            exit_code,
            ..Default::default()
        }
    }

    /// Set stderr.
    #[must_use]
    pub fn with_stderr(mut self, stderr: impl Into<String>) -> Self {
        self.stderr = stderr.into();
        self
    }

    /// Whether the process exited with status 0.
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr, for marker searches and printing.
    #[must_use]
    pub fn combined_output(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// Runs external tools.
///
/// A nonzero exit code is not an error at this layer; callers decide what
/// an exit code means for their tool.
#[async_trait]
pub trait ToolRunner: Send + Sync {
    /// Run the invocation to completion.
    ///
    /// # Errors
    ///
    /// Returns an error if the binary is missing, cannot be spawned, or
    /// exceeds its timeout.
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolResult>;
}

/// Spawns real processes.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    working_dir: PathBuf,
    timeout: Duration,
}

impl ProcessRunner {
    /// Default timeout for each invocation.
    pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

    /// Create a runner that executes tools inside `working_dir`.
    #[must_use]
    pub fn new(working_dir: impl AsRef<Path>) -> Self {
        Self {
            working_dir: working_dir.as_ref().to_path_buf(),
            timeout: Duration::from_secs(Self::DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Set the per-invocation timeout.
    #[must_use]
    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }
}

#[async_trait]
impl ToolRunner for ProcessRunner {
    async fn run(&self, invocation: &ToolInvocation) -> Result<ToolResult> {
        let binary = &invocation.binary;
        // A binary not on PATH is MissingTool, not ToolSpawn.
        let resolved = which::which(binary).map_err(|_| PremergeError::MissingTool {
            tool: binary.clone(),
        })?;

        debug!("running: {}", invocation.command_line());
        let start = Instant::now();

        let child = Command::new(resolved)
            .args(&invocation.args)
            .args(&invocation.files)
            .current_dir(&self.working_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| PremergeError::ToolSpawn {
                tool: binary.clone(),
                message: e.to_string(),
            })?;

        // Dropping the future on timeout kills the child.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| PremergeError::ToolTimeout {
                tool: binary.clone(),
                timeout_secs: self.timeout.as_secs(),
            })?
            .map_err(|e| PremergeError::ToolSpawn {
                tool: binary.clone(),
                message: e.to_string(),
            })?;

        let result = ToolResult {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        debug!(
            "{} exited with {} after {}ms",
            binary,
            result.exit_code,
            start.elapsed().as_millis()
        );

        Ok(result)
    }
}
