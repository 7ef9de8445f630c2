//! The check-then-fix-then-fail-if-fixed gate.
//!
//! For every file the gate asks a [`Fixer`] whether the file conforms,
//! records the answer, and then always lets the fixer repair the file. The
//! verdict comes from the answers recorded before any repair, so the tree
//! ends up clean while the commit that was not already clean is still
//! blocked.
//!
//! ```text
//! Unchecked ──check──▶ Clean ──fix──▶ Clean
//!           └────────▶ Dirty ──fix──▶ Clean
//! ```

use super::adapters::{Black, ClangFormat, Isort, ToolReport};
use crate::changes::FileSet;
use crate::error::Result;
use crate::runner::ToolRunner;
use async_trait::async_trait;
use futures::future::join_all;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Fixer Trait
// ============================================================================

/// Something that can tell whether a file conforms and make it conform.
///
/// `fix` must be idempotent: fixing a conforming file leaves it unchanged.
#[async_trait]
pub trait Fixer: Send + Sync {
    /// Short name used in messages.
    fn name(&self) -> &str;

    /// Inspect the file. `would_mutate` marks it non-conformant.
    ///
    /// Mutation-only tools may already rewrite the file here.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying tool fails.
    async fn check(&self, file: &Path) -> Result<ToolReport>;

    /// Bring the file into conformance.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying tool fails.
    async fn fix(&self, file: &Path) -> Result<()>;

    /// Message for a stage with `count` non-conformant files.
    fn failure_message(&self, count: usize) -> String {
        format!("{}: {} file(s) would be reformatted.", self.name(), count)
    }
}

/// clang-format with a dry-run check.
pub struct ClangFormatFixer {
    tool: ClangFormat,
    runner: Arc<dyn ToolRunner>,
}

impl ClangFormatFixer {
    pub fn new(tool: ClangFormat, runner: Arc<dyn ToolRunner>) -> Self {
        Self { tool, runner }
    }
}

#[async_trait]
impl Fixer for ClangFormatFixer {
    fn name(&self) -> &str {
        "clang-format"
    }

    async fn check(&self, file: &Path) -> Result<ToolReport> {
        self.tool.check(self.runner.as_ref(), file).await
    }

    async fn fix(&self, file: &Path) -> Result<()> {
        self.tool.format(self.runner.as_ref(), file).await?;
        Ok(())
    }
}

/// isort followed by black; neither has a side-effect-free check, so the
/// check run already rewrites and is judged by output markers.
pub struct PythonFormatter {
    isort: Isort,
    black: Black,
    runner: Arc<dyn ToolRunner>,
}

impl PythonFormatter {
    pub fn new(isort: Isort, black: Black, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            isort,
            black,
            runner,
        }
    }
}

#[async_trait]
impl Fixer for PythonFormatter {
    fn name(&self) -> &str {
        "black"
    }

    async fn check(&self, file: &Path) -> Result<ToolReport> {
        let sorted = self.isort.run(self.runner.as_ref(), file).await?;
        let formatted = self.black.run(self.runner.as_ref(), file).await?;
        Ok(ToolReport {
            would_mutate: sorted.would_mutate || formatted.would_mutate,
            score: None,
            raw: [sorted.raw, formatted.raw]
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n"),
        })
    }

    async fn fix(&self, file: &Path) -> Result<()> {
        self.isort.run(self.runner.as_ref(), file).await?;
        self.black.run(self.runner.as_ref(), file).await?;
        Ok(())
    }
}

// ============================================================================
// Gate
// ============================================================================

/// Per-file state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Unchecked,
    Clean,
    Dirty,
}

/// What happened to one file.
#[derive(Debug, Clone)]
struct FileRun {
    path: PathBuf,
    at_check: FileState,
    error: Option<String>,
    output: String,
}

/// Result of running a fixer over a file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixGateReport {
    pub checked: usize,
    /// Files that were non-conformant at check time, sorted.
    pub dirty: Vec<PathBuf>,
    /// Files whose tool failed, with the error, sorted.
    pub tool_failures: Vec<(PathBuf, String)>,
    /// Non-empty tool output, one entry per file.
    pub output: Vec<String>,
    /// Human-readable failure description, `None` when passed.
    pub message: Option<String>,
}

impl FixGateReport {
    #[must_use]
    pub fn fixed_count(&self) -> usize {
        self.dirty.len()
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.dirty.is_empty() && self.tool_failures.is_empty()
    }

    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            1
        }
    }
}

/// Runs a [`Fixer`] over every file of a set.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixGate {
    parallel: bool,
}

impl FixGate {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Process files concurrently. Each file still checks before it fixes.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check and fix every file, then judge from the check-time states.
    pub async fn run(&self, files: &FileSet, fixer: &dyn Fixer) -> FixGateReport {
        let runs = if self.parallel {
            join_all(files.iter().map(|f| process_file(fixer, f))).await
        } else {
            let mut runs = Vec::with_capacity(files.len());
            for file in files {
                runs.push(process_file(fixer, file).await);
            }
            runs
        };

        build_report(fixer, runs)
    }
}

async fn process_file(fixer: &dyn Fixer, file: &Path) -> FileRun {
    let mut run = FileRun {
        path: file.to_path_buf(),
        at_check: FileState::Unchecked,
        error: None,
        output: String::new(),
    };

    match fixer.check(file).await {
        Ok(report) => {
            run.at_check = if report.would_mutate {
                FileState::Dirty
            } else {
                FileState::Clean
            };
            run.output = report.raw;
        }
        Err(e) => {
            warn!("{}: check failed for {}: {}", fixer.name(), file.display(), e);
            run.error = Some(e.to_string());
            return run;
        }
    }

    debug!("{}: {} is {:?}", fixer.name(), file.display(), run.at_check);

    if let Err(e) = fixer.fix(file).await {
        warn!("{}: fix failed for {}: {}", fixer.name(), file.display(), e);
        run.error = Some(e.to_string());
    }

    run
}

fn build_report(fixer: &dyn Fixer, mut runs: Vec<FileRun>) -> FixGateReport {
    runs.sort_by(|a, b| a.path.cmp(&b.path));

    let mut report = FixGateReport {
        checked: runs.len(),
        ..Default::default()
    };

    for run in runs {
        if !run.output.trim().is_empty() {
            report.output.push(run.output);
        }
        if run.at_check == FileState::Dirty {
            report.dirty.push(run.path.clone());
        }
        if let Some(error) = run.error {
            report.tool_failures.push((run.path, error));
        }
    }

    let mut lines = Vec::new();
    if !report.dirty.is_empty() {
        lines.push(fixer.failure_message(report.dirty.len()));
        lines.extend(report.dirty.iter().map(|p| format!(" - {}", p.display())));
    }
    if !report.tool_failures.is_empty() {
        lines.push(format!(
            "{}: tool failed on {} file(s):",
            fixer.name(),
            report.tool_failures.len()
        ));
        lines.extend(
            report
                .tool_failures
                .iter()
                .map(|(p, e)| format!(" - {}: {}", p.display(), e)),
        );
    }
    if !lines.is_empty() {
        report.message = Some(lines.join("\n"));
    }

    report
}
