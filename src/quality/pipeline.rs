//! Pipeline aggregator.
//!
//! Runs the stages in a fixed order against the files each one locates for
//! itself and sums the failed stages into one verdict. A failing stage never
//! stops the stages after it.

use super::adapters::{Black, ClangFormat, Cpplint, Isort, Pylint};
use super::copyright::{CopyrightStamper, PolicyState};
use super::fix_gate::{ClangFormatFixer, FixGate, FixGateReport, Fixer, PythonFormatter};
use super::lint::{run_cpplint, LintOutcome, LintScorer};
use crate::changes::{ChangeLocator, ChangeQuery, FileSet, VcsBackend};
use crate::config::PipelineConfig;
use crate::runner::ToolRunner;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Printed when every stage passed.
pub const SUCCESS_SUMMARY: &str = "All tasks completed successfully!";

/// One independently scored pipeline phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    Copyright,
    ClangFormat,
    PythonFormat,
    Cpplint,
    Pylint,
}

impl Stage {
    /// Every stage in execution order.
    pub const ALL: [Stage; 5] = [
        Stage::Copyright,
        Stage::ClangFormat,
        Stage::PythonFormat,
        Stage::Cpplint,
        Stage::Pylint,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Stage::Copyright => "copyright",
            Stage::ClangFormat => "clang-format",
            Stage::PythonFormat => "python-format",
            Stage::Cpplint => "cpplint",
            Stage::Pylint => "pylint",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Outcome of one stage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub passed: bool,
    /// Failure description, `None` when passed.
    pub message: Option<String>,
    /// Tool reports printed regardless of the verdict.
    pub details: Vec<String>,
    /// Files the stage ran on.
    pub files: Vec<PathBuf>,
}

impl StageOutcome {
    fn pass(stage: Stage, files: &FileSet) -> Self {
        Self {
            stage,
            passed: true,
            message: None,
            details: Vec::new(),
            files: files.iter().cloned().collect(),
        }
    }

    fn fail(stage: Stage, files: &FileSet, message: impl Into<String>) -> Self {
        Self {
            passed: false,
            message: Some(message.into()),
            ..Self::pass(stage, files)
        }
    }

    fn from_gate(stage: Stage, files: &FileSet, report: FixGateReport) -> Self {
        Self {
            stage,
            passed: report.passed(),
            message: report.message,
            details: report.output,
            files: files.iter().cloned().collect(),
        }
    }

    fn from_lint(stage: Stage, files: &FileSet, outcome: LintOutcome) -> Self {
        Self {
            stage,
            passed: outcome.passed(),
            message: outcome.message,
            details: outcome.reports,
            files: files.iter().cloned().collect(),
        }
    }

    /// 0 when passed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        i32::from(!self.passed)
    }
}

/// Result of a full run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PipelineVerdict {
    pub outcomes: Vec<StageOutcome>,
}

impl PipelineVerdict {
    #[must_use]
    pub fn failed_stage_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.passed).count()
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failed_stage_count() == 0
    }

    /// One-line summary; mentions only the count.
    #[must_use]
    pub fn summary(&self) -> String {
        match self.failed_stage_count() {
            0 => SUCCESS_SUMMARY.to_string(),
            n => format!("{} job(s) failed.", n),
        }
    }
}

/// Stage orchestration over a repository.
pub struct Pipeline {
    config: PipelineConfig,
    repo_root: PathBuf,
    runner: Arc<dyn ToolRunner>,
    locator: ChangeLocator,
    policy: PolicyState,
}

impl Pipeline {
    pub fn new(
        config: PipelineConfig,
        repo_root: impl AsRef<Path>,
        runner: Arc<dyn ToolRunner>,
        vcs: Arc<dyn VcsBackend>,
        policy: PolicyState,
    ) -> Self {
        let repo_root = repo_root.as_ref().to_path_buf();
        Self {
            locator: ChangeLocator::new(&repo_root, vcs),
            config,
            repo_root,
            runner,
            policy,
        }
    }

    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn cpp_query(&self) -> ChangeQuery {
        ChangeQuery::new(&self.config.cpp_extensions)
    }

    fn python_query(&self) -> ChangeQuery {
        ChangeQuery::new(&self.config.python_extensions)
    }

    fn gate(&self) -> FixGate {
        FixGate::new().with_parallel(self.config.parallel_files)
    }

    /// Run every stage in order.
    pub async fn run_all(&self) -> PipelineVerdict {
        let mut verdict = PipelineVerdict::default();
        for stage in Stage::ALL {
            verdict.outcomes.push(self.run_stage(stage).await);
        }
        info!("pipeline finished: {}", verdict.summary());
        verdict
    }

    /// Run one stage against the files it locates.
    pub async fn run_stage(&self, stage: Stage) -> StageOutcome {
        let query = match stage {
            Stage::Copyright => ChangeQuery::new(self.config.all_extensions()),
            Stage::ClangFormat | Stage::Cpplint => self.cpp_query(),
            Stage::PythonFormat | Stage::Pylint => self.python_query(),
        };
        let files = self.locator.locate(&query).await;
        info!("stage {}: {} file(s)", stage, files.len());

        if files.is_empty() {
            return StageOutcome::pass(stage, &files);
        }

        let tools = &self.config.tools;
        let outcome = match stage {
            Stage::Copyright => match &self.policy {
                PolicyState::Ready(policy) => {
                    let stamper =
                        CopyrightStamper::new(&self.repo_root, policy.clone(), self.cpp_query());
                    self.run_gate(stage, &files, &stamper).await
                }
                PolicyState::Unavailable(reason) => {
                    StageOutcome::fail(stage, &files, format!("copyright: {}", reason))
                }
            },
            Stage::ClangFormat => {
                let fixer = ClangFormatFixer::new(
                    ClangFormat::new(&tools.clang_format),
                    self.runner.clone(),
                );
                self.run_gate(stage, &files, &fixer).await
            }
            Stage::PythonFormat => {
                let fixer = PythonFormatter::new(
                    Isort::new(&tools.isort),
                    Black::new(&tools.black),
                    self.runner.clone(),
                );
                self.run_gate(stage, &files, &fixer).await
            }
            Stage::Cpplint => {
                let outcome =
                    run_cpplint(&Cpplint::new(&tools.cpplint), self.runner.as_ref(), &files).await;
                StageOutcome::from_lint(stage, &files, outcome)
            }
            Stage::Pylint => {
                let outcome = LintScorer::new(Pylint::new(&tools.pylint), self.runner.clone())
                    .with_threshold(self.config.lint_threshold)
                    .run(&files)
                    .await;
                StageOutcome::from_lint(stage, &files, outcome)
            }
        };

        info!(
            "stage {}: {}",
            stage,
            if outcome.passed { "passed" } else { "failed" }
        );
        outcome
    }

    async fn run_gate(&self, stage: Stage, files: &FileSet, fixer: &dyn Fixer) -> StageOutcome {
        let report = self.gate().run(files, fixer).await;
        StageOutcome::from_gate(stage, files, report)
    }
}
