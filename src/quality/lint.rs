//! Linting stages: threshold-scored pylint and batch cpplint.

use super::adapters::{Cpplint, Pylint};
use crate::changes::FileSet;
use crate::config::DEFAULT_LINT_THRESHOLD;
use crate::error::PremergeError;
use crate::runner::ToolRunner;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, warn};

/// Why one file failed linting.
#[derive(Debug, Clone, PartialEq)]
pub enum LintFailure {
    /// Scored below the threshold.
    BelowThreshold { score: f64 },
    /// The report had no score line.
    MissingScore,
    /// The linter itself failed.
    Tool(String),
}

impl std::fmt::Display for LintFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BelowThreshold { score } => write!(f, "scored {:.2}", score),
            Self::MissingScore => write!(f, "no score in report"),
            Self::Tool(message) => write!(f, "{}", message),
        }
    }
}

/// Result of linting a file set.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LintOutcome {
    pub linted: usize,
    /// Failing files with the reason, in file order.
    pub failures: Vec<(PathBuf, LintFailure)>,
    /// Full report of every file, in file order.
    pub reports: Vec<String>,
    pub message: Option<String>,
}

impl LintOutcome {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Runs pylint per file and compares each score to a threshold.
pub struct LintScorer {
    pylint: Pylint,
    runner: Arc<dyn ToolRunner>,
    threshold: f64,
}

impl LintScorer {
    pub fn new(pylint: Pylint, runner: Arc<dyn ToolRunner>) -> Self {
        Self {
            pylint,
            runner,
            threshold: DEFAULT_LINT_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Lint every file. A file fails when its score is below the threshold
    /// or cannot be read from the report.
    pub async fn run(&self, files: &FileSet) -> LintOutcome {
        let mut outcome = LintOutcome::default();

        for file in files {
            outcome.linted += 1;
            match self.pylint.run(self.runner.as_ref(), file).await {
                Ok(report) => {
                    outcome.reports.push(report.raw);
                    match report.score {
                        Some(score) if score >= self.threshold => {
                            debug!("pylint: {} scored {:.2}", file.display(), score);
                        }
                        Some(score) => {
                            outcome
                                .failures
                                .push((file.clone(), LintFailure::BelowThreshold { score }));
                        }
                        None => {
                            let err = PremergeError::malformed(
                                "pylint",
                                format!("no score line for {}", file.display()),
                            );
                            warn!("{}", err);
                            outcome.failures.push((file.clone(), LintFailure::MissingScore));
                        }
                    }
                }
                Err(e) => {
                    warn!("pylint failed on {}: {}", file.display(), e);
                    outcome
                        .failures
                        .push((file.clone(), LintFailure::Tool(e.to_string())));
                }
            }
        }

        if !outcome.failures.is_empty() {
            let mut lines = vec![format!(
                "pylint: {} file(s) failed (threshold {:.2}):",
                outcome.failures.len(),
                self.threshold
            )];
            lines.extend(
                outcome
                    .failures
                    .iter()
                    .map(|(p, reason)| format!(" - {}: {}", p.display(), reason)),
            );
            outcome.message = Some(lines.join("\n"));
        }

        outcome
    }
}

/// Run cpplint once over all files.
///
/// An empty set passes without invoking the tool.
pub async fn run_cpplint(cpplint: &Cpplint, runner: &dyn ToolRunner, files: &FileSet) -> LintOutcome {
    let mut outcome = LintOutcome {
        linted: files.len(),
        ..Default::default()
    };
    if files.is_empty() {
        return outcome;
    }

    let paths: Vec<&PathBuf> = files.iter().collect();
    match cpplint.run(runner, &paths).await {
        Ok(report) if report.passed => {
            outcome.reports.push(report.raw);
        }
        Ok(report) => {
            let mut lines = vec!["cpplint: Linting failed with the following messages:".to_string()];
            lines.extend(report.messages.iter().map(|m| format!(" - {}", m)));
            outcome.message = Some(lines.join("\n"));
            outcome.failures.extend(
                paths
                    .iter()
                    .filter(|p| {
                        let name = p.to_string_lossy();
                        report.messages.iter().any(|m| m.starts_with(name.as_ref()))
                    })
                    .map(|p| {
                        (
                            (*p).clone(),
                            LintFailure::Tool("cpplint findings".to_string()),
                        )
                    }),
            );
            if outcome.failures.is_empty() {
                outcome.failures.push((
                    PathBuf::new(),
                    LintFailure::Tool("cpplint exited nonzero".to_string()),
                ));
            }
            outcome.reports.push(report.raw);
        }
        Err(e) => {
            warn!("cpplint failed: {}", e);
            outcome.message = Some(format!("cpplint: {}", e));
            outcome
                .failures
                .push((PathBuf::new(), LintFailure::Tool(e.to_string())));
        }
    }

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolResult;
    use crate::testing::ScriptedRunner;
    use std::path::Path;

    fn scorer(runner: ScriptedRunner) -> LintScorer {
        LintScorer::new(Pylint::new("pylint"), Arc::new(runner))
    }

    fn rated(score: &str) -> ToolResult {
        ToolResult::ok(format!(
            "------------------------------------\nYour code has been rated at {}/10\n",
            score
        ))
    }

    fn files(names: &[&str]) -> FileSet {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_below_threshold_fails() {
        let outcome = scorer(ScriptedRunner::new().respond("pylint", None, rated("7.50")))
            .run(&files(&["a.py"]))
            .await;
        assert!(!outcome.passed());
        assert_eq!(
            outcome.failures[0].1,
            LintFailure::BelowThreshold { score: 7.5 }
        );
        assert!(outcome.message.unwrap().contains(" - a.py: scored 7.50"));
    }

    #[tokio::test]
    async fn test_at_threshold_passes() {
        let outcome = scorer(ScriptedRunner::new().respond("pylint", None, rated("8.00")))
            .run(&files(&["a.py"]))
            .await;
        assert!(outcome.passed());
        assert!(outcome.message.is_none());
        assert_eq!(outcome.reports.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_score_fails_closed() {
        let runner = ScriptedRunner::new().respond(
            "pylint",
            None,
            ToolResult::ok("************* Module a\na.py:1:0: E0001: syntax-error"),
        );
        let outcome = scorer(runner).run(&files(&["a.py"])).await;
        assert_eq!(outcome.failures[0].1, LintFailure::MissingScore);
    }

    #[tokio::test]
    async fn test_every_file_linted_without_short_circuit() {
        let runner = ScriptedRunner::new().respond_with("pylint", None, |inv| {
            if inv.files[0] == Path::new("a.py") {
                Ok(rated("3.00"))
            } else {
                Ok(rated("9.50"))
            }
        });
        let runner = Arc::new(runner);
        let outcome = LintScorer::new(Pylint::new("pylint"), runner.clone())
            .run(&files(&["a.py", "b.py", "c.py"]))
            .await;

        assert_eq!(runner.call_count("pylint"), 3);
        assert_eq!(outcome.linted, 3);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.reports.len(), 3);
    }

    #[tokio::test]
    async fn test_custom_threshold() {
        let outcome = scorer(ScriptedRunner::new().respond("pylint", None, rated("7.50")))
            .with_threshold(7.0)
            .run(&files(&["a.py"]))
            .await;
        assert!(outcome.passed());
    }

    #[tokio::test]
    async fn test_pylint_spawn_failure_fails_file() {
        let outcome = scorer(ScriptedRunner::new().fail("pylint", None, "not installed"))
            .run(&files(&["a.py"]))
            .await;
        assert!(matches!(outcome.failures[0].1, LintFailure::Tool(_)));
    }

    #[tokio::test]
    async fn test_cpplint_empty_set_skips_tool() {
        let runner = ScriptedRunner::new();
        let outcome = run_cpplint(&Cpplint::new("cpplint"), &runner, &FileSet::new()).await;
        assert!(outcome.passed());
        assert_eq!(runner.call_count("cpplint"), 0);
    }

    #[tokio::test]
    async fn test_cpplint_failure_message() {
        let runner = ScriptedRunner::new().respond(
            "cpplint",
            None,
            ToolResult::with_exit_code(1).with_stderr(
                "a.cpp:3:  Missing space before {  [whitespace/braces] [5]\nDone processing a.cpp\nTotal errors found: 1\n",
            ),
        );
        let outcome =
            run_cpplint(&Cpplint::new("cpplint"), &runner, &files(&["a.cpp", "b.h"])).await;

        assert!(!outcome.passed());
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].0, PathBuf::from("a.cpp"));
        let message = outcome.message.unwrap();
        assert!(message.starts_with("cpplint: Linting failed with the following messages:\n"));
        assert!(message.contains(" - a.cpp:3:  Missing space before {"));
        assert!(message.contains(" - Total errors found: 1"));
        assert_eq!(runner.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_cpplint_clean() {
        let runner = ScriptedRunner::new().respond(
            "cpplint",
            None,
            ToolResult::ok("").with_stderr("Done processing a.cpp\n"),
        );
        let outcome = run_cpplint(&Cpplint::new("cpplint"), &runner, &files(&["a.cpp"])).await;
        assert!(outcome.passed());
    }
}
