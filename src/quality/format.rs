//! In-place formatting without gating, for the `format` command.

use super::adapters::{Black, ClangFormat, Isort};
use super::fix_gate::{ClangFormatFixer, Fixer, PythonFormatter};
use crate::changes::{ChangeQuery, FileSet};
use crate::config::PipelineConfig;
use crate::runner::ToolRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

/// Extension-routed formatters; the first matching route wins.
#[derive(Default)]
pub struct Formatters {
    routes: Vec<(ChangeQuery, Box<dyn Fixer>)>,
}

impl Formatters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Format files matching `query` with `fixer`.
    #[must_use]
    pub fn route(mut self, query: ChangeQuery, fixer: impl Fixer + 'static) -> Self {
        self.routes.push((query, Box::new(fixer)));
        self
    }

    /// clang-format for C-family files, isort then black for Python.
    pub fn from_config(config: &PipelineConfig, runner: Arc<dyn ToolRunner>) -> Self {
        let tools = &config.tools;
        Self::new()
            .route(
                ChangeQuery::new(&config.cpp_extensions),
                ClangFormatFixer::new(ClangFormat::new(&tools.clang_format), runner.clone()),
            )
            .route(
                ChangeQuery::new(&config.python_extensions),
                PythonFormatter::new(Isort::new(&tools.isort), Black::new(&tools.black), runner),
            )
    }

    fn fixer_for(&self, file: &Path) -> Option<&dyn Fixer> {
        self.routes
            .iter()
            .find(|(query, _)| query.matches(file))
            .map(|(_, fixer)| fixer.as_ref())
    }
}

/// Result of formatting a file set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormatSummary {
    pub formatted: usize,
    /// Files with no formatter.
    pub skipped: usize,
    pub failures: Vec<(PathBuf, String)>,
}

impl FormatSummary {
    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.failures.len()
    }

    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Format every file in place, continuing past failures.
pub async fn format_files(files: &FileSet, formatters: &Formatters) -> FormatSummary {
    let mut summary = FormatSummary::default();

    for file in files {
        let Some(fixer) = formatters.fixer_for(file) else {
            summary.skipped += 1;
            continue;
        };

        match fixer.fix(file).await {
            Ok(()) => {
                debug!("{}: formatted {}", fixer.name(), file.display());
                summary.formatted += 1;
            }
            Err(e) => {
                warn!("{}: failed on {}: {}", fixer.name(), file.display(), e);
                summary.failures.push((file.clone(), e.to_string()));
            }
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ToolResult;
    use crate::testing::ScriptedRunner;

    fn files(names: &[&str]) -> FileSet {
        names.iter().map(PathBuf::from).collect()
    }

    #[tokio::test]
    async fn test_routes_by_extension() {
        let runner = Arc::new(ScriptedRunner::new());
        let formatters = Formatters::from_config(&PipelineConfig::default(), runner.clone());

        let summary = format_files(&files(&["a.cpp", "b.py", "c.h", "notes.txt"]), &formatters).await;

        assert_eq!(summary.formatted, 3);
        assert_eq!(summary.skipped, 1);
        assert!(summary.passed());
        assert_eq!(runner.call_count("clang-format"), 2);
        assert_eq!(runner.call_count("isort"), 1);
        assert_eq!(runner.call_count("black"), 1);
        // fix mode only, no dry run
        assert!(runner
            .calls()
            .iter()
            .filter(|c| c.binary == "clang-format")
            .all(|c| c.args == vec!["-i"]));
    }

    #[tokio::test]
    async fn test_failures_are_counted_and_do_not_stop() {
        let runner = Arc::new(ScriptedRunner::new().respond_with("black", None, |inv| {
            if inv.files[0] == Path::new("bad.py") {
                Ok(ToolResult::with_exit_code(123).with_stderr("error: cannot format bad.py"))
            } else {
                Ok(ToolResult::ok(""))
            }
        }));
        let formatters = Formatters::from_config(&PipelineConfig::default(), runner);

        let summary = format_files(&files(&["bad.py", "good.py", "z.cc"]), &formatters).await;

        assert_eq!(summary.failed_count(), 1);
        assert_eq!(summary.failures[0].0, PathBuf::from("bad.py"));
        assert_eq!(summary.formatted, 2);
    }
}
