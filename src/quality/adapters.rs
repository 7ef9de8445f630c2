//! Adapters for the external formatters and linters.
//!
//! Each adapter knows how to invoke one tool and how to read its output.
//! The textual markers below are contracts with specific tool versions;
//! when a tool changes its wording, only its adapter changes.
//!
//! | Tool | Marker |
//! |------|--------|
//! | clang-format | `<replacement ` in `-output-replacements-xml` output |
//! | isort | `Fixing ` |
//! | black | `reformatted` |
//! | pylint | `Your code has been rated at <value>/<max>` |

use crate::error::{PremergeError, Result};
use crate::runner::{ToolInvocation, ToolResult, ToolRunner};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

/// Present in clang-format's XML output once per pending edit.
pub const CLANG_FORMAT_REPLACEMENT_MARKER: &str = "<replacement ";

/// isort prints this before the name of each file it rewrites.
pub const ISORT_FIXING_MARKER: &str = "Fixing ";

/// black reports `reformatted <file>` and `N file(s) reformatted`.
pub const BLACK_REFORMATTED_MARKER: &str = "reformatted";

/// Phrase preceding pylint's `<value>/<max>` score.
pub const PYLINT_SCORE_PHRASE: &str = "Your code has been rated at";

/// Typed reading of one tool run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolReport {
    /// The tool judged the file non-conformant.
    pub would_mutate: bool,
    /// Numeric score, for scoring linters.
    pub score: Option<f64>,
    /// Everything the tool printed.
    pub raw: String,
}

impl ToolReport {
    fn from_marker(result: &ToolResult, marker: &str) -> Self {
        let raw = result.combined_output();
        Self {
            would_mutate: raw.contains(marker),
            score: None,
            raw,
        }
    }
}

fn require_success(tool: &str, result: ToolResult) -> Result<ToolResult> {
    if result.success() {
        Ok(result)
    } else {
        let detail = if result.stderr.trim().is_empty() {
            result.stdout.trim().to_string()
        } else {
            result.stderr.trim().to_string()
        };
        Err(PremergeError::tool_failed(tool, result.exit_code, detail))
    }
}

// ============================================================================
// clang-format
// ============================================================================

/// clang-format: supports a real dry run.
#[derive(Debug, Clone)]
pub struct ClangFormat {
    binary: String,
}

impl ClangFormat {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Report pending replacements without touching the file.
    ///
    /// # Errors
    ///
    /// Returns an error if clang-format cannot run or exits nonzero.
    pub async fn check(&self, runner: &dyn ToolRunner, file: &Path) -> Result<ToolReport> {
        let invocation = ToolInvocation::new(&self.binary)
            .arg("-output-replacements-xml")
            .file(file);
        let result = require_success(&self.binary, runner.run(&invocation).await?)?;
        Ok(ToolReport::from_marker(
            &result,
            CLANG_FORMAT_REPLACEMENT_MARKER,
        ))
    }

    /// Rewrite the file in place.
    ///
    /// # Errors
    ///
    /// Returns an error if clang-format cannot run or exits nonzero.
    pub async fn format(&self, runner: &dyn ToolRunner, file: &Path) -> Result<ToolReport> {
        let invocation = ToolInvocation::new(&self.binary).arg("-i").file(file);
        let result = require_success(&self.binary, runner.run(&invocation).await?)?;
        Ok(ToolReport {
            raw: result.combined_output(),
            ..Default::default()
        })
    }
}

// ============================================================================
// isort / black
// ============================================================================

/// isort: mutates on every run, reports changes with a marker.
#[derive(Debug, Clone)]
pub struct Isort {
    binary: String,
}

impl Isort {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Sort imports in place.
    ///
    /// # Errors
    ///
    /// Returns an error if isort cannot run or exits nonzero.
    pub async fn run(&self, runner: &dyn ToolRunner, file: &Path) -> Result<ToolReport> {
        let invocation = ToolInvocation::new(&self.binary).file(file);
        let result = require_success(&self.binary, runner.run(&invocation).await?)?;
        Ok(ToolReport::from_marker(&result, ISORT_FIXING_MARKER))
    }
}

/// black: mutates on every run, reports changes with a marker.
#[derive(Debug, Clone)]
pub struct Black {
    binary: String,
}

impl Black {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Reformat in place.
    ///
    /// # Errors
    ///
    /// Returns an error if black cannot run or exits nonzero (123 is its
    /// internal error status).
    pub async fn run(&self, runner: &dyn ToolRunner, file: &Path) -> Result<ToolReport> {
        let invocation = ToolInvocation::new(&self.binary).file(file);
        let result = require_success(&self.binary, runner.run(&invocation).await?)?;
        Ok(ToolReport::from_marker(&result, BLACK_REFORMATTED_MARKER))
    }
}

// ============================================================================
// pylint
// ============================================================================

/// A pylint score such as `7.50/10`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LintScore {
    pub value: f64,
    pub max: f64,
}

fn score_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Your code has been rated at\s+(-?\d+(?:\.\d+)?)/(\d+(?:\.\d+)?)").ok()
    })
    .as_ref()
}

/// Find the score line in a pylint report.
#[must_use]
pub fn parse_score(report: &str) -> Option<LintScore> {
    let re = score_regex()?;
    report
        .lines()
        .filter(|line| line.contains(PYLINT_SCORE_PHRASE))
        .find_map(|line| {
            let caps = re.captures(line)?;
            Some(LintScore {
                value: caps.get(1)?.as_str().parse().ok()?,
                max: caps.get(2)?.as_str().parse().ok()?,
            })
        })
}

/// pylint: scoring linter.
#[derive(Debug, Clone)]
pub struct Pylint {
    binary: String,
}

impl Pylint {
    /// Exit status bit pylint sets for command-line usage errors.
    const USAGE_ERROR_BIT: i32 = 32;

    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Lint one file and extract its score.
    ///
    /// Pylint's exit status is a bit mask of message categories, so a
    /// nonzero status is expected for any file with findings; only usage
    /// errors count as tool failures. A missing score is left as `None`
    /// for the caller to reject.
    ///
    /// # Errors
    ///
    /// Returns an error if pylint cannot run or reports a usage error.
    pub async fn run(&self, runner: &dyn ToolRunner, file: &Path) -> Result<ToolReport> {
        let invocation = ToolInvocation::new(&self.binary).file(file);
        let result = runner.run(&invocation).await?;

        if result.exit_code < 0 || result.exit_code & Self::USAGE_ERROR_BIT != 0 {
            return Err(PremergeError::tool_failed(
                &self.binary,
                result.exit_code,
                result.stderr.trim(),
            ));
        }

        let raw = result.combined_output();
        Ok(ToolReport {
            would_mutate: false,
            score: parse_score(&raw).map(|s| s.value),
            raw,
        })
    }
}

// ============================================================================
// cpplint
// ============================================================================

/// Outcome of a batch cpplint run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CpplintReport {
    pub passed: bool,
    /// Non-empty stderr lines, one per finding.
    pub messages: Vec<String>,
    pub raw: String,
}

/// cpplint: exit-status linter, findings on stderr.
#[derive(Debug, Clone)]
pub struct Cpplint {
    binary: String,
}

impl Cpplint {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Lint all files in one invocation.
    ///
    /// # Errors
    ///
    /// Returns an error if cpplint cannot run.
    pub async fn run<P: AsRef<Path>>(
        &self,
        runner: &dyn ToolRunner,
        files: &[P],
    ) -> Result<CpplintReport> {
        let invocation = ToolInvocation::new(&self.binary).files(files);
        let result = runner.run(&invocation).await?;

        Ok(CpplintReport {
            passed: result.success(),
            messages: result
                .stderr
                .lines()
                .filter(|l| !l.trim().is_empty())
                .map(str::to_string)
                .collect(),
            raw: result.combined_output(),
        })
    }
}
