//! premerge - pre-commit / pre-merge quality gate
//!
//! Finds the files changed in a git working tree, routes each one to the
//! formatter and linter for its language, enforces a copyright header, and
//! reduces everything to one pass/fail verdict.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - [`changes`] - Changed-file discovery from git, plus the full-tree walk
//! - [`runner`] - Bounded invocation of external tools
//! - [`quality`] - Tool adapters, the fix gate, linting and the pipeline
//! - [`branch`] - Protected-branch guard
//! - [`config`] - `.premerge.toml` loading and validation
//! - [`error`] - Custom error types and handling
//! - [`testing`] - Testing infrastructure (mocks, fixtures)
//!
//! # Example
//!
//! ```rust,ignore
//! use premerge::{GitBackend, Pipeline, PipelineConfig, PolicyState, ProcessRunner};
//! use std::sync::Arc;
//!
//! let config = PipelineConfig::load(".".as_ref())?;
//! let runner = Arc::new(ProcessRunner::new("."));
//! let vcs = Arc::new(GitBackend::new(runner.clone(), "git"));
//! let pipeline = Pipeline::new(config, ".", runner, vcs, policy);
//!
//! let verdict = pipeline.run_all().await;
//! println!("{}", verdict.summary());
//! ```

pub mod branch;
pub mod changes;
pub mod config;
pub mod error;
pub mod quality;
pub mod runner;
pub mod testing;

// Re-export commonly used types
pub use error::{PremergeError, Result};

pub use branch::{check_branch, BranchStatus, PROTECTED_BRANCH_MESSAGE};
pub use changes::{walk::walk_files, ChangeLocator, ChangeQuery, FileSet, GitBackend, VcsBackend};
pub use config::{PipelineConfig, ToolPaths, CONFIG_FILE_NAME};
pub use runner::{ProcessRunner, ToolInvocation, ToolResult, ToolRunner};

pub use quality::{
    format_files, CopyrightPolicy, FixGate, FixGateReport, Fixer, FormatSummary, Formatters,
    OwnerStore, Pipeline, PipelineVerdict, PolicyState, Stage, StageOutcome,
};
