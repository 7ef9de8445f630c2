//! Quality stages run over changed files.
//!
//! - [`adapters`] - Per-tool invocation and output markers
//! - [`fix_gate`] - Check, fix, fail-if-fixed protocol
//! - [`copyright`] - Owner store and header stamping
//! - [`lint`] - Threshold-scored and batch linting
//! - [`pipeline`] - Fixed-order stage aggregation
//! - [`format`] - Ungated in-place formatting
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │       Pipeline       │
//! │  run_all()           │
//! │  run_stage(stage)    │
//! └──────────┬───────────┘
//!            │
//!     ┌──────┴───────┐
//!     ▼              ▼
//! ┌─────────┐   ┌──────────┐
//! │ FixGate │   │   Lint   │
//! └────┬────┘   └────┬─────┘
//!      │             │
//!      ▼             ▼
//! ┌──────────────────────┐
//! │ Adapters             │
//! │ clang-format, isort, │
//! │ black, cpplint,      │
//! │ pylint               │
//! └──────────┬───────────┘
//!            ▼
//! ┌──────────────────────┐
//! │ ToolRunner           │
//! └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use premerge::quality::{Pipeline, PolicyState};
//!
//! let pipeline = Pipeline::new(config, ".", runner, vcs, policy);
//! let verdict = pipeline.run_all().await;
//! println!("{}", verdict.summary());
//! ```
//!
//! # Stages
//!
//! | Stage | Files | Kind |
//! |-------|-------|------|
//! | `copyright` | C-family + Python | fix gate |
//! | `clang-format` | C-family | fix gate |
//! | `python-format` | Python | fix gate (isort, black) |
//! | `cpplint` | C-family | batch lint |
//! | `pylint` | Python | scored lint |

pub mod adapters;
pub mod copyright;
pub mod fix_gate;
pub mod format;
pub mod lint;
pub mod pipeline;

pub use adapters::{
    parse_score, Black, ClangFormat, Cpplint, CpplintReport, Isort, LintScore, Pylint, ToolReport,
};
pub use copyright::{
    has_copyright, stamp, CopyrightPolicy, CopyrightStamper, OwnerPrompt, OwnerStore, PolicyState,
    StdinPrompt,
};
pub use fix_gate::{ClangFormatFixer, FileState, FixGate, FixGateReport, Fixer, PythonFormatter};
pub use format::{format_files, FormatSummary, Formatters};
pub use lint::{run_cpplint, LintFailure, LintOutcome, LintScorer};
pub use pipeline::{Pipeline, PipelineVerdict, Stage, StageOutcome, SUCCESS_SUMMARY};
