//! Testing infrastructure for premerge.
//!
//! - **Mocks**: scripted tool runner, canned VCS backend, fixed owner prompt
//! - **Fixtures**: temporary git repositories (test-only)
//!
//! # Example
//!
//! ```rust,ignore
//! use premerge::testing::{MockVcs, ScriptedRunner};
//!
//! let vcs = MockVcs::new().with_status([" M src/app.py"]);
//! let runner = ScriptedRunner::new()
//!     .respond("pylint", None, ToolResult::ok("Your code has been rated at 9.00/10"));
//! ```

#[cfg(test)]
pub mod fixtures;
pub mod mocks;

#[cfg(test)]
pub use fixtures::*;
pub use mocks::*;
