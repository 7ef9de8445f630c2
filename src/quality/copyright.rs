//! Copyright header policy.
//!
//! A changed source file must carry a `Copyright (c)` line within its first
//! four lines. Files without one get the policy's header prepended and fail
//! the stage, so the author re-stages the stamped file.
//!
//! The owner name lives in a single-line store (`.owner` by default). It is
//! read once when the pipeline is built; when the store is missing or empty
//! the user is asked for a name, which is then persisted.

use super::adapters::ToolReport;
use super::fix_gate::Fixer;
use crate::changes::ChangeQuery;
use crate::error::{PremergeError, Result};
use async_trait::async_trait;
use chrono::Datelike;
use std::io::{BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Case-insensitive marker searched for in the file head.
pub const COPYRIGHT_MARKER: &str = "copyright (c)";

/// Number of leading lines searched for the marker.
pub const HEADER_SEARCH_LINES: usize = 4;

// ============================================================================
// Owner Store
// ============================================================================

/// Asks the user for the copyright owner.
pub trait OwnerPrompt {
    /// Show `message` and return the answer.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be obtained.
    fn ask(&self, message: &str) -> Result<String>;
}

/// Reads the owner from the terminal.
#[derive(Debug, Default)]
pub struct StdinPrompt;

impl OwnerPrompt for StdinPrompt {
    fn ask(&self, message: &str) -> Result<String> {
        let stdin = std::io::stdin();
        if !stdin.is_terminal() {
            return Err(PremergeError::owner_unavailable(
                "stdin is not a terminal; pass --owner or create the owner file",
            ));
        }

        print!("{}", message);
        std::io::stdout().flush()?;

        let mut answer = String::new();
        stdin.lock().read_line(&mut answer)?;
        Ok(answer.trim().to_string())
    }
}

/// Single-line persisted owner name.
#[derive(Debug, Clone)]
pub struct OwnerStore {
    path: PathBuf,
}

impl OwnerStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// First non-empty line, trimmed. `None` when missing or blank.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read.
    pub fn read(&self) -> Result<Option<String>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .map(str::to_string))
    }

    /// Replace the stored owner.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write(&self, owner: &str) -> Result<()> {
        std::fs::write(&self.path, format!("{}\n", owner.trim()))?;
        Ok(())
    }

    /// Persist an owner given up front, e.g. on the command line.
    ///
    /// # Errors
    ///
    /// Returns an error if `owner` is blank or cannot be written.
    pub fn persist(&self, owner: &str) -> Result<String> {
        let owner = owner.trim();
        if owner.is_empty() {
            return Err(PremergeError::owner_unavailable("owner name is empty"));
        }
        self.write(owner)?;
        Ok(owner.to_string())
    }

    /// Read the owner, asking for and persisting one when absent.
    ///
    /// # Errors
    ///
    /// Returns [`PremergeError::OwnerUnavailable`] if the store is empty and
    /// the prompt yields nothing.
    pub fn resolve(&self, prompt: &dyn OwnerPrompt) -> Result<String> {
        if let Some(owner) = self.read()? {
            return Ok(owner);
        }

        let message = if self.path.exists() {
            format!("The {} file is empty. Enter the owner name: ", self.path.display())
        } else {
            format!("File '{}' does not exist. Enter the owner name: ", self.path.display())
        };

        let owner = prompt.ask(&message)?.trim().to_string();
        if owner.is_empty() {
            return Err(PremergeError::owner_unavailable("no owner name given"));
        }

        self.write(&owner)?;
        info!("Saved owner '{}' to {}", owner, self.path.display());
        Ok(owner)
    }
}

// ============================================================================
// Policy
// ============================================================================

/// Owner, year and the header templates derived from them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyrightPolicy {
    pub owner: String,
    pub year: i32,
    pub template_cpp: String,
    pub template_py: String,
}

impl CopyrightPolicy {
    pub fn new(owner: impl Into<String>, year: i32) -> Self {
        let owner = owner.into();
        Self {
            template_cpp: format!("/** Copyright (c) {}, {} **/", year, owner),
            template_py: format!("# Copyright (c) {}, {}", year, owner),
            owner,
            year,
        }
    }

    /// Policy stamped with the current local year.
    pub fn for_current_year(owner: impl Into<String>) -> Self {
        Self::new(owner, chrono::Local::now().year())
    }
}

/// Policy as seen by the pipeline: loaded, or the reason it could not be.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PolicyState {
    Ready(CopyrightPolicy),
    Unavailable(String),
}

impl From<Result<CopyrightPolicy>> for PolicyState {
    fn from(result: Result<CopyrightPolicy>) -> Self {
        match result {
            Ok(policy) => Self::Ready(policy),
            Err(e) => Self::Unavailable(e.to_string()),
        }
    }
}

/// Whether the head of `content` carries a copyright line.
#[must_use]
pub fn has_copyright(content: &str) -> bool {
    content
        .lines()
        .take(HEADER_SEARCH_LINES)
        .any(|line| line.to_lowercase().contains(COPYRIGHT_MARKER))
}

/// Prepend `header` (trailing newlines trimmed) and one newline.
#[must_use]
pub fn stamp(header: &str, content: &str) -> String {
    format!("{}\n{}", header.trim_end_matches(['\r', '\n']), content)
}

// ============================================================================
// Stamper
// ============================================================================

/// [`Fixer`] that checks for and inserts copyright headers.
///
/// C-family files get the block-comment template, everything else the
/// hash-comment one.
pub struct CopyrightStamper {
    repo_root: PathBuf,
    policy: CopyrightPolicy,
    cpp: ChangeQuery,
}

impl CopyrightStamper {
    pub fn new(repo_root: impl AsRef<Path>, policy: CopyrightPolicy, cpp: ChangeQuery) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            policy,
            cpp,
        }
    }

    fn template_for(&self, file: &Path) -> &str {
        if self.cpp.matches(file) {
            &self.policy.template_cpp
        } else {
            &self.policy.template_py
        }
    }
}

#[async_trait]
impl Fixer for CopyrightStamper {
    fn name(&self) -> &str {
        "copyright"
    }

    async fn check(&self, file: &Path) -> Result<ToolReport> {
        let content = tokio::fs::read_to_string(self.repo_root.join(file)).await?;
        Ok(ToolReport {
            would_mutate: !has_copyright(&content),
            ..Default::default()
        })
    }

    async fn fix(&self, file: &Path) -> Result<()> {
        let path = self.repo_root.join(file);
        let content = tokio::fs::read_to_string(&path).await?;
        if has_copyright(&content) {
            return Ok(());
        }
        tokio::fs::write(&path, stamp(self.template_for(file), &content)).await?;
        Ok(())
    }

    fn failure_message(&self, count: usize) -> String {
        format!(
            "copyright: {} file(s) were missing a copyright header.",
            count
        )
    }
}
