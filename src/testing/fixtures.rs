//! Test fixtures for creating reproducible git repositories.

use crate::changes::{ChangeLocator, GitBackend};
use crate::runner::ProcessRunner;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A temporary project directory, cleaned up when dropped.
///
/// # Example
///
/// ```rust,ignore
/// let fixture = TestFixture::with_git_repo();
/// fixture.write_file("tracked.py", "x = 2\n").unwrap();
/// let files = fixture.locator().locate(&ChangeQuery::new([".py"])).await;
/// ```
pub struct TestFixture {
    temp_dir: TempDir,
}

impl TestFixture {
    /// Create an empty directory that is not a repository.
    ///
    /// # Panics
    ///
    /// Panics if temporary directory creation fails.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            temp_dir: TempDir::new().expect("Failed to create temp directory"),
        }
    }

    /// Create a git repository on branch `main` with one commit containing
    /// `README.md` and `tracked.py`.
    ///
    /// # Panics
    ///
    /// Panics if git initialization fails.
    #[must_use]
    pub fn with_git_repo() -> Self {
        let fixture = Self::empty();

        fixture.git(&["init", "-q"]);
        fixture.git(&["checkout", "-q", "-b", "main"]);
        fixture.git(&["config", "user.email", "test@example.com"]);
        fixture.git(&["config", "user.name", "Test User"]);
        fixture.git(&["config", "commit.gpgsign", "false"]);

        fixture
            .write_file("README.md", "# Fixture\n")
            .expect("Failed to write README.md");
        fixture
            .write_file("tracked.py", "# Copyright (c) 2024, Test User\nx = 1\n")
            .expect("Failed to write tracked.py");
        fixture.make_commit("Initial commit");

        fixture
    }

    /// Get the fixture path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Write a file relative to the fixture root, creating parents.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn write_file(&self, relative: &str, content: &str) -> std::io::Result<PathBuf> {
        let path = self.temp_dir.path().join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, content)?;
        Ok(path)
    }

    /// Read a file relative to the fixture root.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be read.
    #[must_use]
    pub fn read_file(&self, relative: &str) -> String {
        std::fs::read_to_string(self.temp_dir.path().join(relative))
            .expect("Failed to read fixture file")
    }

    /// Run a git command in the fixture.
    ///
    /// # Panics
    ///
    /// Panics if git cannot be spawned.
    pub fn git(&self, args: &[&str]) {
        std::process::Command::new("git")
            .args(args)
            .current_dir(self.temp_dir.path())
            .output()
            .expect("Failed to run git");
    }

    /// Stage everything and commit.
    pub fn make_commit(&self, message: &str) {
        self.git(&["add", "-A"]);
        self.git(&["commit", "-q", "-m", message]);
    }

    /// A process runner rooted at the fixture.
    #[must_use]
    pub fn runner(&self) -> Arc<ProcessRunner> {
        Arc::new(ProcessRunner::new(self.path()))
    }

    /// A change locator backed by real git.
    #[must_use]
    pub fn locator(&self) -> ChangeLocator {
        let backend = GitBackend::new(self.runner(), "git");
        ChangeLocator::new(self.path(), Arc::new(backend))
    }
}
