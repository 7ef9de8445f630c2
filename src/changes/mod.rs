//! Change detection.
//!
//! Works out which files a pipeline run should look at. The working tree
//! status is authoritative; when it is clean (typically right after a
//! commit) the files touched by the last commit are used instead.
//!
//! # Example
//!
//! ```rust,ignore
//! use premerge::changes::{ChangeLocator, ChangeQuery, GitBackend};
//!
//! let locator = ChangeLocator::new(".", Arc::new(GitBackend::new(runner, "git")));
//! let python = locator.locate(&ChangeQuery::new([".py"])).await;
//! for file in &python {
//!     println!("changed: {}", file.display());
//! }
//! ```

pub mod walk;

pub use walk::walk_files;

use crate::error::{PremergeError, Result};
use crate::runner::{ToolInvocation, ToolRunner};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

// ============================================================================
// Query and Result Types
// ============================================================================

/// Extensions a stage is interested in, e.g. `.py`.
///
/// Matching is a plain suffix test on the path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeQuery {
    target_extensions: BTreeSet<String>,
}

impl ChangeQuery {
    /// Create a query from a list of extensions.
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            target_extensions: extensions.into_iter().map(Into::into).collect(),
        }
    }

    /// Whether `path` ends with one of the target extensions.
    #[must_use]
    pub fn matches(&self, path: &Path) -> bool {
        let path = path.to_string_lossy();
        self.target_extensions
            .iter()
            .any(|ext| path.ends_with(ext.as_str()))
    }

    pub fn extensions(&self) -> impl Iterator<Item = &str> {
        self.target_extensions.iter().map(String::as_str)
    }
}

/// Deduplicated set of repository-relative paths, iterated in
/// lexicographic order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    files: BTreeSet<PathBuf>,
}

impl FileSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>) -> bool {
        self.files.insert(path.into())
    }

    #[must_use]
    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.contains(path.as_ref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathBuf> {
        self.files.iter()
    }

    /// Members whose path matches `query`.
    #[must_use]
    pub fn filter(&self, query: &ChangeQuery) -> FileSet {
        self.files
            .iter()
            .filter(|p| query.matches(p))
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn into_vec(self) -> Vec<PathBuf> {
        self.files.into_iter().collect()
    }
}

impl FromIterator<PathBuf> for FileSet {
    fn from_iter<T: IntoIterator<Item = PathBuf>>(iter: T) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FileSet {
    type Item = &'a PathBuf;
    type IntoIter = std::collections::btree_set::Iter<'a, PathBuf>;

    fn into_iter(self) -> Self::IntoIter {
        self.files.iter()
    }
}

// ============================================================================
// VCS Backend
// ============================================================================

/// Read-only queries against the version-control system.
#[async_trait]
pub trait VcsBackend: Send + Sync {
    /// Working tree status, one porcelain line per entry, untracked included.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be run.
    async fn status_lines(&self) -> Result<Vec<String>>;

    /// Paths changed by the most recent commit, one per line.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be run.
    async fn last_commit_files(&self) -> Result<Vec<String>>;

    /// Name of the checked-out branch.
    ///
    /// # Errors
    ///
    /// Returns an error if the query cannot be run.
    async fn current_branch(&self) -> Result<String>;
}

/// [`VcsBackend`] backed by the `git` CLI.
pub struct GitBackend {
    runner: Arc<dyn ToolRunner>,
    git: String,
}

impl GitBackend {
    pub fn new(runner: Arc<dyn ToolRunner>, git: impl Into<String>) -> Self {
        Self {
            runner,
            git: git.into(),
        }
    }

    async fn query(&self, operation: &str, args: &[&str]) -> Result<Vec<String>> {
        let invocation = ToolInvocation::new(&self.git).args(args.iter().copied());
        let result = self
            .runner
            .run(&invocation)
            .await
            .map_err(|e| PremergeError::git(operation, e.to_string()))?;

        if !result.success() {
            return Err(PremergeError::git(operation, result.stderr.trim()));
        }

        Ok(result.stdout.lines().map(str::to_string).collect())
    }
}

#[async_trait]
impl VcsBackend for GitBackend {
    async fn status_lines(&self) -> Result<Vec<String>> {
        self.query("status", &["status", "--porcelain", "-u"]).await
    }

    async fn last_commit_files(&self) -> Result<Vec<String>> {
        self.query("log", &["log", "-1", "--name-only", "--pretty=format:"])
            .await
    }

    async fn current_branch(&self) -> Result<String> {
        let lines = self
            .query("rev-parse", &["rev-parse", "--abbrev-ref", "HEAD"])
            .await?;
        lines
            .into_iter()
            .map(|l| l.trim().to_string())
            .find(|l| !l.is_empty())
            .ok_or_else(|| PremergeError::git("rev-parse", "empty branch name"))
    }
}

// ============================================================================
// Parsing
// ============================================================================

/// Extract the path from one porcelain status line.
///
/// Renames and copies (`R  old -> new`) yield the destination. Lines with
/// fewer than two tokens are incomplete and yield `None`.
#[must_use]
pub fn parse_status_line(line: &str) -> Option<&str> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 2 {
        return None;
    }

    let status = tokens[0];
    if status.starts_with('R') || status.starts_with('C') {
        tokens.last().copied()
    } else {
        Some(tokens[1])
    }
}

/// Collect every path mentioned in porcelain status output.
pub fn parse_status_output<I, S>(lines: I) -> FileSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| parse_status_line(line.as_ref()).map(PathBuf::from))
        .collect()
}

/// Collect a bare one-path-per-line listing.
pub fn parse_file_list<I, S>(lines: I) -> FileSet
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    lines
        .into_iter()
        .filter_map(|line| {
            let line = line.as_ref().trim();
            (!line.is_empty()).then(|| PathBuf::from(line))
        })
        .collect()
}

// ============================================================================
// Change Locator
// ============================================================================

/// Derives the set of changed files for a stage.
#[derive(Clone)]
pub struct ChangeLocator {
    repo_root: PathBuf,
    backend: Arc<dyn VcsBackend>,
}

impl ChangeLocator {
    pub fn new(repo_root: impl AsRef<Path>, backend: Arc<dyn VcsBackend>) -> Self {
        Self {
            repo_root: repo_root.as_ref().to_path_buf(),
            backend,
        }
    }

    #[must_use]
    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Changed files matching `query` that still exist on disk.
    ///
    /// Never fails: backend errors are logged and treated as "no changes".
    pub async fn locate(&self, query: &ChangeQuery) -> FileSet {
        let mut candidates = match self.backend.status_lines().await {
            Ok(lines) => parse_status_output(&lines),
            Err(e) => {
                warn!("could not read working tree status: {}", e);
                FileSet::new()
            }
        };

        if candidates.is_empty() {
            debug!("working tree clean, using files from the last commit");
            candidates = match self.backend.last_commit_files().await {
                Ok(lines) => parse_file_list(&lines),
                Err(e) => {
                    warn!("could not read last commit: {}", e);
                    FileSet::new()
                }
            };
        }

        // Existence is checked now, not cached: a file deleted mid-run drops out.
        let located: FileSet = candidates
            .filter(query)
            .into_vec()
            .into_iter()
            .filter(|p| self.repo_root.join(p).is_file())
            .collect();

        debug!(
            "located {} file(s) for {:?}",
            located.len(),
            query.extensions().collect::<Vec<_>>()
        );
        located
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockVcs, TestFixture};
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "x = 1\n").unwrap();
    }

    // =========================================================================
    // Query Tests
    // =========================================================================

    #[test]
    fn test_query_matches_suffix() {
        let query = ChangeQuery::new([".h", ".cpp", ".hpp", ".cc"]);
        assert!(query.matches(Path::new("src/main.cpp")));
        assert!(query.matches(Path::new("include/foo.hpp")));
        assert!(query.matches(Path::new("foo.h")));
        assert!(!query.matches(Path::new("script.py")));
        assert!(!query.matches(Path::new("Makefile")));
    }

    #[test]
    fn test_fileset_is_sorted_and_deduplicated() {
        let mut set = FileSet::new();
        assert!(set.insert("b.py"));
        assert!(set.insert("a.py"));
        assert!(!set.insert("b.py"));
        let files: Vec<_> = set.iter().cloned().collect();
        assert_eq!(files, vec![PathBuf::from("a.py"), PathBuf::from("b.py")]);
    }

    // =========================================================================
    // Parse Tests
    // =========================================================================

    #[test]
    fn test_parse_status_modified_and_untracked() {
        assert_eq!(parse_status_line(" M src/main.cpp"), Some("src/main.cpp"));
        assert_eq!(parse_status_line("M  staged.py"), Some("staged.py"));
        assert_eq!(parse_status_line("?? new_file.py"), Some("new_file.py"));
        assert_eq!(parse_status_line("MM both.py"), Some("both.py"));
    }

    #[test]
    fn test_parse_status_rename_takes_destination() {
        assert_eq!(
            parse_status_line("R  old_name.py -> new_name.py"),
            Some("new_name.py")
        );
        assert_eq!(parse_status_line("C  orig.cpp -> copy.cpp"), Some("copy.cpp"));
        assert_eq!(parse_status_line("RM a.py -> b.py"), Some("b.py"));
    }

    #[test]
    fn test_parse_status_skips_short_lines() {
        assert_eq!(parse_status_line(""), None);
        assert_eq!(parse_status_line("M"), None);
        assert_eq!(parse_status_line("   "), None);
    }

    #[test]
    fn test_parse_status_output_deduplicates() {
        let set = parse_status_output(["M  a.py", " M a.py", "?? b.py", "bad"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("a.py"));
        assert!(set.contains("b.py"));
    }

    #[test]
    fn test_parse_file_list_ignores_blank_lines() {
        let set = parse_file_list(["", "a.py", "  ", "src/b.cpp", ""]);
        assert_eq!(set.len(), 2);
    }

    // =========================================================================
    // Locator Tests (mock backend)
    // =========================================================================

    #[tokio::test]
    async fn test_locate_rename_returns_destination_only() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "new_name.py");
        touch(temp.path(), "old_name.py");

        let vcs = MockVcs::new().with_status(["R  old_name.py -> new_name.py"]);
        let locator = ChangeLocator::new(temp.path(), Arc::new(vcs));
        let files = locator.locate(&ChangeQuery::new([".py"])).await;

        assert!(files.contains("new_name.py"));
        assert!(!files.contains("old_name.py"));
    }

    #[tokio::test]
    async fn test_locate_filters_extension_and_existence() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "src/a.py");
        touch(temp.path(), "src/b.cpp");

        let vcs = MockVcs::new().with_status([
            " M src/a.py",
            " M src/b.cpp",
            " D src/deleted.py",
            "?? README.md",
        ]);
        let locator = ChangeLocator::new(temp.path(), Arc::new(vcs));

        let python = locator.locate(&ChangeQuery::new([".py"])).await;
        assert_eq!(python.into_vec(), vec![PathBuf::from("src/a.py")]);

        let cpp = locator.locate(&ChangeQuery::new([".cpp", ".h"])).await;
        assert_eq!(cpp.into_vec(), vec![PathBuf::from("src/b.cpp")]);
    }

    #[tokio::test]
    async fn test_locate_falls_back_to_last_commit_when_clean() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "committed.py");
        touch(temp.path(), "other.cpp");

        let vcs = MockVcs::new()
            .with_status(Vec::<String>::new())
            .with_last_commit(["committed.py", "other.cpp", "gone.py", ""]);
        let locator = ChangeLocator::new(temp.path(), Arc::new(vcs));
        let files = locator.locate(&ChangeQuery::new([".py"])).await;

        assert_eq!(files.into_vec(), vec![PathBuf::from("committed.py")]);
    }

    #[tokio::test]
    async fn test_locate_no_fallback_when_entries_filtered_out() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "notes.md");
        touch(temp.path(), "committed.py");

        let vcs = MockVcs::new()
            .with_status(["?? notes.md"])
            .with_last_commit(["committed.py"]);
        let locator = ChangeLocator::new(temp.path(), Arc::new(vcs));
        let files = locator.locate(&ChangeQuery::new([".py"])).await;

        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn test_locate_backend_errors_yield_empty_set() {
        let temp = TempDir::new().unwrap();
        let vcs = MockVcs::new().failing("not a git repository");
        let locator = ChangeLocator::new(temp.path(), Arc::new(vcs));
        let files = locator.locate(&ChangeQuery::new([".py"])).await;
        assert!(files.is_empty());
    }

    // =========================================================================
    // Integration Tests (require git)
    // =========================================================================

    #[tokio::test]
    async fn test_locate_real_git_modified_and_untracked() {
        let fixture = TestFixture::with_git_repo();
        fixture.write_file("tracked.py", "x = 2\n").unwrap();
        fixture.write_file("pkg/new_module.py", "y = 1\n").unwrap();

        let locator = fixture.locator();
        let files = locator.locate(&ChangeQuery::new([".py"])).await;

        assert!(files.contains("tracked.py"), "found: {:?}", files);
        assert!(files.contains("pkg/new_module.py"), "found: {:?}", files);
    }

    #[tokio::test]
    async fn test_locate_real_git_clean_tree_uses_last_commit() {
        let fixture = TestFixture::with_git_repo();
        fixture.write_file("feature.cpp", "int main() {}\n").unwrap();
        fixture.make_commit("Add feature");

        let locator = fixture.locator();
        let files = locator.locate(&ChangeQuery::new([".cpp"])).await;

        assert_eq!(files.into_vec(), vec![PathBuf::from("feature.cpp")]);
    }

    #[tokio::test]
    async fn test_locate_real_git_staged_rename() {
        let fixture = TestFixture::with_git_repo();
        fixture.git(&["mv", "tracked.py", "renamed.py"]);

        let locator = fixture.locator();
        let files = locator.locate(&ChangeQuery::new([".py"])).await;

        assert!(files.contains("renamed.py"), "found: {:?}", files);
        assert!(!files.contains("tracked.py"));
    }
}
