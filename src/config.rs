//! Configuration for the premerge pipeline.
//!
//! Every value has a built-in default, so a repository without a
//! `.premerge.toml` runs with the stock C/C++ and Python setup.
//!
//! # Example .premerge.toml
//!
//! ```toml
//! lint_threshold = 9.0
//! python_extensions = [".py", ".pyi"]
//! excluded_dirs = ["build", ".vscode", ".git", "third_party"]
//!
//! [tools]
//! black = "/opt/venv/bin/black"
//! ```

use crate::error::{PremergeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Name of the optional config file in the project root.
pub const CONFIG_FILE_NAME: &str = ".premerge.toml";

/// Minimum pylint score a file must reach.
pub const DEFAULT_LINT_THRESHOLD: f64 = 8.0;

/// Per-invocation timeout for external tools.
pub const DEFAULT_TOOL_TIMEOUT_SECS: u64 = 60;

/// Default extension lists.
pub mod extensions {
    pub const CPP: &[&str] = &[".h", ".cpp", ".hpp", ".cc"];

    pub const PYTHON: &[&str] = &[".py"];
}

fn default_cpp_extensions() -> Vec<String> {
    extensions::CPP.iter().map(|s| s.to_string()).collect()
}

fn default_python_extensions() -> Vec<String> {
    extensions::PYTHON.iter().map(|s| s.to_string()).collect()
}

fn default_excluded_dirs() -> Vec<String> {
    ["build", ".vscode", ".git"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_lint_threshold() -> f64 {
    DEFAULT_LINT_THRESHOLD
}

fn default_tool_timeout_secs() -> u64 {
    DEFAULT_TOOL_TIMEOUT_SECS
}

fn default_owner_file() -> PathBuf {
    PathBuf::from(".owner")
}

fn default_protected_branches() -> Vec<String> {
    vec!["master".to_string(), "main".to_string()]
}

/// Binary names for every external tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolPaths {
    pub git: String,
    pub clang_format: String,
    pub isort: String,
    pub black: String,
    pub cpplint: String,
    pub pylint: String,
}

impl Default for ToolPaths {
    fn default() -> Self {
        Self {
            git: "git".to_string(),
            clang_format: "clang-format".to_string(),
            isort: "isort".to_string(),
            black: "black".to_string(),
            cpplint: "cpplint".to_string(),
            pylint: "pylint".to_string(),
        }
    }
}

/// Pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Extensions routed to clang-format and cpplint.
    #[serde(default = "default_cpp_extensions")]
    pub cpp_extensions: Vec<String>,

    /// Extensions routed to isort, black and pylint.
    #[serde(default = "default_python_extensions")]
    pub python_extensions: Vec<String>,

    /// Directory names skipped by `format --full`.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,

    /// Files scoring below this fail the pylint stage.
    #[serde(default = "default_lint_threshold")]
    pub lint_threshold: f64,

    /// Timeout applied to each external tool invocation.
    #[serde(default = "default_tool_timeout_secs")]
    pub tool_timeout_secs: u64,

    /// Owner store, relative to the project root.
    #[serde(default = "default_owner_file")]
    pub owner_file: PathBuf,

    /// Branches that `check-branch` refuses.
    #[serde(default = "default_protected_branches")]
    pub protected_branches: Vec<String>,

    /// Run per-file check/fix sequences concurrently inside a stage.
    #[serde(default)]
    pub parallel_files: bool,

    #[serde(default)]
    pub tools: ToolPaths,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cpp_extensions: default_cpp_extensions(),
            python_extensions: default_python_extensions(),
            excluded_dirs: default_excluded_dirs(),
            lint_threshold: default_lint_threshold(),
            tool_timeout_secs: default_tool_timeout_secs(),
            owner_file: default_owner_file(),
            protected_branches: default_protected_branches(),
            parallel_files: false,
            tools: ToolPaths::default(),
        }
    }
}

impl PipelineConfig {
    /// Load configuration from a project directory.
    ///
    /// Falls back to defaults when no config file exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or
    /// fails validation.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let path = Self::config_path(project_dir);

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: PipelineConfig = toml::from_str(&content).map_err(|e| {
            PremergeError::config_with_path(format!("failed to parse: {}", e), path.clone())
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the config file path for a project
    pub fn config_path(project_dir: &Path) -> PathBuf {
        project_dir.join(CONFIG_FILE_NAME)
    }

    /// Resolve the owner store path for a project
    pub fn owner_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.owner_file)
    }

    /// C-family and Python extensions together.
    pub fn all_extensions(&self) -> Vec<String> {
        let mut all = self.cpp_extensions.clone();
        all.extend(self.python_extensions.iter().cloned());
        all
    }

    /// Check that every value is usable.
    ///
    /// # Errors
    ///
    /// Returns [`PremergeError::InvalidConfig`] naming the first bad field.
    pub fn validate(&self) -> Result<()> {
        for (field, list) in [
            ("cpp_extensions", &self.cpp_extensions),
            ("python_extensions", &self.python_extensions),
        ] {
            if list.is_empty() {
                return Err(PremergeError::invalid_config(field, "must not be empty"));
            }
            if let Some(bad) = list.iter().find(|e| !e.starts_with('.') || e.len() < 2) {
                return Err(PremergeError::invalid_config(
                    field,
                    format!("'{}' must start with a dot", bad),
                ));
            }
        }

        if !(0.0..=10.0).contains(&self.lint_threshold) {
            return Err(PremergeError::invalid_config(
                "lint_threshold",
                format!("{} is outside 0..=10", self.lint_threshold),
            ));
        }

        if self.tool_timeout_secs == 0 {
            return Err(PremergeError::invalid_config(
                "tool_timeout_secs",
                "must be greater than zero",
            ));
        }

        Ok(())
    }

    /// Render as TOML for `config show`.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| PremergeError::config(e.to_string()))
    }
}
