//! Custom error types for premerge.
//!
//! Stage code converts every error into a failed stage outcome, so these
//! variants mostly surface in logs and in the CLI's exit status.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for premerge operations
#[derive(Error, Debug)]
pub enum PremergeError {
    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Failed to load configuration
    #[error("Configuration error: {message}")]
    Config {
        message: String,
        path: Option<PathBuf>,
    },

    /// Invalid configuration value
    #[error("Invalid configuration: {field} - {reason}")]
    InvalidConfig { field: String, reason: String },

    // =========================================================================
    // Tool Errors
    // =========================================================================
    /// Tool binary is not installed or not on PATH
    #[error("Missing required tool: {tool}")]
    MissingTool { tool: String },

    /// Tool process could not be spawned or awaited
    #[error("Tool '{tool}' could not be started: {message}")]
    ToolSpawn { tool: String, message: String },

    /// Tool did not finish within its time budget
    #[error("Tool '{tool}' timed out after {timeout_secs}s")]
    ToolTimeout { tool: String, timeout_secs: u64 },

    /// Tool ran but reported its own failure
    #[error("Tool '{tool}' failed with exit code {exit_code}: {message}")]
    ToolFailed {
        tool: String,
        exit_code: i32,
        message: String,
    },

    /// Tool output did not contain the expected marker
    #[error("Malformed output from '{tool}': {detail}")]
    MalformedOutput { tool: String, detail: String },

    /// Git operation failed
    #[error("Git operation failed: {operation} - {message}")]
    Git { operation: String, message: String },

    // =========================================================================
    // Policy Errors
    // =========================================================================
    /// Copyright owner could not be read or solicited
    #[error("Copyright owner unavailable: {reason}")]
    OwnerUnavailable { reason: String },

    // =========================================================================
    // Wrapped Errors
    // =========================================================================
    /// IO error wrapper
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// TOML parse error wrapper
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// JSON error wrapper
    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// Generic error wrapper
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl PremergeError {
    // =========================================================================
    // Constructor helpers
    // =========================================================================

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            path: None,
        }
    }

    /// Create a configuration error with path
    pub fn config_with_path(message: impl Into<String>, path: PathBuf) -> Self {
        Self::Config {
            message: message.into(),
            path: Some(path),
        }
    }

    /// Create an invalid configuration error
    pub fn invalid_config(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// Create a git error
    pub fn git(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Git {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a tool failure error
    pub fn tool_failed(tool: impl Into<String>, exit_code: i32, message: impl Into<String>) -> Self {
        Self::ToolFailed {
            tool: tool.into(),
            exit_code,
            message: message.into(),
        }
    }

    /// Create a malformed output error
    pub fn malformed(tool: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::MalformedOutput {
            tool: tool.into(),
            detail: detail.into(),
        }
    }

    /// Create an owner unavailable error
    pub fn owner_unavailable(reason: impl Into<String>) -> Self {
        Self::OwnerUnavailable {
            reason: reason.into(),
        }
    }

    // =========================================================================
    // Classification helpers
    // =========================================================================

    /// Check if this error came from running an external tool
    pub fn is_tool_failure(&self) -> bool {
        matches!(
            self,
            Self::MissingTool { .. }
                | Self::ToolSpawn { .. }
                | Self::ToolTimeout { .. }
                | Self::ToolFailed { .. }
        )
    }

    /// Get error code for exit status
    ///
    /// 1 is reserved for blocked commits and 2 for failed jobs, so errors
    /// start at 3.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::MissingTool { .. } => 3,
            Self::Git { .. } => 4,
            Self::OwnerUnavailable { .. } => 5,
            Self::Config { .. } | Self::InvalidConfig { .. } | Self::Toml(_) => 7,
            _ => 6,
        }
    }
}

/// Type alias for premerge results
pub type Result<T> = std::result::Result<T, PremergeError>;
