//! Runtime error types for the kestrel orchestration loop.
//!
//! All fallible operations return `KestrelResult<T>`. Only two kinds ever
//! escalate out of a cycle (`LoadFailure` and `DecisionRequestFailure`); tool
//! failures are converted to `ExecutionResult` data at the dispatch boundary.

use thiserror::Error;

/// The unified error type for the kestrel runtime.
#[derive(Debug, Error)]
pub enum KestrelError {
    /// A tool unit could not be read, parsed, or bound.
    #[error("failed to load tool unit '{path}': {reason}")]
    UnitLoad { path: String, reason: String },

    /// The completion service call itself failed.
    #[error("decision request failed: {reason}")]
    DecisionRequest { reason: String },

    /// A tool body failed while running.
    #[error("tool '{tool}' failed: {reason}")]
    ToolFailed { tool: String, reason: String },

    /// The argument payload for a tool could not be parsed, bound, or validated.
    #[error("invalid arguments for tool '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    ConfigError { reason: String },

    /// The stimulus source could not produce input.
    #[error("input error: {reason}")]
    Input { reason: String },
}

/// Coarse classification used by the orchestration loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LoadFailure,
    DecisionRequestFailure,
    ToolError,
    Config,
    Input,
}

impl KestrelError {
    /// Map this error onto the loop's failure taxonomy.
    pub fn kind(&self) -> ErrorKind {
        match self {
            KestrelError::UnitLoad { .. } => ErrorKind::LoadFailure,
            KestrelError::DecisionRequest { .. } => ErrorKind::DecisionRequestFailure,
            KestrelError::ToolFailed { .. } | KestrelError::InvalidArguments { .. } => {
                ErrorKind::ToolError
            }
            KestrelError::ConfigError { .. } => ErrorKind::Config,
            KestrelError::Input { .. } => ErrorKind::Input,
        }
    }

    /// Shorthand for a tool body failure.
    pub fn tool_failed(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        KestrelError::ToolFailed {
            tool: tool.into(),
            reason: reason.into(),
        }
    }

    /// Shorthand for an argument binding failure.
    pub fn invalid_arguments(tool: impl Into<String>, reason: impl Into<String>) -> Self {
        KestrelError::InvalidArguments {
            tool: tool.into(),
            reason: reason.into(),
        }
    }
}

/// Convenience alias used throughout the kestrel crates.
pub type KestrelResult<T> = Result<T, KestrelError>;
