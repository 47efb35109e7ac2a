//! Error handling module for the view engine
//!
//! Provides centralized error types using thiserror. Failures are never
//! retried or recovered internally; every variant surfaces to the caller of
//! the in-progress `include`/`render`/`set`/`get` call.

use thiserror::Error;

/// Main error type for the view engine
#[derive(Error, Debug)]
pub enum ViewError {
    /// `get`/`set` called with a name outside the recognized settings
    #[error("Got unknown setting key: {key}")]
    InvalidSetting { key: String },

    /// Recognized setting given a value of the wrong type
    #[error("Invalid value for setting '{key}': expected {expected}")]
    InvalidSettingValue { key: String, expected: &'static str },

    /// Template file could not be read (missing, permission denied, directory, ...)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Template source is not valid template syntax
    #[error("Template compile error: {0}")]
    Compile(#[from] CompileError),

    /// Template failed while evaluating an expression or statement
    #[error("Template render error: {0}")]
    Render(#[from] RenderError),

    /// Nested includes went deeper than the engine allows
    #[error("Include depth limit of {limit} exceeded (recursive include?)")]
    IncludeDepth { limit: usize },

    /// Shared state errors (mutex poisoning)
    #[error("State error: {0}")]
    State(String),
}

/// Result type alias for view engine operations
pub type Result<T> = std::result::Result<T, ViewError>;

impl ViewError {
    /// Create an unknown-setting error
    pub fn invalid_setting(key: impl Into<String>) -> Self {
        Self::InvalidSetting { key: key.into() }
    }

    /// Create a state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }
}

/// Syntax error found while compiling a template
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct CompileError {
    /// 1-based line of the tag that failed to compile
    pub line: usize,
    pub message: String,
}

impl CompileError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

/// Errors raised while evaluating a compiled template
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RenderError {
    #[error("{name} is not defined")]
    UndefinedVariable { name: String },

    #[error("{name} is not a function")]
    UnknownFunction { name: String },

    #[error("invalid argument to {function}: {reason}")]
    InvalidArgument {
        function: &'static str,
        reason: String,
    },

    #[error("cannot iterate over {type_name}")]
    NotIterable { type_name: &'static str },

    #[error("invalid operand for '{op}': {reason}")]
    InvalidOperand { op: &'static str, reason: String },
}
