//! Error types for lowering.

use alloc::string::String;

use thiserror::Error;

/// Result type for lowering operations.
pub type LowerResult<T> = Result<T, LowerError>;

/// Error raised while lowering a translation unit.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LowerError {
    /// Well-typed input that this layer does not lower
    #[error("unsupported functionality: {0}")]
    UnsupportedFeature(String),
    /// A broken assumption about the AST or the lowering state
    #[error("internal invariant violated: {0}")]
    InternalInvariant(String),
    /// Information the front end was expected to precompute is missing
    #[error("front-end information missing: {0}")]
    FrontEndMissing(String),
    /// Malformed resource-limit configuration text
    #[error("bad resource configuration at line {line}: {message}")]
    Config { line: usize, message: String },
    /// Error surfaced by the IR library
    #[error(transparent)]
    Ir(#[from] topir::IrError),
}

impl LowerError {
    /// Create an unsupported-feature error.
    pub fn unsupported(msg: impl Into<String>) -> Self {
        LowerError::UnsupportedFeature(msg.into())
    }

    /// Create an internal-invariant error.
    pub fn invariant(msg: impl Into<String>) -> Self {
        LowerError::InternalInvariant(msg.into())
    }

    /// Create a front-end-missing error.
    pub fn front_end_missing(msg: impl Into<String>) -> Self {
        LowerError::FrontEndMissing(msg.into())
    }

    /// True for errors that leave the module in an untrustworthy state.
    pub fn poisons(&self) -> bool {
        matches!(self, LowerError::InternalInvariant(_) | LowerError::Ir(_))
    }
}

/// What the traversal does after reporting a problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Substitute a placeholder and keep lowering
    Continue,
    /// Stop lowering this translation unit
    Abort,
}
