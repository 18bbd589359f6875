//! Error types for code generation.

use thiserror::Error;

/// Error type for code generation operations.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Schema parsing error.
    #[error("schema parse error: {0}")]
    Parse(#[from] girbind_schema::ParseError),

    /// Schema loading or validation error.
    #[error("schema error: {0}")]
    Schema(#[from] girbind_schema::SchemaError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Code generation error.
    #[error("generation error: {message}")]
    Generation {
        /// Error message.
        message: String,
    },
}

impl CodegenError {
    /// Creates a generation error with the given message.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }
}

/// Error raised while formatting emitted TypeScript.
///
/// Never fatal: callers fall back to the unformatted text.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The source does not parse as a TypeScript module.
    #[error("{errors} syntax error(s), first: {message}")]
    Syntax {
        /// Number of parser diagnostics.
        errors: usize,
        /// Rendering of the first diagnostic.
        message: String,
    },
}
