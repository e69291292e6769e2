//! Error types for planning, generation and output writing

use std::path::PathBuf;

use templar_model::ModelError;
use thiserror::Error;

/// Errors that can occur during code generation
#[derive(Debug, Error)]
pub enum CodegenError {
    /// A configured type generator does not exist
    #[error("Unknown type generator: {0}")]
    UnknownGenerator(String),

    /// A configured formatting pass does not exist
    #[error("Unknown formatting pass: {0}")]
    UnknownFormattingPass(String),

    /// Documentation template registration or rendering failed
    #[error("Documentation error in '{template}': {message}")]
    Documentation {
        /// Documentation template name
        template: String,
        /// Underlying handlebars message
        message: String,
    },

    /// Writing a generated file failed
    #[error("Write failed for {path}: {message}")]
    WriteFailed {
        /// Target path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Removing a stale generated file failed
    #[error("Cleanup failed for {path}: {message}")]
    CleanupFailed {
        /// Stale file path
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// The template model rejected a query
    #[error(transparent)]
    Model(#[from] ModelError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CodegenError {
    /// Create a documentation error
    pub fn documentation(template: impl Into<String>, message: impl ToString) -> Self {
        Self::Documentation {
            template: template.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for code generation operations
pub type Result<T> = std::result::Result<T, CodegenError>;
