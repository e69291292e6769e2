//! Error types for lexing and parsing serialized items

use thiserror::Error;

/// Errors raised while turning serialized item text into records
#[derive(Debug, Error)]
pub enum ItemsError {
    /// The character stream could not be tokenized
    #[error("Tokenization failed in {scope} at line {line}, column {column}: {message}")]
    Tokenization {
        /// Originating scope (usually the source file)
        scope: String,
        /// 1-based line of the offending character
        line: usize,
        /// 1-based column of the offending character
        column: usize,
        /// What went wrong
        message: String,
    },

    /// The token stream does not match the record grammar
    #[error("Grammar error in {scope} at line {line}, column {column}: {message}")]
    Grammar {
        /// Originating scope (usually the source file)
        scope: String,
        /// 1-based line of the offending token
        line: usize,
        /// 1-based column of the offending token
        column: usize,
        /// What went wrong
        message: String,
    },

    /// A record lacks one of its mandatory keys
    #[error("Missing required property '{key}' in {scope}")]
    MissingProperty {
        /// The missing key
        key: String,
        /// Enclosing record scope
        scope: String,
    },

    /// A mandatory key is present but its value is malformed
    #[error("Invalid value '{value}' for property '{key}' in {scope}")]
    InvalidProperty {
        /// The offending key
        key: String,
        /// The raw value
        value: String,
        /// Enclosing record scope
        scope: String,
    },

    /// Parser configuration could not be compiled
    #[error("Invalid parser configuration: {0}")]
    Configuration(String),

    /// IO error while reading an item file
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File being read
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl ItemsError {
    /// Create a MissingProperty error
    pub fn missing(key: impl Into<String>, scope: impl Into<String>) -> Self {
        Self::MissingProperty {
            key: key.into(),
            scope: scope.into(),
        }
    }

    /// Create an InvalidProperty error
    pub fn invalid(
        key: impl Into<String>,
        value: impl Into<String>,
        scope: impl Into<String>,
    ) -> Self {
        Self::InvalidProperty {
            key: key.into(),
            value: value.into(),
            scope: scope.into(),
        }
    }

    /// Whether the failure happened before any grammar rule was applied
    pub fn is_tokenization(&self) -> bool {
        matches!(self, Self::Tokenization { .. })
    }

    /// Whether the failure was a structural grammar failure
    pub fn is_grammar(&self) -> bool {
        matches!(self, Self::Grammar { .. })
    }
}

/// Result type for item operations
pub type Result<T> = std::result::Result<T, ItemsError>;

/// Compute a 1-based (line, column) pair for a byte offset in `text`
pub fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let offset = offset.min(text.len());
    let consumed = &text[..offset];
    let line = consumed.matches('\n').count() + 1;
    let column = match consumed.rfind('\n') {
        Some(pos) => consumed[pos + 1..].chars().count() + 1,
        None => consumed.chars().count() + 1,
    };
    (line, column)
}
