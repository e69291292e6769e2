//! Error types for the content graph and template model

use thiserror::Error;
use uuid::Uuid;

/// Errors raised while building or querying the template model
#[derive(Debug, Clone, Error)]
pub enum ModelError {
    /// A multi-reference field holds a token that is not an identifier
    #[error("Invalid reference '{token}' in field '{field}' of template {template}")]
    ReferenceParse {
        /// Field holding the reference list
        field: String,
        /// Template (path) owning the field
        template: String,
        /// Offending token
        token: String,
    },

    /// Base templates form a cycle
    #[error("Inheritance cycle detected: {}", format_cycle(.path))]
    InheritanceCycle {
        /// Template where the cycle was detected
        template: Uuid,
        /// Template ids along the cycle, starting and ending with the same id
        path: Vec<Uuid>,
    },

    /// A template id is not part of the collection
    #[error("Unknown template: {0}")]
    UnknownTemplate(Uuid),

    /// Invalid model or field type configuration
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ModelError {
    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }
}

fn format_cycle(path: &[Uuid]) -> String {
    path.iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// Result type for model operations
pub type Result<T> = std::result::Result<T, ModelError>;
