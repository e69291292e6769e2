//! Error types for the generation pipeline

use std::path::PathBuf;

use templar_codegen::CodegenError;
use templar_items::ItemsError;
use templar_model::ModelError;
use thiserror::Error;

use crate::stage::Stage;

/// Errors that can occur while running the pipeline
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Configuration could not be read or is invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// A stage produced nothing to hand to the next stage
    #[error("Stage {stage} failed: {reason}")]
    StageFailed {
        /// Failing stage
        stage: Stage,
        /// Why the stage failed
        reason: String,
    },

    /// The run was cancelled
    #[error("Pipeline cancelled during {0}")]
    Cancelled(Stage),

    /// Scanning an item directory failed
    #[error("Scan failed for {path}: {message}")]
    Scan {
        /// Directory being scanned
        path: PathBuf,
        /// What went wrong
        message: String,
    },

    /// Logging could not be initialized
    #[error("Logging error: {0}")]
    Logging(String),

    /// Parsing error
    #[error(transparent)]
    Items(#[from] ItemsError),

    /// Template model error
    #[error(transparent)]
    Model(#[from] ModelError),

    /// Code generation error
    #[error(transparent)]
    Codegen(#[from] CodegenError),

    /// TOML deserialization error
    #[error("Invalid configuration file: {0}")]
    Toml(#[from] toml::de::Error),

    /// JSON serialization error
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a stage failure
    pub fn stage_failed(stage: Stage, reason: impl Into<String>) -> Self {
        Self::StageFailed {
            stage,
            reason: reason.into(),
        }
    }
}

/// Result type for pipeline operations
pub type Result<T> = std::result::Result<T, PipelineError>;
