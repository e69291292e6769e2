#![warn(missing_docs)]

//! Staged generation pipeline for templar
//!
//! [`Pipeline`] drives a run from configuration to written files:
//! item files are discovered by a [`Scanner`], parsed, indexed into the
//! content graph, turned into a template model, planned and generated.
//! Per-element work is bounded by a configurable concurrency limit and can
//! be cancelled; every outcome lands in a [`Diagnostics`] tree.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod scanner;
pub mod stage;

pub use config::{load_config, parse_config, PipelineConfig, SetConfig, TemplarConfig};
pub use diagnostics::{Diagnostics, Entry, Scope, ScopeReport, Status, Tally, Verbosity};
pub use error::{PipelineError, Result};
pub use logging::init_logging;
pub use pipeline::{Pipeline, RunSummary, SetOutput};
pub use scanner::{DirectoryScanner, Scanner, StaticScanner};
pub use stage::{FanOut, Outcome, Stage};
