#![warn(missing_docs)]

//! Output planning and code generation for templar
//!
//! [`OutputPlanner`] maps every template set with an output path to a
//! [`TypeSet`] of planned files. [`CodegenEngine`] runs the configured type
//! generators over each file and produces a declarative [`SourceFile`]
//! model: namespace blocks, declarations and members with their
//! documentation and layout hints. A [`SourceEmitter`] turns that model into
//! text and [`OutputWriter`] puts it on disk, removing stale files.

pub mod config;
pub mod docs;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod formatting;
pub mod generators;
pub mod grouping;
pub mod imports;
pub mod model;
pub mod planner;
pub mod writer;

pub use config::{BasePolicy, CodegenConfig, ConstantsNamespace, FileKind};
pub use docs::DocRenderer;
pub use emitter::{OutlineEmitter, SourceEmitter};
pub use engine::{CodegenEngine, FileFailure, GeneratedSet};
pub use error::{CodegenError, Result};
pub use formatting::{passes_from_config, FormattingPass};
pub use generators::{generators_from_config, GenerationContext, TypeGenerator};
pub use grouping::group_consecutive;
pub use imports::organize_imports;
pub use model::{
    Attribute, Declaration, DeclarationKind, Member, MemberBody, MemberKind, NamespaceBlock,
    Parameter, SourceFile,
};
pub use planner::{OutputFilePlan, OutputPlan, OutputPlanner, TypeSet};
pub use writer::{OutputWriter, OutputWriterConfig, WriteAction, WriteReport};
