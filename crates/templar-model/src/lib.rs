#![warn(missing_docs)]

//! Content graph and template model for templar
//!
//! [`ContentDatabase`] indexes every parsed item across all sets with a
//! first-wins collision policy. [`TemplateBuilder`] reads template
//! definitions out of the graph into a [`TemplateCollection`], which answers
//! inheritance queries. [`FieldTypeResolver`] maps raw field type tags to
//! output types.

pub mod builder;
pub mod config;
pub mod database;
pub mod error;
pub mod field_types;
pub mod namespace;
pub mod naming;
pub mod template;

pub use builder::{parse_reference_list, TemplateBuildReport, TemplateBuilder, TemplateFailure};
pub use config::{ModelConfig, NamespacePolicyConfig};
pub use database::{ContentDatabase, ItemCollision};
pub use error::{ModelError, Result};
pub use field_types::{contract_name, FieldTypeResolver, FieldTypeTables};
pub use namespace::{AncestorHintPolicy, NamespacePolicy, PathTrimPolicy};
pub use template::{
    Template, TemplateCollection, TemplateCollision, TemplateField, TemplateKind, TemplateSet,
    WELL_KNOWN_SET_ID,
};
