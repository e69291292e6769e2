//! Declarative output model
//!
//! The generator's final product: files hold namespace blocks, blocks hold
//! declarations, declarations hold members. Text emission happens later
//! through a [`crate::emitter::SourceEmitter`] which must keep member order
//! and honor the layout hints set by the formatting passes.

use std::path::PathBuf;

use serde::Serialize;
use templar_items::ItemId;

use crate::config::FileKind;

/// Kind of a type declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclarationKind {
    /// Data-access contract
    Interface,
    /// Implementation class
    Class,
    /// Static constant holder
    StaticClass,
}

/// Kind of a declaration member
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    /// Accessor property
    Property,
    /// Backing field or constant
    Field,
    /// Constructor overload
    Constructor,
}

/// Body of a member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "body", rename_all = "snake_case")]
pub enum MemberBody {
    /// Signature only
    None,
    /// Field lookup by display name and lowercase key, or by key alone
    FieldLookup {
        /// Display name part (absent for parameter-bag lookups)
        display_name: Option<String>,
        /// Lowercase field key
        key: String,
    },
    /// `.Value` projection off another accessor
    ValueProjection {
        /// Name of the projected accessor
        source: String,
    },
    /// Constant value
    Constant {
        /// Literal value
        value: String,
    },
    /// Constructor forwarding its parameters to the base type
    BaseCall {
        /// Forwarded argument names
        arguments: Vec<String>,
    },
}

/// A constructor parameter
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub type_name: String,
}

impl Parameter {
    /// Create a parameter
    pub fn new(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
        }
    }
}

/// An attribute attached to a declaration or member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attribute {
    /// Attribute name
    pub name: String,
    /// Marker only relevant to debuggers
    pub debug_only: bool,
    /// Emit on a line of its own
    pub own_line: bool,
}

impl Attribute {
    /// Create a debug-only marker attribute, initially inline
    pub fn debug_marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            debug_only: true,
            own_line: false,
        }
    }
}

/// Cosmetic hints for the text emitter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MemberLayout {
    /// Emit a blank line after this member
    pub blank_line_after: bool,
}

/// A declaration member
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Member {
    /// Member kind
    pub kind: MemberKind,
    /// Member name (the declaring type's name for constructors)
    pub name: String,
    /// Member type (empty for constructors)
    pub type_name: String,
    /// Constructor parameters
    pub parameters: Vec<Parameter>,
    /// Member body
    pub body: MemberBody,
    /// Attributes
    pub attributes: Vec<Attribute>,
    /// Documentation text
    pub docs: Option<String>,
    /// Layout hints
    pub layout: MemberLayout,
}

impl Member {
    /// Create a member without body, attributes or docs
    pub fn new(kind: MemberKind, name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            type_name: type_name.into(),
            parameters: Vec::new(),
            body: MemberBody::None,
            attributes: Vec::new(),
            docs: None,
            layout: MemberLayout::default(),
        }
    }

    /// Set the body
    pub fn with_body(mut self, body: MemberBody) -> Self {
        self.body = body;
        self
    }

    /// Set the documentation
    pub fn with_docs(mut self, docs: Option<String>) -> Self {
        self.docs = docs;
        self
    }

    /// Add an attribute
    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.push(attribute);
        self
    }
}

/// Cosmetic hints for a declaration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DeclarationLayout {
    /// Emit one base type per line
    pub wrap_bases: bool,
}

/// A type declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Declaration {
    /// Declaration kind
    pub kind: DeclarationKind,
    /// Type name
    pub name: String,
    /// Namespace the declaration belongs to
    pub namespace: String,
    /// Base types, in order
    pub bases: Vec<String>,
    /// Members, in order
    pub members: Vec<Member>,
    /// Nested declarations
    pub nested: Vec<Declaration>,
    /// Attributes
    pub attributes: Vec<Attribute>,
    /// Documentation text
    pub docs: Option<String>,
    /// Layout hints
    pub layout: DeclarationLayout,
}

impl Declaration {
    /// Create an empty declaration
    pub fn new(kind: DeclarationKind, name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            namespace: namespace.into(),
            bases: Vec::new(),
            members: Vec::new(),
            nested: Vec::new(),
            attributes: Vec::new(),
            docs: None,
            layout: DeclarationLayout::default(),
        }
    }

    /// Visit this declaration and every nested one, depth first
    pub fn visit_mut(&mut self, f: &mut dyn FnMut(&mut Declaration)) {
        f(self);
        for nested in &mut self.nested {
            nested.visit_mut(f);
        }
    }
}

/// A run of declarations sharing a namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamespaceBlock {
    /// Namespace name
    pub name: String,
    /// Declarations, in order
    pub declarations: Vec<Declaration>,
}

/// One generated file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceFile {
    /// Path relative to the set's output root
    pub relative_path: PathBuf,
    /// Template the file was generated for
    pub template_id: ItemId,
    /// Kind of file
    pub kind: FileKind,
    /// Organized import list
    pub imports: Vec<String>,
    /// Namespace blocks, in order
    pub namespaces: Vec<NamespaceBlock>,
}

impl SourceFile {
    /// Visit every declaration in the file, depth first
    pub fn visit_declarations_mut(&mut self, mut f: impl FnMut(&mut Declaration)) {
        for block in &mut self.namespaces {
            for declaration in &mut block.declarations {
                declaration.visit_mut(&mut f);
            }
        }
    }

    /// Every top-level declaration in file order
    pub fn declarations(&self) -> impl Iterator<Item = &Declaration> {
        self.namespaces.iter().flat_map(|b| b.declarations.iter())
    }
}
