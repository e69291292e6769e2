//! Text emission seam
//!
//! [`SourceEmitter`] is the contract for turning a [`SourceFile`] into text.
//! [`OutlineEmitter`] renders a brace-delimited outline of the model with
//! C#-style keywords; a full language emitter plugs in through the same
//! trait.

use std::fmt::Write;

use crate::model::{Attribute, Declaration, DeclarationKind, Member, MemberBody, MemberKind, SourceFile};

/// Turns the declarative model into source text
pub trait SourceEmitter: Send + Sync {
    /// Emit a whole file, preserving declaration and member order
    fn emit(&self, file: &SourceFile) -> String;
}

/// Indented outline emitter honoring layout hints
#[derive(Debug, Clone)]
pub struct OutlineEmitter {
    indent: String,
}

impl Default for OutlineEmitter {
    fn default() -> Self {
        Self {
            indent: "    ".to_string(),
        }
    }
}

impl OutlineEmitter {
    /// Create an emitter with the given indentation unit
    pub fn new(indent: impl Into<String>) -> Self {
        Self {
            indent: indent.into(),
        }
    }

    fn pad(&self, depth: usize) -> String {
        self.indent.repeat(depth)
    }

    fn keyword(kind: DeclarationKind) -> &'static str {
        match kind {
            DeclarationKind::Interface => "public partial interface",
            DeclarationKind::Class => "public partial class",
            DeclarationKind::StaticClass => "public static partial class",
        }
    }

    fn docs(&self, out: &mut String, docs: Option<&str>, depth: usize) {
        let Some(docs) = docs else {
            return;
        };
        let pad = self.pad(depth);
        let _ = writeln!(out, "{pad}/// <summary>");
        for line in docs.lines() {
            let _ = writeln!(out, "{pad}/// {}", line.trim_end());
        }
        let _ = writeln!(out, "{pad}/// </summary>");
    }

    /// Own-line attributes are written out; inline ones are returned as a prefix
    fn attributes(&self, out: &mut String, attributes: &[Attribute], depth: usize) -> String {
        let pad = self.pad(depth);
        let mut inline = String::new();
        for attribute in attributes {
            if attribute.own_line {
                let _ = writeln!(out, "{pad}[{}]", attribute.name);
            } else {
                let _ = write!(inline, "[{}] ", attribute.name);
            }
        }
        inline
    }

    fn declaration(&self, out: &mut String, declaration: &Declaration, depth: usize) {
        let pad = self.pad(depth);
        self.docs(out, declaration.docs.as_deref(), depth);
        let inline = self.attributes(out, &declaration.attributes, depth);
        let _ = write!(out, "{pad}{inline}{} {}", Self::keyword(declaration.kind), declaration.name);

        if !declaration.bases.is_empty() {
            if declaration.layout.wrap_bases {
                let inner = self.pad(depth + 1);
                let _ = write!(out, " :");
                for (i, base) in declaration.bases.iter().enumerate() {
                    let separator = if i + 1 < declaration.bases.len() { "," } else { "" };
                    let _ = write!(out, "\n{inner}{base}{separator}");
                }
            } else {
                let _ = write!(out, " : {}", declaration.bases.join(", "));
            }
        }
        let _ = writeln!(out, "\n{pad}{{");

        for member in &declaration.members {
            self.member(out, declaration.kind, member, depth + 1);
        }
        for (i, nested) in declaration.nested.iter().enumerate() {
            if i > 0 || !declaration.members.is_empty() {
                out.push('\n');
            }
            self.declaration(out, nested, depth + 1);
        }

        let _ = writeln!(out, "{pad}}}");
    }

    fn member(&self, out: &mut String, owner: DeclarationKind, member: &Member, depth: usize) {
        let pad = self.pad(depth);
        self.docs(out, member.docs.as_deref(), depth);
        let inline = self.attributes(out, &member.attributes, depth);
        let access = if owner == DeclarationKind::Interface { "" } else { "public " };

        let line = match (&member.kind, &member.body) {
            (MemberKind::Constructor, MemberBody::BaseCall { arguments }) => {
                let parameters: Vec<String> = member
                    .parameters
                    .iter()
                    .map(|p| format!("{} {}", p.type_name, p.name))
                    .collect();
                format!(
                    "public {}({}) : base({}) {{ }}",
                    member.name,
                    parameters.join(", "),
                    arguments.join(", ")
                )
            }
            (MemberKind::Field, MemberBody::Constant { value }) => {
                format!(
                    "public static readonly {} {} = new {}(\"{}\");",
                    member.type_name, member.name, member.type_name, value
                )
            }
            (MemberKind::Field, _) => format!("private {} {};", member.type_name, member.name),
            (_, MemberBody::FieldLookup { display_name: Some(display), key }) => format!(
                "{access}{} {} => GetField(\"{}\", \"{}\");",
                member.type_name,
                member.name,
                escape(display),
                escape(key)
            ),
            (_, MemberBody::FieldLookup { display_name: None, key }) => format!(
                "{access}{} {} => GetParameter(\"{}\");",
                member.type_name,
                member.name,
                escape(key)
            ),
            (_, MemberBody::ValueProjection { source }) => {
                format!("{access}{} {} => {}.Value;", member.type_name, member.name, source)
            }
            _ => format!("{access}{} {} {{ get; }}", member.type_name, member.name),
        };

        let _ = writeln!(out, "{pad}{inline}{line}");
        if member.layout.blank_line_after {
            out.push('\n');
        }
    }
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

impl SourceEmitter for OutlineEmitter {
    fn emit(&self, file: &SourceFile) -> String {
        let mut out = String::new();
        for import in &file.imports {
            let _ = writeln!(out, "using {import};");
        }

        for block in &file.namespaces {
            if !out.is_empty() {
                out.push('\n');
            }
            let depth = if block.name.is_empty() {
                0
            } else {
                let _ = writeln!(out, "namespace {}\n{{", block.name);
                1
            };
            for (i, declaration) in block.declarations.iter().enumerate() {
                if i > 0 {
                    out.push('\n');
                }
                self.declaration(&mut out, declaration, depth);
            }
            if !block.name.is_empty() {
                let _ = writeln!(out, "}}");
            }
        }
        out
    }
}
