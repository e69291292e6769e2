//! Formatting passes over the declarative model
//!
//! Passes are cosmetic: they only set layout hints, never add, remove or
//! reorder declarations or members, and applying a pass twice gives the same
//! result as applying it once.

use crate::error::{CodegenError, Result};
use crate::model::{Declaration, MemberKind, SourceFile};

/// An idempotent, order-preserving rewrite of a generated file
pub trait FormattingPass: Send + Sync {
    /// Configuration name of the pass
    fn name(&self) -> &'static str;

    /// Rewrite the file in place
    fn apply(&self, file: &mut SourceFile);
}

/// Build the pass list from configured names
pub fn passes_from_config(
    names: &[String],
    base_list_wrap_threshold: usize,
) -> Result<Vec<Box<dyn FormattingPass>>> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn FormattingPass>> {
            match name.trim().to_lowercase().as_str() {
                "backing_field_spacing" => Ok(Box::new(BackingFieldSpacing)),
                "property_spacing" => Ok(Box::new(PropertySpacing)),
                "base_list_wrap" => Ok(Box::new(BaseListWrap {
                    threshold: base_list_wrap_threshold,
                })),
                "debug_marker_lines" => Ok(Box::new(DebugMarkerLines)),
                _ => Err(CodegenError::UnknownFormattingPass(name.clone())),
            }
        })
        .collect()
}

/// Blank line after every run of backing fields
#[derive(Debug, Clone, Copy)]
pub struct BackingFieldSpacing;

impl FormattingPass for BackingFieldSpacing {
    fn name(&self) -> &'static str {
        "backing_field_spacing"
    }

    fn apply(&self, file: &mut SourceFile) {
        file.visit_declarations_mut(|declaration: &mut Declaration| {
            let count = declaration.members.len();
            for i in 0..count {
                let is_field = declaration.members[i].kind == MemberKind::Field;
                let next_is_field = declaration
                    .members
                    .get(i + 1)
                    .is_some_and(|m| m.kind == MemberKind::Field);
                if is_field && !next_is_field && i + 1 < count {
                    declaration.members[i].layout.blank_line_after = true;
                }
            }
        });
    }
}

/// Blank line between consecutive properties, except after the last one
#[derive(Debug, Clone, Copy)]
pub struct PropertySpacing;

impl FormattingPass for PropertySpacing {
    fn name(&self) -> &'static str {
        "property_spacing"
    }

    fn apply(&self, file: &mut SourceFile) {
        file.visit_declarations_mut(|declaration: &mut Declaration| {
            let last_property = declaration
                .members
                .iter()
                .rposition(|m| m.kind == MemberKind::Property);
            for (i, member) in declaration.members.iter_mut().enumerate() {
                if member.kind == MemberKind::Property && Some(i) != last_property {
                    member.layout.blank_line_after = true;
                }
            }
        });
    }
}

/// One base type per line once a base list exceeds the threshold
#[derive(Debug, Clone, Copy)]
pub struct BaseListWrap {
    /// Lists longer than this are wrapped
    pub threshold: usize,
}

impl FormattingPass for BaseListWrap {
    fn name(&self) -> &'static str {
        "base_list_wrap"
    }

    fn apply(&self, file: &mut SourceFile) {
        let threshold = self.threshold;
        file.visit_declarations_mut(|declaration: &mut Declaration| {
            if declaration.bases.len() > threshold {
                declaration.layout.wrap_bases = true;
            }
        });
    }
}

/// Debug-only markers go on a line of their own
#[derive(Debug, Clone, Copy)]
pub struct DebugMarkerLines;

impl FormattingPass for DebugMarkerLines {
    fn name(&self) -> &'static str {
        "debug_marker_lines"
    }

    fn apply(&self, file: &mut SourceFile) {
        file.visit_declarations_mut(|declaration: &mut Declaration| {
            let attributes = declaration
                .attributes
                .iter_mut()
                .chain(declaration.members.iter_mut().flat_map(|m| m.attributes.iter_mut()));
            for attribute in attributes.filter(|a| a.debug_only) {
                attribute.own_line = true;
            }
        });
    }
}
