//! Namespace grouping by consecutive runs
//!
//! Declarations are grouped into namespace blocks in input order. A
//! namespace that recurs after a different one opens a new block; blocks are
//! never merged across a gap.

use crate::model::{Declaration, NamespaceBlock};

/// Group declarations into blocks of consecutive identical namespaces
pub fn group_consecutive(declarations: Vec<Declaration>) -> Vec<NamespaceBlock> {
    let mut blocks: Vec<NamespaceBlock> = Vec::new();
    for declaration in declarations {
        match blocks.last_mut() {
            Some(block) if block.name == declaration.namespace => {
                block.declarations.push(declaration)
            }
            _ => blocks.push(NamespaceBlock {
                name: declaration.namespace.clone(),
                declarations: vec![declaration],
            }),
        }
    }
    blocks
}
