//! Import list organization

use std::cmp::Ordering;

/// Deduplicate and sort imports, standard namespace root first
///
/// Imports equal to `standard_root` or nested under it sort ahead of all
/// others; within each group the order is ordinal.
pub fn organize_imports(imports: &[String], standard_root: &str) -> Vec<String> {
    let mut organized: Vec<String> = imports
        .iter()
        .map(|i| i.trim().to_string())
        .filter(|i| !i.is_empty())
        .collect();
    organized.sort_by(|a, b| compare(a, b, standard_root));
    organized.dedup();
    organized
}

fn is_standard(import: &str, root: &str) -> bool {
    !root.is_empty()
        && (import == root
            || import
                .strip_prefix(root)
                .is_some_and(|rest| rest.starts_with('.')))
}

fn compare(a: &str, b: &str, root: &str) -> Ordering {
    is_standard(b, root)
        .cmp(&is_standard(a, root))
        .then_with(|| a.cmp(b))
}
