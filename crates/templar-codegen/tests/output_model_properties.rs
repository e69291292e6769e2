//! Property-based tests for the declarative output model
//!
//! Properties:
//! - namespace grouping preserves declaration order and never merges
//!   non-adjacent runs of the same namespace
//! - organized imports are unique, standard-root first, ordinal otherwise
//! - stale cleanup deletes exactly the owned files not produced this run

use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;

use proptest::prelude::*;
use tempfile::TempDir;
use templar_codegen::{
    group_consecutive, organize_imports, Declaration, DeclarationKind, OutputWriter,
};

fn namespace_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["NS1", "NS2", "NS3"]).prop_map(str::to_string)
}

fn import_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec![
        "System",
        "System.Linq",
        "System.Collections.Generic",
        "Systematic",
        "Alpha",
        "Templar.Fields",
        "Zeta.Core",
    ])
    .prop_map(str::to_string)
}

proptest! {
    #[test]
    fn prop_grouping_preserves_order_and_runs(namespaces in prop::collection::vec(namespace_strategy(), 0..20)) {
        let declarations: Vec<Declaration> = namespaces
            .iter()
            .enumerate()
            .map(|(i, ns)| Declaration::new(DeclarationKind::Class, format!("T{i}"), ns.clone()))
            .collect();

        let blocks = group_consecutive(declarations);

        let flattened: Vec<String> = blocks
            .iter()
            .flat_map(|b| b.declarations.iter().map(|d| d.name.clone()))
            .collect();
        let expected: Vec<String> = (0..namespaces.len()).map(|i| format!("T{i}")).collect();
        prop_assert_eq!(flattened, expected);

        let mut runs = namespaces.clone();
        runs.dedup();
        let block_names: Vec<String> = blocks.iter().map(|b| b.name.clone()).collect();
        prop_assert_eq!(block_names, runs);

        for pair in blocks.windows(2) {
            prop_assert_ne!(&pair[0].name, &pair[1].name);
        }
    }

    #[test]
    fn prop_imports_sorted_and_unique(imports in prop::collection::vec(import_strategy(), 0..12)) {
        let organized = organize_imports(&imports, "System");

        let unique: HashSet<&String> = organized.iter().collect();
        prop_assert_eq!(unique.len(), organized.len());
        let input: HashSet<&String> = imports.iter().collect();
        prop_assert_eq!(unique, input);

        let standard = |i: &str| i == "System" || i.starts_with("System.");
        let first_other = organized.iter().position(|i| !standard(i)).unwrap_or(organized.len());
        prop_assert!(organized[first_other..].iter().all(|i| !standard(i)));
        prop_assert!(organized[..first_other].windows(2).all(|w| w[0] < w[1]));
        prop_assert!(organized[first_other..].windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn test_stale_cleanup_deletes_only_unproduced_owned_files() {
    let dir = TempDir::new().unwrap();
    let writer = OutputWriter::new();
    let first = vec![
        (PathBuf::from("X.cs"), "x".to_string()),
        (PathBuf::from("Nested/Y.cs"), "y".to_string()),
    ];
    writer.write_all(dir.path(), &first).unwrap();
    fs::write(dir.path().join("Nested/readme.md"), "docs").unwrap();
    fs::write(dir.path().join("X.csproj"), "<Project />").unwrap();

    let second = vec![(PathBuf::from("X.cs"), "x".to_string())];
    let report = writer.write_all(dir.path(), &second).unwrap();

    assert_eq!(report.unchanged, vec![dir.path().join("X.cs")]);
    assert_eq!(report.deleted, vec![dir.path().join("Nested/Y.cs")]);
    assert!(dir.path().join("X.cs").exists());
    assert!(!dir.path().join("Nested/Y.cs").exists());
    assert!(dir.path().join("Nested/readme.md").exists());
    assert!(dir.path().join("X.csproj").exists());
}
