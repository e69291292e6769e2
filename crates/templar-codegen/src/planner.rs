//! Output planning
//!
//! One [`TypeSet`] per template set with an output path; one
//! [`OutputFilePlan`] per template. Sets without an output path are
//! referenced-only libraries and are skipped with a warning.
//!
//! Templates of one set whose sanitized names land on the same file keep
//! the name in plan order for the first; later ones get a numeric suffix on
//! both the file and the generated type name.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use templar_items::{ItemId, ItemSetId};
use templar_model::{naming, TemplateCollection, TemplateKind, TemplateSet};
use tracing::{debug, warn};

use crate::config::FileKind;
use crate::error::Result;

/// A planned output file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFilePlan {
    /// Template generated into the file
    pub template_id: ItemId,
    /// Path relative to the set's output root
    pub relative_path: PathBuf,
    /// Full namespace of the template
    pub namespace: String,
    /// Kind of file
    pub kind: FileKind,
}

/// Planned output of one template set
#[derive(Debug, Clone)]
pub struct TypeSet {
    /// Source set id
    pub set_id: ItemSetId,
    /// Source set name
    pub name: String,
    /// Root namespace
    pub namespace: String,
    /// Output root directory
    pub root_path: PathBuf,
    /// Planned files, ordered by relative path
    pub files: Vec<OutputFilePlan>,
    /// Resolved referenced sets
    pub references: Vec<Arc<TemplateSet>>,
    /// Type names disambiguated by the planner, across every planned set
    pub renamed: Arc<HashMap<ItemId, String>>,
}

/// Outcome of planning
#[derive(Debug, Clone, Default)]
pub struct OutputPlan {
    /// Sets that produce output
    pub type_sets: Vec<TypeSet>,
    /// Non-fatal findings (skipped sets, unknown references, name collisions)
    pub warnings: Vec<String>,
}

/// Plans output files for every template set
#[derive(Debug, Clone)]
pub struct OutputPlanner {
    extension: String,
}

impl OutputPlanner {
    /// Create a planner producing files with the given extension
    pub fn new(extension: impl Into<String>) -> Self {
        Self {
            extension: extension.into().trim_start_matches('.').to_string(),
        }
    }

    /// Plan every set of the collection
    pub fn plan(&self, collection: &TemplateCollection) -> Result<OutputPlan> {
        let mut plan = OutputPlan::default();
        let mut renamed = HashMap::new();

        for set in collection.sets() {
            let Some(root_path) = set.output_path.clone().filter(|p| !p.as_os_str().is_empty()) else {
                if !set.is_well_known() {
                    let message = format!("set '{}' has no output path, skipping generation", set.name);
                    warn!(set = %set.name, "Set has no output path, skipping generation");
                    plan.warnings.push(message);
                }
                continue;
            };

            let mut references = Vec::new();
            for reference in &set.references {
                match collection.set(reference) {
                    Some(referenced) => references.push(referenced.clone()),
                    None => plan.warnings.push(format!(
                        "set '{}' references unknown set {}",
                        set.name, reference
                    )),
                }
            }

            let mut files = Vec::with_capacity(set.templates.len());
            for template in set.templates.values() {
                // Templates shadowed by another set's copy are generated there.
                let owned = collection
                    .get(&template.id)
                    .is_some_and(|indexed| indexed.set_id == set.id);
                if !owned {
                    continue;
                }
                let kind = match collection.kind(&template.id)? {
                    TemplateKind::Ordinary => FileKind::Template,
                    TemplateKind::ParameterBag => FileKind::Parameters,
                };
                files.push(OutputFilePlan {
                    template_id: template.id,
                    relative_path: self.relative_path(&template.local_namespace, &template.name),
                    namespace: collection.namespace_of(template),
                    kind,
                });
            }
            sort_files(&mut files);
            if self.disambiguate(collection, &mut files, &mut renamed, &mut plan.warnings) {
                sort_files(&mut files);
            }

            debug!(set = %set.name, files = files.len(), "Planned type set");
            plan.type_sets.push(TypeSet {
                set_id: set.id,
                name: set.name.clone(),
                namespace: set.namespace.clone(),
                root_path,
                files,
                references,
                renamed: Arc::default(),
            });
        }

        let renamed = Arc::new(renamed);
        for type_set in &mut plan.type_sets {
            type_set.renamed = renamed.clone();
        }
        Ok(plan)
    }

    /// Suffix files whose paths clash (case-insensitively) with an earlier one
    ///
    /// Returns whether anything was renamed.
    fn disambiguate(
        &self,
        collection: &TemplateCollection,
        files: &mut [OutputFilePlan],
        renamed: &mut HashMap<ItemId, String>,
        warnings: &mut Vec<String>,
    ) -> bool {
        let mut taken: HashSet<String> = HashSet::with_capacity(files.len());
        let mut any = false;
        for file in files.iter_mut() {
            if taken.insert(path_key(&file.relative_path)) {
                continue;
            }
            let Some(template) = collection.get(&file.template_id) else {
                continue;
            };

            let base = template.type_name();
            let directory = file.relative_path.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut counter = 2;
            let (name, path) = loop {
                let name = format!("{}{}", base, counter);
                let path = directory.join(format!("{}.{}", name, self.extension));
                if taken.insert(path_key(&path)) {
                    break (name, path);
                }
                counter += 1;
            };

            let message = format!(
                "template {} generates the same name as another template in {}, renamed to '{}'",
                template.path,
                file.relative_path.display(),
                name
            );
            warn!(template = %template.path, renamed = %name, "Generated name collision");
            warnings.push(message);
            file.relative_path = path;
            renamed.insert(template.id, name);
            any = true;
        }
        any
    }

    fn relative_path(&self, local_namespace: &str, template_name: &str) -> PathBuf {
        let mut path: PathBuf = local_namespace
            .split('.')
            .filter(|s| !s.is_empty())
            .collect();
        path.push(format!("{}.{}", naming::identifier(template_name), self.extension));
        path
    }
}

fn sort_files(files: &mut [OutputFilePlan]) {
    files.sort_by(|a, b| {
        a.relative_path
            .cmp(&b.relative_path)
            .then_with(|| a.template_id.cmp(&b.template_id))
    });
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

#[cfg(test)]
mod tests {
    use templar_model::{Template, TemplateSet, WELL_KNOWN_SET_ID};
    use uuid::Uuid;

    use super::*;

    fn template(id: u128, set: Uuid, name: &str, ns: &str) -> Template {
        let mut t = Template::well_known(Uuid::from_u128(id), name, &format!("/t/{name}"));
        t.set_id = set;
        t.local_namespace = ns.to_string();
        t.well_known = false;
        t
    }

    fn set(id: u128, name: &str, output: Option<&str>) -> TemplateSet {
        let mut set = TemplateSet::new(Uuid::from_u128(id), name, format!("Site.{name}"));
        set.output_path = output.map(PathBuf::from);
        set
    }

    #[test]
    fn test_one_file_per_template() {
        let mut a = set(1, "Feature", Some("out"));
        a.insert(template(10, a.id, "Page Type", "Pages"));
        a.insert(template(11, a.id, "Base", ""));
        let collection = TemplateCollection::new(vec![a], []);

        let plan = OutputPlanner::new(".cs").plan(&collection).unwrap();
        assert_eq!(plan.type_sets.len(), 1);
        let paths: Vec<_> = plan.type_sets[0].files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(paths, vec![PathBuf::from("Base.cs"), PathBuf::from("Pages/PageType.cs")]);
        assert_eq!(plan.type_sets[0].files[1].namespace, "Site.Feature.Pages");
    }

    #[test]
    fn test_sets_without_output_are_skipped_with_warning() {
        let well_known = TemplateSet::new(WELL_KNOWN_SET_ID, "<well-known>", "");
        let library = set(2, "Library", None);
        let collection = TemplateCollection::new(vec![well_known, library], []);
        let plan = OutputPlanner::new("cs").plan(&collection).unwrap();
        assert!(plan.type_sets.is_empty());
        assert_eq!(plan.warnings.len(), 1);
        assert!(plan.warnings[0].contains("Library"));
    }

    #[test]
    fn test_references_are_resolved() {
        let library = set(2, "Library", None);
        let mut feature = set(1, "Feature", Some("out"));
        feature.references = vec![library.id, Uuid::from_u128(99)];
        let collection = TemplateCollection::new(vec![library, feature], []);
        let plan = OutputPlanner::new("cs").plan(&collection).unwrap();
        assert_eq!(plan.type_sets[0].references.len(), 1);
        assert_eq!(plan.type_sets[0].references[0].name, "Library");
        assert!(plan.warnings.iter().any(|w| w.contains("unknown set")));
    }

    #[test]
    fn test_clashing_names_are_suffixed_with_warning() {
        let mut a = set(1, "Feature", Some("out"));
        a.insert(template(10, a.id, "Page", "Pages"));
        a.insert(template(11, a.id, "Page!", "Pages"));
        a.insert(template(12, a.id, "Nav Items", ""));
        a.insert(template(13, a.id, "NavItems", ""));
        a.insert(template(14, a.id, "Page", "Other"));
        let collection = TemplateCollection::new(vec![a], []);

        let plan = OutputPlanner::new("cs").plan(&collection).unwrap();
        let set = &plan.type_sets[0];
        let paths: Vec<_> = set.files.iter().map(|f| f.relative_path.clone()).collect();
        assert_eq!(
            paths,
            vec![
                PathBuf::from("NavItems.cs"),
                PathBuf::from("NavItems2.cs"),
                PathBuf::from("Other/Page.cs"),
                PathBuf::from("Pages/Page.cs"),
                PathBuf::from("Pages/Page2.cs"),
            ]
        );
        assert_eq!(set.renamed.len(), 2);
        assert_eq!(set.renamed.get(&Uuid::from_u128(11)).map(String::as_str), Some("Page2"));
        assert_eq!(set.renamed.get(&Uuid::from_u128(13)).map(String::as_str), Some("NavItems2"));
        assert_eq!(plan.warnings.len(), 2);
        assert!(plan.warnings.iter().any(|w| w.contains("'Page2'")));
    }

    #[test]
    fn test_parameter_bag_file_kind() {
        let mut a = set(1, "Feature", Some("out"));
        let mut t = template(10, a.id, "Params", "");
        t.base_template_ids = vec![Uuid::from_u128(500)];
        a.insert(t);
        let collection = TemplateCollection::new(vec![a], [Uuid::from_u128(500)]);
        let plan = OutputPlanner::new("cs").plan(&collection).unwrap();
        assert_eq!(plan.type_sets[0].files[0].kind, FileKind::Parameters);
    }
}
