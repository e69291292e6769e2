//! Template model builder
//!
//! Turns template-definition items of the content graph into [`Template`]s:
//! sections and field definitions below a template item become its own
//! fields, the shared base-template field becomes its base list and the
//! configured namespace policy yields its local namespace.

use templar_items::{Item, ItemId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::ModelConfig;
use crate::database::ContentDatabase;
use crate::error::{ModelError, Result};
use crate::namespace::{policy_from_config, NamespacePolicy};
use crate::template::{Template, TemplateCollection, TemplateField, TemplateSet, WELL_KNOWN_SET_ID};

/// A template that could not be built or validated
#[derive(Debug, Clone)]
pub struct TemplateFailure {
    /// Template item id
    pub template_id: ItemId,
    /// Template item path
    pub path: String,
    /// What went wrong
    pub error: ModelError,
}

/// Outcome of building the template model
#[derive(Debug, Clone)]
pub struct TemplateBuildReport {
    /// Every successfully built template
    pub collection: TemplateCollection,
    /// Non-fatal findings (collisions, unresolved bases)
    pub warnings: Vec<String>,
    /// Templates that failed to build or validate
    pub failures: Vec<TemplateFailure>,
}

/// Builds the template collection from the content graph
pub struct TemplateBuilder {
    config: ModelConfig,
    policy: Box<dyn NamespacePolicy>,
}

impl TemplateBuilder {
    /// Create a builder using the configured namespace policy
    pub fn new(config: ModelConfig) -> Self {
        let policy = policy_from_config(&config.namespace, config.template_marker_id);
        Self { config, policy }
    }

    /// Create a builder with an explicit namespace policy
    pub fn with_policy(config: ModelConfig, policy: Box<dyn NamespacePolicy>) -> Self {
        Self { config, policy }
    }

    /// Model configuration in use
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Build every template of every set
    pub fn build(&self, db: &ContentDatabase) -> TemplateBuildReport {
        let mut failures = Vec::new();
        let mut sets = vec![self.well_known_set()];

        for item_set in db.sets() {
            let mut set = TemplateSet::new(item_set.id, &item_set.name, &item_set.namespace);
            set.item_path = item_set.item_path.clone();
            set.output_path = item_set.output_path.clone();
            set.references = item_set.references.clone();

            let definitions = db.items_matching(|item| {
                item.template_id == self.config.template_marker_id
                    && db.owning_set(&item.id).is_some_and(|owner| owner.id == item_set.id)
            });
            for item in definitions {
                match self.build_template(item, db) {
                    Ok(template) => set.insert(template),
                    Err(error) => {
                        warn!(template = %item.path, error = %error, "Template build failed");
                        failures.push(TemplateFailure {
                            template_id: item.id,
                            path: item.path.clone(),
                            error,
                        });
                    }
                }
            }

            debug!(set = %set.name, templates = set.templates.len(), "Built template set");
            sets.push(set);
        }

        let collection = TemplateCollection::new(sets, self.config.parameter_base_ids.iter().copied());
        let mut warnings: Vec<String> = collection
            .collisions()
            .iter()
            .map(|c| c.to_string())
            .collect();

        for template in collection.templates() {
            if template.well_known {
                continue;
            }
            if let Ok(unresolved) = collection.unresolved_bases(&template.id) {
                for base in unresolved {
                    warnings.push(format!(
                        "template {} references unknown base template {}",
                        template.path, base
                    ));
                }
            }
            if let Err(error) = collection.transitive_bases(&template.id) {
                warn!(template = %template.path, error = %error, "Invalid inheritance");
                failures.push(TemplateFailure {
                    template_id: template.id,
                    path: template.path.clone(),
                    error,
                });
            }
        }

        info!(
            templates = collection.len(),
            warnings = warnings.len(),
            failures = failures.len(),
            policy = self.policy.name(),
            "Built template model"
        );

        TemplateBuildReport {
            collection,
            warnings,
            failures,
        }
    }

    /// Build a single template from its definition item
    pub fn build_template(&self, item: &Item, db: &ContentDatabase) -> Result<Template> {
        let display_name = item
            .versioned_field(&self.config.language, &self.config.display_name_field_name)
            .map(|f| f.value.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| item.name.clone());

        let mut template = Template {
            id: item.id,
            name: item.name.clone(),
            display_name,
            fields: self.own_fields(item, db),
            base_template_ids: self.base_template_ids(item)?,
            local_namespace: self.policy.local_namespace(item, db),
            path: item.path.clone(),
            set_id: item.set_id,
            well_known: false,
        };
        template.sort_fields();
        Ok(template)
    }

    fn own_fields(&self, template: &Item, db: &ContentDatabase) -> Vec<TemplateField> {
        db.children(&template.id)
            .into_iter()
            .filter(|section| section.template_id == self.config.section_template_id)
            .flat_map(|section| {
                db.children(&section.id)
                    .into_iter()
                    .filter(|field| field.template_id == self.config.field_template_id)
                    .map(|field| TemplateField {
                        id: field.id,
                        name: field.name.clone(),
                        display_name: field
                            .versioned_field(&self.config.language, &self.config.display_name_field_name)
                            .map(|f| f.value.trim().to_string())
                            .filter(|v| !v.is_empty()),
                        field_type: field
                            .shared_field(&self.config.type_field_name)
                            .map(|f| f.value.to_string())
                            .unwrap_or_default(),
                        section: section.name.clone(),
                        template_id: template.id,
                    })
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    fn base_template_ids(&self, item: &Item) -> Result<Vec<ItemId>> {
        let Some(field) = item
            .shared_field_by_id(&self.config.base_templates_field_id)
            .or_else(|| item.shared_field(&self.config.base_templates_field_name))
        else {
            return Ok(Vec::new());
        };

        parse_reference_list(&field.value).map_err(|token| ModelError::ReferenceParse {
            field: field.name.to_string(),
            template: item.path.clone(),
            token,
        })
    }

    fn well_known_set(&self) -> TemplateSet {
        let mut set = TemplateSet::new(WELL_KNOWN_SET_ID, "<well-known>", "");
        set.insert(Template::well_known(
            self.config.standard_template_id,
            "Standard template",
            "/sitecore/templates/System/Templates/Standard template",
        ));
        set.insert(Template::well_known(
            self.config.folder_template_id,
            "Folder",
            "/sitecore/templates/Common/Folder",
        ));
        set
    }
}

/// Split a multi-reference value on `|` or line breaks and parse every id
///
/// Returns the offending token on failure.
pub fn parse_reference_list(value: &str) -> std::result::Result<Vec<ItemId>, String> {
    value
        .split(['|', '\r', '\n'])
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| Uuid::parse_str(token).map_err(|_| token.to_string()))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::collections::{BTreeMap, HashMap};
    use std::path::PathBuf;
    use std::sync::Arc;

    use templar_items::{Field, ItemSet, LanguageVersion};

    use super::*;
    use crate::config::*;
    use crate::template::TemplateKind;

    struct Fixture {
        set: ItemSet,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                set: ItemSet::new(Uuid::from_u128(900), "Feature", "Site.Feature")
                    .with_output_path("out"),
            }
        }

        fn add(&mut self, id: u128, parent: ItemId, path: &str, template_id: Uuid, shared: Vec<Field>) -> ItemId {
            let item = Item {
                id: Uuid::from_u128(id),
                name: path.rsplit('/').next().unwrap_or_default().to_string(),
                parent_id: parent,
                path: path.to_string(),
                origin: PathBuf::from("test.item"),
                set_id: self.set.id,
                shared_fields: shared,
                template_id,
                template_name: String::new(),
                versions: vec![],
                hints: HashMap::new(),
            };
            let id = item.id;
            self.set.push(Arc::new(item));
            id
        }

        fn template(&mut self, id: u128, name: &str, bases: &str) -> ItemId {
            let shared = if bases.is_empty() {
                vec![]
            } else {
                vec![Field::new(BASE_TEMPLATES_FIELD_ID, "__Base template", bases)]
            };
            let path = format!("/sitecore/templates/Feature/Nav/{name}");
            self.add(id, ROOT_ITEM_ID, &path, TEMPLATE_MARKER_ID, shared)
        }

        fn field(&mut self, id: u128, template: ItemId, template_name: &str, name: &str, kind: &str) {
            let section_path = format!("/sitecore/templates/Feature/Nav/{template_name}/Data");
            let section = Uuid::from_u128(id + 10_000);
            if !self.set.items().iter().any(|i| i.id == section) {
                self.add(id + 10_000, template, &section_path, SECTION_TEMPLATE_ID, vec![]);
            }
            self.add(
                id,
                section,
                &format!("{section_path}/{name}"),
                FIELD_TEMPLATE_ID,
                vec![Field::new(Uuid::from_u128(5), "Type", kind)],
            );
        }
    }

    #[test]
    fn test_build_fields_bases_and_namespace() {
        let mut fx = Fixture::new();
        let base = fx.template(2, "Base", "");
        let page = fx.template(1, "Page", &format!("{{{}}}", base.to_string().to_uppercase()));
        fx.field(100, page, "Page", "Title", "Single-Line Text");
        fx.field(101, page, "Page", "Body", "Rich Text");
        fx.field(200, base, "Base", "Icon", "Image");
        let db = ContentDatabase::build(vec![fx.set]);

        let report = TemplateBuilder::new(ModelConfig::default()).build(&db);
        assert!(report.failures.is_empty());
        let page = report.collection.get(&page).unwrap();
        assert_eq!(page.base_template_ids, vec![base]);
        let names: Vec<_> = page.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["Body", "Title"]);
        assert_eq!(page.fields[0].field_type, "Rich Text");
        assert_eq!(page.fields[0].section, "Data");
        assert_eq!(page.local_namespace, "Nav");
        assert_eq!(report.collection.namespace_of(page), "Site.Feature.Nav");
        assert_eq!(report.collection.all_fields(&page.id).unwrap().len(), 3);
    }

    #[test]
    fn test_well_known_templates_are_injected_first() {
        let db = ContentDatabase::build(vec![]);
        let report = TemplateBuilder::new(ModelConfig::default()).build(&db);
        let first = report.collection.sets().next().unwrap();
        assert!(first.is_well_known());
        assert!(report.collection.get(&STANDARD_TEMPLATE_ID).unwrap().well_known);
        assert!(report.collection.get(&FOLDER_TEMPLATE_ID).unwrap().well_known);
    }

    #[test]
    fn test_malformed_base_reference_fails_that_template_only() {
        let mut fx = Fixture::new();
        fx.template(1, "Broken", "{not-a-guid}");
        let ok = fx.template(2, "Fine", "");
        let db = ContentDatabase::build(vec![fx.set]);

        let report = TemplateBuilder::new(ModelConfig::default()).build(&db);
        assert_eq!(report.failures.len(), 1);
        match &report.failures[0].error {
            ModelError::ReferenceParse { field, token, .. } => {
                assert_eq!(field, "__Base template");
                assert_eq!(token, "{not-a-guid}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(report.collection.get(&ok).is_some());
    }

    #[test]
    fn test_unresolved_base_is_a_warning_and_cycle_a_failure() {
        let mut fx = Fixture::new();
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        fx.template(1, "A", &format!("{b}|{}", Uuid::from_u128(99)));
        fx.template(2, "B", &a.to_string());
        let db = ContentDatabase::build(vec![fx.set]);

        let report = TemplateBuilder::new(ModelConfig::default()).build(&db);
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.failures.len(), 2);
        assert!(report
            .failures
            .iter()
            .all(|f| matches!(f.error, ModelError::InheritanceCycle { .. })));
    }

    #[test]
    fn test_parameter_bag_detection() {
        let mut fx = Fixture::new();
        let id = fx.template(1, "Params", &RENDERING_PARAMETERS_TEMPLATE_ID.to_string());
        let db = ContentDatabase::build(vec![fx.set]);
        let report = TemplateBuilder::new(ModelConfig::default()).build(&db);
        assert_eq!(report.collection.kind(&id).unwrap(), TemplateKind::ParameterBag);
    }

    #[test]
    fn test_display_name_from_versioned_field() {
        let mut fx = Fixture::new();
        let id = fx.template(1, "Page", "");
        let mut item = (*fx.set.items()[0]).clone();
        let mut fields = BTreeMap::new();
        let display = Field::new(Uuid::from_u128(8), "__Display name", "Content Page");
        fields.insert(display.id, display);
        item.versions.push(LanguageVersion {
            language: "en".to_string(),
            version: 1,
            revision: Uuid::nil(),
            fields,
        });
        let builder = TemplateBuilder::new(ModelConfig::default());
        let db = ContentDatabase::build(vec![fx.set]);
        let template = builder.build_template(&item, &db).unwrap();
        assert_eq!(template.id, id);
        assert_eq!(template.display_name, "Content Page");
    }

    #[test]
    fn test_parse_reference_list_separators() {
        let a = Uuid::from_u128(1);
        let b = Uuid::from_u128(2);
        let value = format!("{{{a}}}|\r\n{b}\n");
        assert_eq!(parse_reference_list(&value).unwrap(), vec![a, b]);
        assert_eq!(parse_reference_list("").unwrap(), Vec::<Uuid>::new());
        assert_eq!(parse_reference_list("x|y").unwrap_err(), "x");
    }
}
