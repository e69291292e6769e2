//! Documentation synthesis
//!
//! Every declaration and member gets documentation rendered from a small
//! handlebars template, parameterized by the template or field it was
//! generated from. The `bracketed` helper renders an id in its canonical
//! external form (`{XXXXXXXX-XXXX-XXXX-XXXX-XXXXXXXXXXXX}`).

use std::collections::BTreeMap;

use handlebars::{handlebars_helper, no_escape, Handlebars};
use serde::Serialize;
use templar_model::{Template, TemplateField};
use uuid::Uuid;

use crate::error::{CodegenError, Result};

/// Documentation of a contract interface
pub const CONTRACT_DOC: &str = "contract";
/// Documentation of an implementation class
pub const IMPLEMENTATION_DOC: &str = "implementation";
/// Documentation of the constant holder of a template
pub const CONSTANTS_DOC: &str = "constants";
/// Documentation of a field accessor
pub const PROPERTY_DOC: &str = "property";
/// Documentation of a `.Value` projection
pub const VALUE_DOC: &str = "value";
/// Documentation of a field id constant
pub const FIELD_CONSTANT_DOC: &str = "field_constant";
/// Documentation of a constructor overload
pub const CONSTRUCTOR_DOC: &str = "constructor";

fn default_templates() -> BTreeMap<&'static str, &'static str> {
    BTreeMap::from([
        (
            CONTRACT_DOC,
            "Represents the {{template.display_name}} template\nPath: {{template.path}}\nID: {{bracketed template.id}}",
        ),
        (
            IMPLEMENTATION_DOC,
            "Concrete implementation of {{template.display_name}}\nID: {{bracketed template.id}}",
        ),
        (
            CONSTANTS_DOC,
            "Identifiers of the {{template.display_name}} template and its fields",
        ),
        (
            PROPERTY_DOC,
            "The {{field.label}} field ({{field.field_type}})\nSection: {{field.section}}\nID: {{bracketed field.id}}",
        ),
        (VALUE_DOC, "The value of the {{field.label}} field"),
        (FIELD_CONSTANT_DOC, "ID of the {{field.label}} field: {{bracketed field.id}}"),
        (CONSTRUCTOR_DOC, "Creates a {{template.display_name}} from {{source}}"),
    ])
}

handlebars_helper!(bracketed: |id: str| match Uuid::parse_str(id) {
    Ok(id) => templar_items::bracketed(&id),
    Err(_) => id.to_string(),
});

#[derive(Serialize)]
struct TemplateDocData<'a> {
    id: String,
    name: &'a str,
    display_name: &'a str,
    path: &'a str,
}

#[derive(Serialize)]
struct FieldDocData<'a> {
    id: String,
    name: &'a str,
    label: &'a str,
    field_type: &'a str,
    section: &'a str,
}

#[derive(Serialize)]
struct DocContext<'a> {
    template: TemplateDocData<'a>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<FieldDocData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a str>,
}

/// Renders documentation text for generated declarations and members
pub struct DocRenderer {
    registry: Handlebars<'static>,
}

impl std::fmt::Debug for DocRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocRenderer")
            .field("templates", &self.registry.get_templates().len())
            .finish()
    }
}

impl DocRenderer {
    /// Register the default templates, replaced by any configured overrides
    pub fn new(overrides: &BTreeMap<String, String>) -> Result<Self> {
        let mut registry = Handlebars::new();
        registry.set_strict_mode(true);
        registry.register_escape_fn(no_escape);
        registry.register_helper("bracketed", Box::new(bracketed));

        for (name, template) in default_templates() {
            let source = overrides.get(name).map(String::as_str).unwrap_or(template);
            registry
                .register_template_string(name, source)
                .map_err(|e| CodegenError::documentation(name, e))?;
        }
        for (name, source) in overrides {
            if !registry.has_template(name) {
                registry
                    .register_template_string(name, source)
                    .map_err(|e| CodegenError::documentation(name.as_str(), e))?;
            }
        }

        Ok(Self { registry })
    }

    /// Documentation of a template-level declaration
    pub fn template(&self, doc: &str, template: &Template) -> Result<String> {
        self.render(
            doc,
            &DocContext {
                template: template_data(template),
                field: None,
                source: None,
            },
        )
    }

    /// Documentation of a field-level member
    pub fn field(&self, doc: &str, template: &Template, field: &TemplateField) -> Result<String> {
        self.render(
            doc,
            &DocContext {
                template: template_data(template),
                field: Some(FieldDocData {
                    id: field.id.to_string(),
                    name: &field.name,
                    label: field.label(),
                    field_type: &field.field_type,
                    section: &field.section,
                }),
                source: None,
            },
        )
    }

    /// Documentation of a constructor overload
    pub fn constructor(&self, template: &Template, source: &str) -> Result<String> {
        self.render(
            CONSTRUCTOR_DOC,
            &DocContext {
                template: template_data(template),
                field: None,
                source: Some(source),
            },
        )
    }

    fn render(&self, doc: &str, context: &DocContext<'_>) -> Result<String> {
        self.registry
            .render(doc, context)
            .map(|text| text.trim().to_string())
            .map_err(|e| CodegenError::documentation(doc, e))
    }
}

fn template_data(template: &Template) -> TemplateDocData<'_> {
    TemplateDocData {
        id: template.id.to_string(),
        name: &template.name,
        display_name: &template.display_name,
        path: &template.path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> Template {
        let mut t = Template::well_known(
            Uuid::from_u128(0xab86861a_6030_46c5_b394_e8f99e8b87db),
            "Page",
            "/sitecore/templates/Page",
        );
        t.display_name = "Content Page".to_string();
        t.well_known = false;
        t
    }

    fn field() -> TemplateField {
        TemplateField {
            id: Uuid::from_u128(0x455a3e98_a627_4b40_8035_e683a0331ac7),
            name: "Title".to_string(),
            display_name: Some("Page Title".to_string()),
            field_type: "Single-Line Text".to_string(),
            section: "Content".to_string(),
            template_id: Uuid::nil(),
        }
    }

    #[test]
    fn test_template_docs_render_bracketed_id() {
        let docs = DocRenderer::new(&BTreeMap::new()).unwrap();
        let text = docs.template(CONTRACT_DOC, &template()).unwrap();
        assert!(text.starts_with("Represents the Content Page template"));
        assert!(text.ends_with("ID: {AB86861A-6030-46C5-B394-E8F99E8B87DB}"));
    }

    #[test]
    fn test_field_docs_use_label() {
        let docs = DocRenderer::new(&BTreeMap::new()).unwrap();
        let text = docs.field(PROPERTY_DOC, &template(), &field()).unwrap();
        assert!(text.starts_with("The Page Title field (Single-Line Text)"));
        assert!(text.contains("{455A3E98-A627-4B40-8035-E683A0331AC7}"));
    }

    #[test]
    fn test_override_replaces_default() {
        let overrides = BTreeMap::from([(VALUE_DOC.to_string(), "Value of {{field.name}}".to_string())]);
        let docs = DocRenderer::new(&overrides).unwrap();
        assert_eq!(docs.field(VALUE_DOC, &template(), &field()).unwrap(), "Value of Title");
    }

    #[test]
    fn test_no_html_escaping() {
        let docs = DocRenderer::new(&BTreeMap::new()).unwrap();
        let mut t = template();
        t.display_name = "Q&A <Page>".to_string();
        let text = docs.template(CONSTANTS_DOC, &t).unwrap();
        assert!(text.contains("Q&A <Page>"));
    }

    #[test]
    fn test_invalid_override_is_a_documentation_error() {
        let overrides = BTreeMap::from([(CONTRACT_DOC.to_string(), "{{#if}}".to_string())]);
        assert!(matches!(
            DocRenderer::new(&overrides),
            Err(CodegenError::Documentation { .. })
        ));
    }

    #[test]
    fn test_strict_mode_reports_unknown_variables() {
        let overrides = BTreeMap::from([(CONTRACT_DOC.to_string(), "{{template.missing}}".to_string())]);
        let docs = DocRenderer::new(&overrides).unwrap();
        assert!(docs.template(CONTRACT_DOC, &template()).is_err());
    }
}
