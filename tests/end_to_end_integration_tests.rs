//! End-to-end tests: TOML configuration and serialized items in, generated files out

use std::fs;
use std::path::Path;

use tempfile::TempDir;
use templar_pipeline::{load_config, Pipeline, Verbosity};

const ROOT: &str = "{11111111-1111-1111-1111-111111111111}";
const MARKER: &str = "{AB86861A-6030-46C5-B394-E8F99E8B87DB}";
const SECTION: &str = "{E269FBB5-3750-427A-9149-7AA950B49301}";
const FIELD: &str = "{455A3E98-A627-4B40-8035-E683A0331AC7}";
const BASES: &str = "{12C33F3F-86C5-43A5-AEB4-5598CEC45116}";
const TYPE: &str = "{AB162CC0-DC80-4ABF-8871-998EE5D7BA32}";

const FOLDER: &str = "{A87A00B1-E6DB-45AB-8B54-636FEC3B5523}";

const PAGE: &str = "{AAAAAAAA-0000-0000-0000-000000000001}";
const BASE: &str = "{BBBBBBBB-0000-0000-0000-000000000001}";
const CARD: &str = "{CCCCCCCC-0000-0000-0000-000000000001}";
const NAV_FOLDER: &str = "{DDDDDDDD-0000-0000-0000-000000000001}";
const CARDS_FOLDER: &str = "{DDDDDDDD-0000-0000-0000-000000000002}";

fn record(id: &str, parent: &str, path: &str, template: &str, key: &str, fields: &[(&str, &str, &str)]) -> String {
    let name = path.rsplit('/').next().unwrap_or_default();
    let mut text = format!(
        "----item----\nversion: 1\nid: {id}\ndatabase: master\npath: {path}\nparent: {parent}\nname: {name}\ntemplate: {template}\ntemplatekey: {key}\n\n"
    );
    for (field_id, field_name, value) in fields {
        text.push_str(&format!(
            "----field----\nfield: {field_id}\nname: {field_name}\nkey: {}\ncontent-length: {}\n\n{value}\n",
            field_name.to_lowercase(),
            value.len()
        ));
    }
    text
}

fn template_file(id: &str, path: &str, bases: &[&str], field: (&str, &str)) -> String {
    template_under(ROOT, id, path, bases, field)
}

fn template_under(parent: &str, id: &str, path: &str, bases: &[&str], field: (&str, &str)) -> String {
    let prefix = &id[..id.len() - 3];
    let section_id = format!("{prefix}A1}}");
    let field_id = format!("{prefix}A2}}");
    let base_list = bases.join("|");
    let mut shared = Vec::new();
    if !bases.is_empty() {
        shared.push((BASES, "__Base template", base_list.as_str()));
    }

    let mut text = record(id, parent, path, MARKER, "Template", &shared);
    text += &record(&section_id, id, &format!("{path}/Data"), SECTION, "Template section", &[]);
    text += &record(
        &field_id,
        &section_id,
        &format!("{path}/Data/{}", field.0),
        FIELD,
        "Template field",
        &[(TYPE, "Type", field.1)],
    );
    text
}

fn write(path: &Path, text: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, text).unwrap();
}

#[tokio::test]
async fn test_referenced_set_contributes_bases_but_no_output() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("foundation/items/base.item"),
        &template_file(BASE, "/sitecore/templates/Foundation/Content/Base", &[], ("Keywords", "Multi-Line Text")),
    );
    write(
        &dir.path().join("feature/items/page.item"),
        &template_file(PAGE, "/sitecore/templates/Feature/Pages/Page", &[BASE], ("Show Title", "Checkbox")),
    );
    write(
        &dir.path().join("templar.toml"),
        r#"
[pipeline]
max_concurrency = 2
verbosity = "trace"

[[sets]]
name = "Foundation"
namespace = "Site.Foundation"
item_path = "foundation/items"

[[sets]]
name = "Feature"
namespace = "Site.Feature"
item_path = "feature/items"
output_path = "feature/code"
references = ["Foundation"]
"#,
    );

    let config = load_config(&dir.path().join("templar.toml")).unwrap();
    let pipeline = Pipeline::new(config);
    let summary = pipeline.run().await.unwrap();

    assert_eq!(summary.sets, 2);
    assert_eq!(summary.templates, 2);
    assert_eq!(summary.type_sets, 1);
    assert_eq!(summary.files_written, 1);
    assert!(!dir.path().join("foundation/code").exists());

    let page = fs::read_to_string(dir.path().join("feature/code/Pages/Page.cs")).unwrap();
    assert!(page.contains("namespace Site.Feature.Pages"));
    assert!(page.contains("Site.Foundation.Content.IBase"));
    assert!(page.contains("ShowTitle"));
    assert!(page.contains("bool ShowTitleValue"));
    assert!(page.contains("Keywords"));

    let rendered = pipeline.diagnostics().render(Verbosity::Summary);
    assert!(rendered.starts_with("templar [PASS]"));

    let json: serde_json::Value = serde_json::from_str(&pipeline.diagnostics().to_json().unwrap()).unwrap();
    assert_eq!(json["name"], "templar");

    let report: serde_json::Value = serde_json::to_value(&summary).unwrap();
    assert_eq!(report["files_written"], 1);
}

#[tokio::test]
async fn test_directory_hints_drive_ancestor_namespaces() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("items/nav/page.item"),
        &template_file(PAGE, "/sitecore/templates/Feature/Pages/Page", &[BASE], ("Title", "Single-Line Text")),
    );
    write(
        &dir.path().join("items/base.item"),
        &template_file(BASE, "/sitecore/templates/Feature/Pages/Base", &[], ("Keywords", "Multi-Line Text")),
    );
    write(
        &dir.path().join("templar.toml"),
        r#"
[model.namespace]
policy = "ancestor_hint"
strip_prefix = "Site.Feature"

[[sets]]
name = "Feature"
namespace = "Site.Feature"
item_path = "items"
output_path = "code"

[sets.namespace_hints]
nav = "Site.Feature.Navigation"
"#,
    );

    let config = load_config(&dir.path().join("templar.toml")).unwrap();
    let summary = Pipeline::new(config).run().await.unwrap();
    assert_eq!(summary.files_written, 2);

    let page = fs::read_to_string(dir.path().join("code/Navigation/Page.cs")).unwrap();
    assert!(page.contains("namespace Site.Feature.Navigation"));
    assert!(page.contains("Site.Feature.IBase"));
    assert!(dir.path().join("code/Base.cs").exists());
}

#[tokio::test]
async fn test_nested_directory_inherits_hint_from_ancestor_item() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("items/nav/navigation.item"),
        &record(NAV_FOLDER, ROOT, "/sitecore/templates/Feature/Navigation", FOLDER, "Template folder", &[]),
    );
    write(
        &dir.path().join("items/nav/deep/cards.item"),
        &record(
            CARDS_FOLDER,
            NAV_FOLDER,
            "/sitecore/templates/Feature/Navigation/Cards",
            FOLDER,
            "Template folder",
            &[],
        ),
    );
    write(
        &dir.path().join("items/nav/deep/card.item"),
        &template_under(
            CARDS_FOLDER,
            CARD,
            "/sitecore/templates/Feature/Navigation/Cards/Card",
            &[],
            ("Heading", "Single-Line Text"),
        ),
    );
    write(
        &dir.path().join("items/base.item"),
        &template_file(BASE, "/sitecore/templates/Feature/Base", &[], ("Keywords", "Multi-Line Text")),
    );
    write(
        &dir.path().join("templar.toml"),
        r#"
[model.namespace]
policy = "ancestor_hint"
strip_prefix = "Site.Feature"

[[sets]]
name = "Feature"
namespace = "Site.Feature"
item_path = "items"
output_path = "code"

[sets.namespace_hints]
nav = "Site.Feature.Menus"
"#,
    );

    let config = load_config(&dir.path().join("templar.toml")).unwrap();
    let summary = Pipeline::new(config).run().await.unwrap();
    assert_eq!(summary.files_written, 2);

    let card = fs::read_to_string(dir.path().join("code/Menus/Cards/Card.cs")).unwrap();
    assert!(card.contains("namespace Site.Feature.Menus.Cards"));
    assert!(dir.path().join("code/Base.cs").exists());
}

#[tokio::test]
async fn test_invalid_configuration_is_rejected() {
    let dir = TempDir::new().unwrap();
    write(
        &dir.path().join("templar.toml"),
        r#"
[[sets]]
name = "Feature"
item_path = "items"
references = ["Missing"]
"#,
    );
    let error = load_config(&dir.path().join("templar.toml")).unwrap_err();
    assert!(error.to_string().contains("unknown set 'Missing'"));
}
