//! Integration tests for the staged pipeline over real item directories

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use templar_pipeline::{Pipeline, PipelineError, SetConfig, Stage, Status, TemplarConfig};

const ROOT: &str = "{11111111-1111-1111-1111-111111111111}";
const MARKER: &str = "{AB86861A-6030-46C5-B394-E8F99E8B87DB}";
const SECTION: &str = "{E269FBB5-3750-427A-9149-7AA950B49301}";
const FIELD: &str = "{455A3E98-A627-4B40-8035-E683A0331AC7}";
const BASES: &str = "{12C33F3F-86C5-43A5-AEB4-5598CEC45116}";
const TYPE: &str = "{AB162CC0-DC80-4ABF-8871-998EE5D7BA32}";

const PAGE: &str = "{AAAAAAAA-0000-0000-0000-000000000001}";
const BASE: &str = "{BBBBBBBB-0000-0000-0000-000000000001}";

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

/// A template with one section holding one field
fn template_file(id: &str, name: &str, bases: &[&str], field: (&str, &str)) -> String {
    let prefix = &id[..id.len() - 3];
    let section_id = format!("{prefix}A1}}");
    let field_id = format!("{prefix}A2}}");
    let path = format!("/sitecore/templates/Feature/Pages/{name}");
    let base_list = bases.join("|");
    let mut shared = Vec::new();
    if !bases.is_empty() {
        shared.push((BASES, "__Base template", base_list.as_str()));
    }

    let mut text = record(id, ROOT, &path, MARKER, "Template", &shared);
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

struct Fixture {
    dir: TempDir,
}

impl Fixture {
    fn new() -> Self {
        let fixture = Self {
            dir: TempDir::new().unwrap(),
        };
        fs::create_dir_all(fixture.items()).unwrap();
        fixture.write_item("page.item", &template_file(PAGE, "Page", &[BASE], ("Title", "Single-Line Text")));
        fixture.write_item("base.item", &template_file(BASE, "Base", &[], ("Keywords", "Multi-Line Text")));
        fixture
    }

    fn items(&self) -> PathBuf {
        self.dir.path().join("items")
    }

    fn out(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    fn write_item(&self, name: &str, text: &str) {
        fs::write(self.items().join(name), text).unwrap();
    }

    fn config(&self) -> TemplarConfig {
        TemplarConfig {
            sets: vec![SetConfig {
                name: "Feature".to_string(),
                id: None,
                namespace: "Site.Feature".to_string(),
                item_path: self.items(),
                output_path: Some(self.out()),
                references: vec![],
                namespace_hints: Default::default(),
            }],
            ..TemplarConfig::default()
        }
    }
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).unwrap()
}

#[tokio::test]
async fn test_run_generates_one_file_per_template() {
    let fixture = Fixture::new();
    let summary = Pipeline::new(fixture.config()).run().await.unwrap();

    assert_eq!(summary.sets, 1);
    assert_eq!(summary.item_files, 2);
    assert_eq!(summary.items, 6);
    assert_eq!(summary.templates, 2);
    assert_eq!(summary.files_written, 2);
    assert_eq!(summary.failures, 0);

    let page = read(&fixture.out().join("Pages/Page.cs"));
    assert!(page.contains("namespace Site.Feature.Pages"));
    assert!(page.contains("public partial interface IPage : Templar.IStandardTemplateItem, Site.Feature.Pages.IBase"));
    assert!(page.contains("public partial class Page : Templar.StandardTemplateItem, Site.Feature.Pages.IPage, Site.Feature.Pages.IBase"));
    assert!(page.contains("public Templar.Fields.ITextField Keywords => GetField(\"Keywords\", \"keywords\");"));
    assert!(page.contains("public string TitleValue => Title.Value;"));
    assert!(page.contains("public static partial class Templates"));
    assert!(page.contains(&format!("new System.Guid(\"{PAGE}\")")));
    assert!(fixture.out().join("Pages/Base.cs").exists());
}

#[tokio::test]
async fn test_rerun_is_unchanged_and_removed_template_is_cleaned() {
    let fixture = Fixture::new();
    Pipeline::new(fixture.config()).run().await.unwrap();

    let second = Pipeline::new(fixture.config()).run().await.unwrap();
    assert_eq!(second.files_written, 0);
    assert_eq!(second.files_unchanged, 2);
    assert_eq!(second.files_deleted, 0);

    fs::remove_file(fixture.items().join("base.item")).unwrap();
    let pipeline = Pipeline::new(fixture.config());
    let third = pipeline.run().await.unwrap();
    assert_eq!(third.files_deleted, 1);
    assert_eq!(third.files_written, 1);
    assert!(!fixture.out().join("Pages/Base.cs").exists());
    assert!(third.warnings > 0);
    assert!(pipeline.diagnostics().to_json().unwrap().contains("unknown base template"));
}

#[tokio::test]
async fn test_malformed_file_is_isolated() {
    let fixture = Fixture::new();
    fixture.write_item("broken.item", "this is not an item file\n");

    let pipeline = Pipeline::new(fixture.config());
    let summary = pipeline.run().await.unwrap();
    assert_eq!(summary.files_written, 2);
    assert_eq!(summary.failures, 1);

    let report = pipeline.diagnostics().snapshot();
    let parse = report.children.iter().find(|c| c.name == "parse").unwrap();
    let failed: Vec<_> = parse.entries.iter().filter(|e| e.status == Status::Fail).collect();
    assert_eq!(failed.len(), 1);
    assert!(failed[0].label.ends_with("broken.item"));
}

#[tokio::test]
async fn test_dry_run_touches_nothing() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.pipeline.dry_run = true;

    let summary = Pipeline::new(config).run().await.unwrap();
    assert!(summary.dry_run);
    assert_eq!(summary.files_written, 2);
    assert!(!fixture.out().exists());
}

#[tokio::test]
async fn test_cancelled_run_stops_before_scanning() {
    let fixture = Fixture::new();
    let pipeline = Pipeline::new(fixture.config());
    pipeline.cancellation_token().cancel();
    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Cancelled(Stage::Scan))));
    assert!(!fixture.out().exists());
}

#[tokio::test]
async fn test_set_without_output_fails_planning() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.sets[0].output_path = None;
    let result = Pipeline::new(config).run().await;
    assert!(matches!(
        result,
        Err(PipelineError::StageFailed { stage: Stage::PlanTypes, .. })
    ));
}

#[tokio::test]
async fn test_empty_item_directory_fails_scan() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.items().join("page.item")).unwrap();
    fs::remove_file(fixture.items().join("base.item")).unwrap();
    let result = Pipeline::new(fixture.config()).run().await;
    assert!(matches!(
        result,
        Err(PipelineError::StageFailed { stage: Stage::Scan, .. })
    ));
}

#[tokio::test]
async fn test_unknown_generator_fails_before_any_stage() {
    let fixture = Fixture::new();
    let mut config = fixture.config();
    config.codegen.generators = vec!["reflection".to_string()];
    let pipeline = Pipeline::new(config);
    let result = pipeline.run().await;
    assert!(matches!(result, Err(PipelineError::Codegen(_))));
    assert!(pipeline.diagnostics().snapshot().children.is_empty());
}

#[tokio::test]
async fn test_serial_and_parallel_runs_agree() {
    let serial = Fixture::new();
    let parallel = Fixture::new();
    let mut serial_config = serial.config();
    serial_config.pipeline.max_concurrency = 1;
    let mut parallel_config = parallel.config();
    parallel_config.pipeline.max_concurrency = 8;

    Pipeline::new(serial_config).run().await.unwrap();
    Pipeline::new(parallel_config).run().await.unwrap();

    for file in ["Pages/Page.cs", "Pages/Base.cs"] {
        assert_eq!(read(&serial.out().join(file)), read(&parallel.out().join(file)));
    }
}
