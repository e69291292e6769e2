//! The staged generation pipeline
//!
//! Scan → Parse → BuildDatabase → BuildTemplates → PlanTypes → Generate.
//! Stages run strictly in sequence. Scan, Parse and Generate fan out one
//! task per element through [`FanOut`]; the other stages run as a single
//! blocking task. Per-element failures are recorded in the diagnostics tree
//! and never stop siblings; a stage that hands nothing to the next one fails
//! the run.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use templar_codegen::{
    CodegenEngine, GeneratedSet, OutlineEmitter, OutputPlanner, OutputWriter, OutputWriterConfig,
    SourceEmitter, TypeSet, WriteReport,
};
use templar_items::{ItemFile, ItemParser, ItemSet};
use templar_model::{ContentDatabase, TemplateBuilder, TemplateCollection};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, Instrument};

use crate::config::TemplarConfig;
use crate::diagnostics::Diagnostics;
use crate::error::{PipelineError, Result};
use crate::scanner::{DirectoryScanner, Scanner};
use crate::stage::{FanOut, Outcome, Stage};

/// Output of one generated set
#[derive(Debug, Clone, Serialize)]
pub struct SetOutput {
    /// Set name
    pub name: String,
    /// Output root
    pub root_path: PathBuf,
    /// Files generated into declarative models
    pub generated: usize,
    /// Files that failed to generate
    pub failed: usize,
    /// What the writer did
    pub report: WriteReport,
}

/// Counts and timing of a completed run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunSummary {
    /// Sets scanned successfully
    pub sets: usize,
    /// Item files found
    pub item_files: usize,
    /// Items parsed
    pub items: usize,
    /// Templates in the model, well-known roots excluded
    pub templates: usize,
    /// Sets with planned output
    pub type_sets: usize,
    /// Files written (or that would be written in a dry run)
    pub files_written: usize,
    /// Files left untouched
    pub files_unchanged: usize,
    /// Stale files deleted
    pub files_deleted: usize,
    /// Warnings recorded
    pub warnings: usize,
    /// Failures recorded
    pub failures: usize,
    /// Whether output was only reported
    pub dry_run: bool,
    /// Wall-clock duration
    pub elapsed_ms: u64,
    /// Per-set output
    pub outputs: Vec<SetOutput>,
}

/// Runs the whole generation for one configuration
pub struct Pipeline {
    config: TemplarConfig,
    scanner: Arc<dyn Scanner>,
    emitter: Arc<dyn SourceEmitter>,
    fan_out: FanOut,
    diagnostics: Diagnostics,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("sets", &self.config.sets.len())
            .field("max_concurrency", &self.fan_out.max_concurrency())
            .finish()
    }
}

impl Pipeline {
    /// Create a pipeline scanning each set's item directory
    pub fn new(config: TemplarConfig) -> Self {
        let scanner = Arc::new(DirectoryScanner::from_config(&config));
        let fan_out = FanOut::new(config.pipeline.max_concurrency, CancellationToken::new());
        Self {
            config,
            scanner,
            emitter: Arc::new(OutlineEmitter::default()),
            fan_out,
            diagnostics: Diagnostics::default(),
        }
    }

    /// Replace the scanner
    pub fn with_scanner(mut self, scanner: Arc<dyn Scanner>) -> Self {
        self.scanner = scanner;
        self
    }

    /// Replace the text emitter
    pub fn with_emitter(mut self, emitter: Arc<dyn SourceEmitter>) -> Self {
        self.emitter = emitter;
        self
    }

    /// Use an externally owned cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.fan_out = FanOut::new(self.config.pipeline.max_concurrency, token);
        self
    }

    /// Token that cancels the run
    pub fn cancellation_token(&self) -> CancellationToken {
        self.fan_out.cancellation_token().clone()
    }

    /// Diagnostics recorded so far
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Run configuration
    pub fn config(&self) -> &TemplarConfig {
        &self.config
    }

    /// Run every stage in order
    pub async fn run(&self) -> Result<RunSummary> {
        let started = Instant::now();
        let parser = Arc::new(ItemParser::new(&self.config.parser)?);
        let engine = Arc::new(CodegenEngine::new(
            self.config.codegen.clone(),
            &self.config.field_types,
        )?);
        let mut summary = RunSummary {
            dry_run: self.config.pipeline.dry_run,
            ..RunSummary::default()
        };

        info!(
            sets = self.config.sets.len(),
            max_concurrency = self.fan_out.max_concurrency(),
            dry_run = summary.dry_run,
            "Starting generation run"
        );

        let scanned = self
            .scan()
            .instrument(info_span!("stage", name = %Stage::Scan))
            .await?;
        summary.sets = scanned.len();
        summary.item_files = scanned.iter().map(|(_, files)| files.len()).sum();

        let sets = self
            .parse(parser, scanned)
            .instrument(info_span!("stage", name = %Stage::Parse))
            .await?;
        summary.items = sets.iter().map(ItemSet::len).sum();

        let db = self
            .build_database(sets)
            .instrument(info_span!("stage", name = %Stage::BuildDatabase))
            .await?;

        let collection = self
            .build_templates(db)
            .instrument(info_span!("stage", name = %Stage::BuildTemplates))
            .await?;
        summary.templates = collection.templates().iter().filter(|t| !t.well_known).count();

        let type_sets = self
            .plan_types(&collection)
            .instrument(info_span!("stage", name = %Stage::PlanTypes))
            .await?;
        summary.type_sets = type_sets.len();

        summary.outputs = self
            .generate(engine, collection, type_sets)
            .instrument(info_span!("stage", name = %Stage::Generate))
            .await?;
        for output in &summary.outputs {
            summary.files_written += output.report.written.len();
            summary.files_unchanged += output.report.unchanged.len();
            summary.files_deleted += output.report.deleted.len();
        }

        let tally = self.diagnostics.tally();
        summary.warnings = tally.warn;
        summary.failures = tally.fail;
        summary.elapsed_ms = started.elapsed().as_millis() as u64;

        info!(
            written = summary.files_written,
            unchanged = summary.files_unchanged,
            deleted = summary.files_deleted,
            warnings = summary.warnings,
            failures = summary.failures,
            elapsed_ms = summary.elapsed_ms,
            "Generation run complete"
        );
        debug!("\n{}", self.diagnostics.render(self.config.pipeline.verbosity));
        Ok(summary)
    }

    async fn scan(&self) -> Result<Vec<(ItemSet, Vec<ItemFile>)>> {
        let stage = Stage::Scan;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let inputs = self
            .config
            .item_sets()
            .into_iter()
            .map(|set| (set.name.clone(), set))
            .collect();
        let scanner = self.scanner.clone();
        let outcomes = self
            .fan_out
            .run(stage, inputs, move |set: ItemSet| {
                let files = scanner.scan(&set)?;
                Ok((set, files))
            })
            .await;

        let mut scanned = Vec::new();
        for (label, outcome) in outcomes {
            match outcome {
                Outcome::Done((set, files)) => {
                    if files.is_empty() {
                        scope.warn(&label, format!("no item files below {}", set.item_path.display()));
                    } else {
                        scope.pass(&label);
                    }
                    scanned.push((set, files));
                }
                Outcome::Failed(error) => scope.fail(label, &error),
                Outcome::Cancelled => return Err(PipelineError::Cancelled(stage)),
            }
        }

        if scanned.iter().all(|(_, files)| files.is_empty()) {
            return Err(PipelineError::stage_failed(stage, "no item files found in any set"));
        }
        Ok(scanned)
    }

    async fn parse(
        &self,
        parser: Arc<ItemParser>,
        scanned: Vec<(ItemSet, Vec<ItemFile>)>,
    ) -> Result<Vec<ItemSet>> {
        let stage = Stage::Parse;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let mut sets = Vec::with_capacity(scanned.len());
        let mut inputs = Vec::new();
        for (index, (set, files)) in scanned.into_iter().enumerate() {
            for file in files {
                inputs.push((file.path.display().to_string(), (index, set.id, file)));
            }
            sets.push(set);
        }

        let worker = parser.clone();
        let outcomes = self
            .fan_out
            .run(stage, inputs, move |(index, set_id, file): (usize, _, ItemFile)| {
                let items = worker.parse_file(&file, set_id)?;
                Ok((index, items))
            })
            .await;

        for (label, outcome) in outcomes {
            match outcome {
                Outcome::Done((index, items)) => {
                    let set = &mut sets[index];
                    let mut duplicates = 0;
                    for item in items {
                        let id = item.id;
                        if !set.push(Arc::new(item)) {
                            duplicates += 1;
                            scope.warn(
                                &label,
                                format!("duplicate item id {} in set '{}', keeping the first", id, set.name),
                            );
                        }
                    }
                    if duplicates == 0 {
                        scope.pass(&label);
                    }
                }
                Outcome::Failed(error) => scope.fail(label, &error),
                Outcome::Cancelled => return Err(PipelineError::Cancelled(stage)),
            }
        }

        debug!(
            interned = parser.interner().len(),
            hits = parser.interner().hits(),
            "Interner usage"
        );
        if sets.iter().all(ItemSet::is_empty) {
            return Err(PipelineError::stage_failed(stage, "no items were parsed"));
        }
        Ok(sets)
    }

    async fn build_database(&self, sets: Vec<ItemSet>) -> Result<Arc<ContentDatabase>> {
        let stage = Stage::BuildDatabase;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let db = tokio::task::spawn_blocking(move || ContentDatabase::build(sets))
            .await
            .map_err(|e| PipelineError::stage_failed(stage, e.to_string()))?;

        for collision in db.collisions() {
            scope.warn(collision.id.to_string(), collision.to_string());
        }
        scope.pass(format!("{} items", db.len()));
        Ok(Arc::new(db))
    }

    async fn build_templates(&self, db: Arc<ContentDatabase>) -> Result<Arc<TemplateCollection>> {
        let stage = Stage::BuildTemplates;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let builder = TemplateBuilder::new(self.config.model.clone());
        let report = tokio::task::spawn_blocking(move || builder.build(&db))
            .await
            .map_err(|e| PipelineError::stage_failed(stage, e.to_string()))?;

        for warning in &report.warnings {
            scope.warn("templates", warning.clone());
        }
        for failure in &report.failures {
            scope.fail(&failure.path, &failure.error);
        }
        for set in report.collection.sets().filter(|s| !s.is_well_known()) {
            scope.pass(format!("{} ({} templates)", set.name, set.templates.len()));
        }

        if report.collection.templates().iter().all(|t| t.well_known) {
            return Err(PipelineError::stage_failed(stage, "no templates were found"));
        }
        Ok(Arc::new(report.collection))
    }

    async fn plan_types(&self, collection: &TemplateCollection) -> Result<Vec<TypeSet>> {
        let stage = Stage::PlanTypes;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let plan = OutputPlanner::new(&self.config.codegen.file_extension).plan(collection)?;
        for warning in &plan.warnings {
            scope.warn("plan", warning.clone());
        }
        for type_set in &plan.type_sets {
            scope.pass(format!("{} ({} files)", type_set.name, type_set.files.len()));
        }

        if plan.type_sets.is_empty() {
            return Err(PipelineError::stage_failed(stage, "no set has an output path"));
        }
        Ok(plan.type_sets)
    }

    async fn generate(
        &self,
        engine: Arc<CodegenEngine>,
        collection: Arc<TemplateCollection>,
        type_sets: Vec<TypeSet>,
    ) -> Result<Vec<SetOutput>> {
        let stage = Stage::Generate;
        self.fan_out.check_cancelled(stage)?;
        let scope = self.diagnostics.scope(stage.as_str());

        let writer = OutputWriter::with_config(OutputWriterConfig {
            dry_run: self.config.pipeline.dry_run,
            extension: self.config.codegen.file_extension.trim_start_matches('.').to_string(),
        });
        let emitter = self.emitter.clone();
        let inputs = type_sets
            .into_iter()
            .map(|type_set| (type_set.name.clone(), type_set))
            .collect();

        let outcomes = self
            .fan_out
            .run(stage, inputs, move |type_set: TypeSet| {
                let generated = engine.generate(&collection, &type_set);
                let files: Vec<(PathBuf, String)> = generated
                    .files
                    .iter()
                    .map(|file| (file.relative_path.clone(), emitter.emit(file)))
                    .collect();
                let keep: Vec<PathBuf> = generated
                    .failures
                    .iter()
                    .map(|failure| failure.relative_path.clone())
                    .collect();
                let report = writer.write_keeping(&generated.root_path, &files, &keep)?;
                Ok((generated, report))
            })
            .await;

        let mut outputs = Vec::new();
        for (label, outcome) in outcomes {
            match outcome {
                Outcome::Done((generated, report)) => {
                    record_generated(&scope.scope(&label), &generated);
                    outputs.push(SetOutput {
                        name: generated.name,
                        root_path: generated.root_path,
                        generated: generated.files.len(),
                        failed: generated.failures.len(),
                        report,
                    });
                }
                Outcome::Failed(error) => scope.fail(label, &error),
                Outcome::Cancelled => return Err(PipelineError::Cancelled(stage)),
            }
        }

        if outputs.is_empty() {
            return Err(PipelineError::stage_failed(stage, "every set failed to generate"));
        }
        Ok(outputs)
    }
}

fn record_generated(scope: &crate::diagnostics::Scope, generated: &GeneratedSet) {
    for warning in &generated.warnings {
        scope.warn(&generated.name, warning.clone());
    }
    for failure in &generated.failures {
        scope.fail(failure.relative_path.display().to_string(), &failure.error);
    }
    for file in &generated.files {
        scope.pass(file.relative_path.display().to_string());
    }
}
