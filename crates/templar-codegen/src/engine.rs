//! Code generation engine
//!
//! Runs the configured generators over every planned file of a type set,
//! groups the resulting declarations into namespace blocks, attaches the
//! organized import list and applies the formatting passes. A failure in
//! one file is recorded and never stops its siblings.

use std::path::PathBuf;

use templar_items::ItemId;
use templar_model::{FieldTypeResolver, FieldTypeTables, TemplateCollection};
use tracing::{debug, warn};

use crate::config::CodegenConfig;
use crate::docs::DocRenderer;
use crate::error::{CodegenError, Result};
use crate::formatting::{passes_from_config, FormattingPass};
use crate::generators::{generators_from_config, GenerationContext, TypeGenerator};
use crate::grouping::group_consecutive;
use crate::imports::organize_imports;
use crate::model::SourceFile;
use crate::planner::{OutputFilePlan, TypeSet};

/// A planned file that could not be generated
#[derive(Debug)]
pub struct FileFailure {
    /// Template of the file
    pub template_id: ItemId,
    /// Path relative to the set's output root
    pub relative_path: PathBuf,
    /// What went wrong
    pub error: CodegenError,
}

/// Generation result of one type set
#[derive(Debug, Default)]
pub struct GeneratedSet {
    /// Set name
    pub name: String,
    /// Output root directory
    pub root_path: PathBuf,
    /// Generated files in plan order
    pub files: Vec<SourceFile>,
    /// Files that failed
    pub failures: Vec<FileFailure>,
    /// Non-fatal findings
    pub warnings: Vec<String>,
}

/// Turns planned type sets into declarative source files
pub struct CodegenEngine {
    config: CodegenConfig,
    resolver: FieldTypeResolver,
    docs: DocRenderer,
    generators: Vec<Box<dyn TypeGenerator>>,
    passes: Vec<Box<dyn FormattingPass>>,
}

impl std::fmt::Debug for CodegenEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodegenEngine")
            .field("generators", &self.generators.iter().map(|g| g.name()).collect::<Vec<_>>())
            .field("passes", &self.passes.iter().map(|p| p.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl CodegenEngine {
    /// Build an engine, validating generator, pass and documentation configuration
    pub fn new(config: CodegenConfig, field_types: &FieldTypeTables) -> Result<Self> {
        let resolver = FieldTypeResolver::new(field_types)?;
        Self::with_resolver(config, resolver)
    }

    /// Build an engine around an existing resolver
    pub fn with_resolver(config: CodegenConfig, resolver: FieldTypeResolver) -> Result<Self> {
        let generators = generators_from_config(&config.generators)?;
        let passes = passes_from_config(&config.formatting, config.base_list_wrap_threshold)?;
        let docs = DocRenderer::new(&config.documentation)?;
        Ok(Self {
            config,
            resolver,
            docs,
            generators,
            passes,
        })
    }

    /// Engine configuration
    pub fn config(&self) -> &CodegenConfig {
        &self.config
    }

    /// Generate every planned file of `type_set`
    pub fn generate(&self, collection: &TemplateCollection, type_set: &TypeSet) -> GeneratedSet {
        let context = GenerationContext {
            collection,
            type_set,
            resolver: &self.resolver,
            docs: &self.docs,
            config: &self.config,
        };

        let mut generated = GeneratedSet {
            name: type_set.name.clone(),
            root_path: type_set.root_path.clone(),
            ..GeneratedSet::default()
        };

        for plan in &type_set.files {
            match self.generate_file(&context, plan, &mut generated.warnings) {
                Ok(file) => generated.files.push(file),
                Err(error) => {
                    warn!(
                        set = %type_set.name,
                        path = %plan.relative_path.display(),
                        error = %error,
                        "File generation failed"
                    );
                    generated.failures.push(FileFailure {
                        template_id: plan.template_id,
                        relative_path: plan.relative_path.clone(),
                        error,
                    });
                }
            }
        }

        debug!(
            set = %type_set.name,
            files = generated.files.len(),
            failures = generated.failures.len(),
            "Generated type set"
        );
        generated
    }

    /// Generate one file
    pub fn generate_file(
        &self,
        context: &GenerationContext<'_>,
        plan: &OutputFilePlan,
        warnings: &mut Vec<String>,
    ) -> Result<SourceFile> {
        let mut declarations = Vec::with_capacity(self.generators.len());
        for generator in &self.generators {
            if let Some(declaration) = generator.generate(context, plan, warnings)? {
                declarations.push(declaration);
            }
        }

        let mut file = SourceFile {
            relative_path: plan.relative_path.clone(),
            template_id: plan.template_id,
            kind: plan.kind,
            imports: organize_imports(
                self.config.imports_for(plan.kind),
                &self.config.standard_namespace_root,
            ),
            namespaces: group_consecutive(declarations),
        };
        for pass in &self.passes {
            pass.apply(&mut file);
        }
        Ok(file)
    }
}
