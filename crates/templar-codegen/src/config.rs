//! Code generation configuration

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Which ancestors appear in generated base-type lists
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BasePolicy {
    /// Only direct base templates
    #[default]
    Direct,
    /// Every transitive base template
    Transitive,
}

/// Namespace of the constant-holder declaration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstantsNamespace {
    /// Same namespace as the template's other declarations
    #[default]
    Template,
    /// The owning set's root namespace
    SetRoot,
}

/// Kind of generated file, selecting its import list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileKind {
    /// Regular content template
    Template,
    /// Parameter-bag template
    Parameters,
}

impl FileKind {
    /// Configuration key of the kind
    pub fn as_str(&self) -> &'static str {
        match self {
            FileKind::Template => "template",
            FileKind::Parameters => "parameters",
        }
    }
}

/// Configuration of the code generation engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CodegenConfig {
    /// Type generators, in the order they run per file
    pub generators: Vec<String>,
    /// Formatting passes, in the order they run per file
    pub formatting: Vec<String>,
    /// Ancestors listed as base types
    pub base_policy: BasePolicy,
    /// Root contract every generated contract derives from
    pub root_contract: String,
    /// Root type of ordinary implementations
    pub root_implementation: String,
    /// Root type of parameter-bag implementations
    pub parameters_root_implementation: String,
    /// Name of the static constant holder
    pub constants_holder: String,
    /// Namespace of the constant holder
    pub constants_namespace: ConstantsNamespace,
    /// Suffix appended to constants colliding with their container
    pub constants_collision_suffix: String,
    /// Attribute marking debug-only members
    pub debug_marker: String,
    /// Import list per file kind (`template`, `parameters`)
    pub imports: BTreeMap<String, Vec<String>>,
    /// Namespace root sorted ahead of other imports
    pub standard_namespace_root: String,
    /// Base lists longer than this are split one per line
    pub base_list_wrap_threshold: usize,
    /// Extension of generated files, without the dot
    pub file_extension: String,
    /// Documentation template overrides, keyed by template name
    pub documentation: BTreeMap<String, String>,
}

impl Default for CodegenConfig {
    fn default() -> Self {
        let common = vec![
            "System".to_string(),
            "System.Collections.Generic".to_string(),
            "System.Diagnostics".to_string(),
            "Templar.Fields".to_string(),
        ];
        let mut imports = BTreeMap::new();
        imports.insert(FileKind::Template.as_str().to_string(), common.clone());
        imports.insert(FileKind::Parameters.as_str().to_string(), common);

        Self {
            generators: vec![
                "contract".to_string(),
                "implementation".to_string(),
                "constants".to_string(),
            ],
            formatting: vec![
                "backing_field_spacing".to_string(),
                "property_spacing".to_string(),
                "base_list_wrap".to_string(),
                "debug_marker_lines".to_string(),
            ],
            base_policy: BasePolicy::default(),
            root_contract: "Templar.IStandardTemplateItem".to_string(),
            root_implementation: "Templar.StandardTemplateItem".to_string(),
            parameters_root_implementation: "Templar.RenderingParameters".to_string(),
            constants_holder: "Templates".to_string(),
            constants_namespace: ConstantsNamespace::default(),
            constants_collision_suffix: "Field".to_string(),
            debug_marker: "DebuggerNonUserCode".to_string(),
            imports,
            standard_namespace_root: "System".to_string(),
            base_list_wrap_threshold: 3,
            file_extension: "cs".to_string(),
            documentation: BTreeMap::new(),
        }
    }
}

impl CodegenConfig {
    /// Configured imports of a file kind (empty if none)
    pub fn imports_for(&self, kind: FileKind) -> &[String] {
        self.imports
            .get(kind.as_str())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}
