//! Model configuration: well-known ids, field names and namespace policy

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Id of the synthetic root item
pub const ROOT_ITEM_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
/// Template id marking an item as a template definition
pub const TEMPLATE_MARKER_ID: Uuid = Uuid::from_u128(0xab86861a_6030_46c5_b394_e8f99e8b87db);
/// Template id of template sections
pub const SECTION_TEMPLATE_ID: Uuid = Uuid::from_u128(0xe269fbb5_3750_427a_9149_7aa950b49301);
/// Template id of template field definitions
pub const FIELD_TEMPLATE_ID: Uuid = Uuid::from_u128(0x455a3e98_a627_4b40_8035_e683a0331ac7);
/// Root content template every template implicitly derives from
pub const STANDARD_TEMPLATE_ID: Uuid = Uuid::from_u128(0x1930bbeb_7805_471a_a3be_4858ac7cf696);
/// Root folder template
pub const FOLDER_TEMPLATE_ID: Uuid = Uuid::from_u128(0xa87a00b1_e6db_45ab_8b54_636fec3b5523);
/// Field definition holding a template's base template list
pub const BASE_TEMPLATES_FIELD_ID: Uuid = Uuid::from_u128(0x12c33f3f_86c5_43a5_aeb4_5598cec45116);
/// Base template marking rendering-parameter (parameter-bag) templates
pub const RENDERING_PARAMETERS_TEMPLATE_ID: Uuid =
    Uuid::from_u128(0x8ca06d6a_b353_44e8_bc31_b528c7306971);

/// How a template's local namespace is derived
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "policy", rename_all = "snake_case")]
pub enum NamespacePolicyConfig {
    /// Trim leading and trailing path segments off the template path
    PathTrim {
        /// Number of leading path segments to drop
        #[serde(default = "default_skip_leading")]
        skip_leading: usize,
    },
    /// Walk ancestors until a namespace hint or the set's common folder depth
    AncestorHint {
        /// Hint key carrying an explicit namespace
        #[serde(default = "default_hint_key")]
        hint_key: String,
        /// Prefix removed from hinted namespaces
        #[serde(default)]
        strip_prefix: String,
    },
}

impl Default for NamespacePolicyConfig {
    fn default() -> Self {
        Self::PathTrim {
            skip_leading: default_skip_leading(),
        }
    }
}

fn default_skip_leading() -> usize {
    3
}

fn default_hint_key() -> String {
    "namespace".to_string()
}

/// Configuration of the content graph and template builder
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Template id marking template definitions
    pub template_marker_id: Uuid,
    /// Template id of sections
    pub section_template_id: Uuid,
    /// Template id of field definitions
    pub field_template_id: Uuid,
    /// Well-known root content template
    pub standard_template_id: Uuid,
    /// Well-known root folder template
    pub folder_template_id: Uuid,
    /// Field id of the base template list
    pub base_templates_field_id: Uuid,
    /// Field name of the base template list (fallback lookup)
    pub base_templates_field_name: String,
    /// Shared field holding a field definition's type tag
    pub type_field_name: String,
    /// Versioned field holding display names
    pub display_name_field_name: String,
    /// Preferred language for versioned lookups
    pub language: String,
    /// Base templates that make a template a parameter bag
    pub parameter_base_ids: Vec<Uuid>,
    /// Namespace derivation policy
    pub namespace: NamespacePolicyConfig,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            template_marker_id: TEMPLATE_MARKER_ID,
            section_template_id: SECTION_TEMPLATE_ID,
            field_template_id: FIELD_TEMPLATE_ID,
            standard_template_id: STANDARD_TEMPLATE_ID,
            folder_template_id: FOLDER_TEMPLATE_ID,
            base_templates_field_id: BASE_TEMPLATES_FIELD_ID,
            base_templates_field_name: "__Base template".to_string(),
            type_field_name: "Type".to_string(),
            display_name_field_name: "__Display name".to_string(),
            language: "en".to_string(),
            parameter_base_ids: vec![RENDERING_PARAMETERS_TEMPLATE_ID],
            namespace: NamespacePolicyConfig::default(),
        }
    }
}
