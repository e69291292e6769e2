//! Type generators
//!
//! Each generator turns one planned output file into at most one
//! declaration. Generators run in the order given by configuration; the
//! registry maps configured names to implementations.

use std::collections::HashSet;
use std::sync::Arc;

use heck::ToLowerCamelCase;
use templar_items::bracketed;
use templar_model::{
    contract_name, naming, FieldTypeResolver, Template, TemplateCollection, TemplateField,
    TemplateKind,
};
use tracing::warn;

use crate::config::{BasePolicy, CodegenConfig, ConstantsNamespace};
use crate::docs::{self, DocRenderer};
use crate::error::{CodegenError, Result};
use crate::model::{Attribute, Declaration, DeclarationKind, Member, MemberBody, MemberKind, Parameter};
use crate::planner::{OutputFilePlan, TypeSet};

/// Everything a generator may consult
pub struct GenerationContext<'a> {
    /// Global template collection
    pub collection: &'a TemplateCollection,
    /// Set being generated
    pub type_set: &'a TypeSet,
    /// Field type lookup
    pub resolver: &'a FieldTypeResolver,
    /// Documentation renderer
    pub docs: &'a DocRenderer,
    /// Generation configuration
    pub config: &'a CodegenConfig,
}

impl<'a> GenerationContext<'a> {
    /// Template of a planned file
    pub fn template(&self, file: &OutputFilePlan) -> Result<&'a Arc<Template>> {
        Ok(self.collection.require(&file.template_id)?)
    }

    /// Kind of a template
    pub fn kind(&self, template: &Template) -> Result<TemplateKind> {
        Ok(self.collection.kind(&template.id)?)
    }

    /// Generated type name of a template, honoring names the planner disambiguated
    pub fn type_name(&self, template: &Template) -> String {
        self.type_set
            .renamed
            .get(&template.id)
            .cloned()
            .unwrap_or_else(|| template.type_name())
    }

    /// Fully qualified contract name of a template
    pub fn contract_of(&self, template: &Template) -> String {
        qualified(
            &self.collection.namespace_of(template),
            &contract_name(&self.type_name(template)),
        )
    }

    /// Ancestor contracts per base policy, well-known excluded, sorted case-insensitively
    pub fn ancestor_contracts(&self, template: &Template) -> Result<Vec<String>> {
        let ancestors = match self.config.base_policy {
            BasePolicy::Direct => self.collection.direct_bases(&template.id)?,
            BasePolicy::Transitive => self.collection.transitive_bases(&template.id)?,
        };
        let mut contracts: Vec<String> = ancestors
            .into_iter()
            .filter(|base| !base.well_known)
            .map(|base| self.contract_of(base))
            .collect();
        contracts.sort_by_key(|c| c.to_lowercase());
        contracts.dedup();
        Ok(contracts)
    }
}

/// Produces zero or one declaration per output file
pub trait TypeGenerator: Send + Sync {
    /// Configuration name of the generator
    fn name(&self) -> &'static str;

    /// Generate the declaration for `file`, pushing non-fatal findings to `warnings`
    fn generate(
        &self,
        context: &GenerationContext<'_>,
        file: &OutputFilePlan,
        warnings: &mut Vec<String>,
    ) -> Result<Option<Declaration>>;
}

/// Build the generator list from configured names
pub fn generators_from_config(names: &[String]) -> Result<Vec<Box<dyn TypeGenerator>>> {
    names
        .iter()
        .map(|name| -> Result<Box<dyn TypeGenerator>> {
            match name.trim().to_lowercase().as_str() {
                "contract" => Ok(Box::new(ContractGenerator)),
                "implementation" => Ok(Box::new(ImplementationGenerator)),
                "constants" => Ok(Box::new(ConstantsGenerator)),
                _ => Err(CodegenError::UnknownGenerator(name.clone())),
            }
        })
        .collect()
}

fn qualified(namespace: &str, name: &str) -> String {
    naming::join_namespace(&[namespace, name])
}

/// Accessor name chosen for a field
struct FieldAccessor<'f> {
    field: &'f TemplateField,
    property: String,
}

/// Accessor names for `fields`
///
/// A name equal to one of the `reserved` type names gets `suffix` appended;
/// of any remaining repeated name the first field wins.
fn accessors<'f>(
    template: &Template,
    fields: impl IntoIterator<Item = &'f TemplateField>,
    reserved: &[&str],
    suffix: &str,
    warnings: &mut Vec<String>,
) -> Vec<FieldAccessor<'f>> {
    let mut seen: HashSet<String> = reserved.iter().map(|r| r.to_string()).collect();
    let mut result = Vec::new();
    for field in fields {
        let identifier = naming::identifier(&field.name);
        let mut property = identifier.clone();
        if reserved.contains(&identifier.as_str()) {
            property = format!("{}{}", identifier, suffix);
            warn!(template = %template.path, field = %field.name, renamed = %property, "Property name collides with its type");
            warnings.push(format!(
                "field '{}' of template {} collides with its type name, renamed to '{}'",
                field.name, template.path, property
            ));
        }
        if !seen.insert(property.clone()) {
            let message = format!(
                "template {} has more than one field named '{}', keeping the first",
                template.path, property
            );
            warn!(template = %template.path, field = %field.name, "Duplicate generated property name");
            warnings.push(message);
            continue;
        }
        result.push(FieldAccessor { field, property });
    }
    result
}

/// Data-access contract: own fields only
#[derive(Debug, Clone, Copy)]
pub struct ContractGenerator;

impl TypeGenerator for ContractGenerator {
    fn name(&self) -> &'static str {
        "contract"
    }

    fn generate(
        &self,
        context: &GenerationContext<'_>,
        file: &OutputFilePlan,
        warnings: &mut Vec<String>,
    ) -> Result<Option<Declaration>> {
        let template = context.template(file)?;
        let kind = context.kind(template)?;
        let type_name = context.type_name(template);

        let mut declaration = Declaration::new(
            DeclarationKind::Interface,
            contract_name(&type_name),
            file.namespace.clone(),
        );
        declaration.bases.push(context.config.root_contract.clone());
        declaration.bases.extend(context.ancestor_contracts(template)?);
        declaration.docs = Some(context.docs.template(docs::CONTRACT_DOC, template)?);

        let own = accessors(
            template,
            &template.fields,
            &[type_name.as_str(), declaration.name.as_str()],
            &context.config.constants_collision_suffix,
            warnings,
        );
        for accessor in own {
            let field = accessor.field;
            let type_name = match kind {
                TemplateKind::Ordinary => context.resolver.contract_type(&field.field_type),
                TemplateKind::ParameterBag => context.resolver.parameter_type(&field.field_type).to_string(),
            };
            declaration.members.push(
                Member::new(MemberKind::Property, &accessor.property, type_name)
                    .with_docs(Some(context.docs.field(docs::PROPERTY_DOC, template, field)?)),
            );
            if kind == TemplateKind::Ordinary {
                if let Some(value_type) = context.resolver.value_type(&field.field_type) {
                    declaration.members.push(
                        Member::new(MemberKind::Property, format!("{}Value", accessor.property), value_type)
                            .with_docs(Some(context.docs.field(docs::VALUE_DOC, template, field)?)),
                    );
                }
            }
        }

        Ok(Some(declaration))
    }
}

/// Implementation class: every field of the template and its ancestors
#[derive(Debug, Clone, Copy)]
pub struct ImplementationGenerator;

impl ImplementationGenerator {
    fn constructors(
        &self,
        context: &GenerationContext<'_>,
        template: &Template,
        kind: TemplateKind,
        type_name: &str,
    ) -> Result<Vec<Member>> {
        let overloads: Vec<(&str, Vec<Parameter>)> = match kind {
            TemplateKind::Ordinary => vec![
                ("nothing", vec![]),
                ("an item id", vec![Parameter::new("id", "System.Guid")]),
                (
                    "an item id and lazily loaded fields",
                    vec![
                        Parameter::new("id", "System.Guid"),
                        Parameter::new("fields", "System.Lazy<Templar.FieldDictionary>"),
                    ],
                ),
                ("a content item", vec![Parameter::new("item", "Templar.Item")]),
            ],
            TemplateKind::ParameterBag => vec![(
                "a parameter map",
                vec![Parameter::new(
                    "parameters",
                    "System.Collections.Generic.IDictionary<string, string>",
                )],
            )],
        };

        overloads
            .into_iter()
            .map(|(source, parameters)| -> Result<Member> {
                let arguments = parameters.iter().map(|p| p.name.clone()).collect();
                let mut member = Member::new(MemberKind::Constructor, type_name, "")
                    .with_body(MemberBody::BaseCall { arguments })
                    .with_docs(Some(context.docs.constructor(template, source)?));
                member.parameters = parameters;
                Ok(member)
            })
            .collect()
    }
}

impl TypeGenerator for ImplementationGenerator {
    fn name(&self) -> &'static str {
        "implementation"
    }

    fn generate(
        &self,
        context: &GenerationContext<'_>,
        file: &OutputFilePlan,
        warnings: &mut Vec<String>,
    ) -> Result<Option<Declaration>> {
        let template = context.template(file)?;
        let kind = context.kind(template)?;
        let type_name = context.type_name(template);
        let contract = contract_name(&type_name);
        let fields = context.collection.all_fields(&template.id)?;

        let mut declaration =
            Declaration::new(DeclarationKind::Class, &type_name, file.namespace.clone());
        declaration.bases.push(match kind {
            TemplateKind::Ordinary => context.config.root_implementation.clone(),
            TemplateKind::ParameterBag => context.config.parameters_root_implementation.clone(),
        });
        declaration.bases.push(context.contract_of(template));
        declaration.bases.extend(context.ancestor_contracts(template)?);
        declaration.docs = Some(context.docs.template(docs::IMPLEMENTATION_DOC, template)?);

        let accessors = accessors(
            template,
            fields,
            &[type_name.as_str(), contract.as_str()],
            &context.config.constants_collision_suffix,
            warnings,
        );
        let mut backing_fields = Vec::new();
        let mut properties = Vec::new();

        for accessor in &accessors {
            let field = accessor.field;
            let property_docs = Some(context.docs.field(docs::PROPERTY_DOC, template, field)?);
            let debug_marker = Attribute::debug_marker(&context.config.debug_marker);

            match kind {
                TemplateKind::Ordinary => {
                    let concrete = context.resolver.concrete_type(&field.field_type);
                    backing_fields.push(Member::new(
                        MemberKind::Field,
                        format!("_{}", accessor.property.to_lower_camel_case()),
                        concrete,
                    ));
                    properties.push(
                        Member::new(
                            MemberKind::Property,
                            &accessor.property,
                            context.resolver.contract_type(&field.field_type),
                        )
                        .with_body(MemberBody::FieldLookup {
                            display_name: Some(field.label().to_string()),
                            key: field.key(),
                        })
                        .with_attribute(debug_marker.clone())
                        .with_docs(property_docs),
                    );
                    if let Some(value_type) = context.resolver.value_type(&field.field_type) {
                        properties.push(
                            Member::new(
                                MemberKind::Property,
                                format!("{}Value", accessor.property),
                                value_type,
                            )
                            .with_body(MemberBody::ValueProjection {
                                source: accessor.property.clone(),
                            })
                            .with_attribute(debug_marker)
                            .with_docs(Some(context.docs.field(docs::VALUE_DOC, template, field)?)),
                        );
                    }
                }
                TemplateKind::ParameterBag => {
                    properties.push(
                        Member::new(
                            MemberKind::Property,
                            &accessor.property,
                            context.resolver.parameter_type(&field.field_type),
                        )
                        .with_body(MemberBody::FieldLookup {
                            display_name: None,
                            key: field.key(),
                        })
                        .with_attribute(debug_marker)
                        .with_docs(property_docs),
                    );
                }
            }
        }

        declaration.members.extend(backing_fields);
        declaration
            .members
            .extend(self.constructors(context, template, kind, &type_name)?);
        declaration.members.extend(properties);

        Ok(Some(declaration))
    }
}

/// Static constant holder exposing template and field ids
#[derive(Debug, Clone, Copy)]
pub struct ConstantsGenerator;

/// Name of the template id constant in every constant container
pub const TEMPLATE_ID_CONSTANT: &str = "TemplateId";

impl TypeGenerator for ConstantsGenerator {
    fn name(&self) -> &'static str {
        "constants"
    }

    fn generate(
        &self,
        context: &GenerationContext<'_>,
        file: &OutputFilePlan,
        warnings: &mut Vec<String>,
    ) -> Result<Option<Declaration>> {
        let template = context.template(file)?;
        let namespace = match context.config.constants_namespace {
            ConstantsNamespace::Template => file.namespace.clone(),
            ConstantsNamespace::SetRoot => context.type_set.namespace.clone(),
        };

        let container_name = context.type_name(template);
        let mut container = Declaration::new(DeclarationKind::StaticClass, &container_name, namespace.clone());
        container.docs = Some(context.docs.template(docs::CONSTANTS_DOC, template)?);
        container.members.push(
            Member::new(MemberKind::Field, TEMPLATE_ID_CONSTANT, "System.Guid").with_body(MemberBody::Constant {
                value: bracketed(&template.id),
            }),
        );

        let mut taken: HashSet<String> = HashSet::from([container_name.clone(), TEMPLATE_ID_CONSTANT.to_string()]);
        for field in &template.fields {
            let base = naming::identifier(&field.name);
            let mut name = base.clone();
            if name == container_name || name == TEMPLATE_ID_CONSTANT {
                name = format!("{}{}", base, context.config.constants_collision_suffix);
                let message = format!(
                    "field '{}' of template {} collides with its container name, renamed to '{}'",
                    field.name, template.path, name
                );
                warn!(template = %template.path, field = %field.name, renamed = %name, "Constant name collision");
                warnings.push(message);
            }
            let mut counter = 2;
            let candidate = name.clone();
            while !taken.insert(name.clone()) {
                name = format!("{}{}", candidate, counter);
                counter += 1;
            }
            if name != candidate {
                warnings.push(format!(
                    "field '{}' of template {} has a repeated constant name, renamed to '{}'",
                    field.name, template.path, name
                ));
            }

            container.members.push(
                Member::new(MemberKind::Field, name, "System.Guid")
                    .with_body(MemberBody::Constant {
                        value: bracketed(&field.id),
                    })
                    .with_docs(Some(context.docs.field(docs::FIELD_CONSTANT_DOC, template, field)?)),
            );
        }

        let mut holder = Declaration::new(
            DeclarationKind::StaticClass,
            &context.config.constants_holder,
            namespace,
        );
        holder.nested.push(container);
        Ok(Some(holder))
    }
}
