use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::ir::{IdentifierMap, ObjectType, Property, TypeIr};
use crate::parse::ref_resolve::schema_ref_name;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef, SchemaType, TypeSet};
use crate::parse::spec::OpenApiSpec;

use super::name_parser::parse_name;

/// How optionality and nullability are derived.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredMode {
    /// Optional exactly when absent from `required`; nullable exactly as declared.
    #[default]
    Spec,
    /// Every property optional and every resolved type nullable.
    All,
}

/// Per-run data the resolver needs to turn a `$ref` into an identifier.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub spec: &'a OpenApiSpec,
    pub identifiers: &'a IdentifierMap,
    /// Raw names of the schemas that become models.
    pub emitted: &'a BTreeSet<String>,
    pub required_mode: RequiredMode,
    pub metadata_prefix: &'a str,
}

/// Converts schema nodes into [`TypeIr`], recording every emitted model it
/// references into a caller-supplied dependency sink.
#[derive(Debug, Clone, Copy)]
pub struct TypeResolver<'a> {
    ctx: ResolveContext<'a>,
}

impl<'a> TypeResolver<'a> {
    pub fn new(ctx: ResolveContext<'a>) -> Self {
        Self { ctx }
    }

    /// Resolve a schema in a value position (body, parameter, property).
    pub fn resolve(&self, schema: &SchemaOrRef, deps: &mut BTreeSet<String>) -> TypeIr {
        self.resolve_slot(schema, deps, &mut Vec::new())
    }

    /// Whether a property is optional under the configured mode.
    pub fn is_optional(&self, name: &str, required: &[String]) -> bool {
        match self.ctx.required_mode {
            RequiredMode::All => true,
            RequiredMode::Spec => !required.iter().any(|r| r == name),
        }
    }

    /// A value position: in `all` mode the result is widened with `null`.
    fn resolve_slot(
        &self,
        schema: &SchemaOrRef,
        deps: &mut BTreeSet<String>,
        inlining: &mut Vec<String>,
    ) -> TypeIr {
        let ty = self.resolve_node(schema, deps, inlining);
        match self.ctx.required_mode {
            RequiredMode::All => ty.nullable(),
            RequiredMode::Spec => ty,
        }
    }

    fn resolve_node(
        &self,
        schema: &SchemaOrRef,
        deps: &mut BTreeSet<String>,
        inlining: &mut Vec<String>,
    ) -> TypeIr {
        match schema {
            SchemaOrRef::Ref { ref_path } => self.resolve_ref(ref_path, deps, inlining),
            SchemaOrRef::Bool(_) => TypeIr::Any,
            SchemaOrRef::Schema(s) => {
                let ty = self.resolve_schema(s, deps, inlining);
                if s.is_nullable() { ty.nullable() } else { ty }
            }
        }
    }

    fn resolve_ref(
        &self,
        ref_path: &str,
        deps: &mut BTreeSet<String>,
        inlining: &mut Vec<String>,
    ) -> TypeIr {
        let Some(name) = schema_ref_name(ref_path) else {
            log::warn!("reference outside the schema catalog: {ref_path}");
            return TypeIr::Any;
        };
        let Some(target) = self.ctx.spec.schema(&name) else {
            log::warn!("reference to unknown schema: {ref_path}");
            return TypeIr::Any;
        };
        let parsed = parse_name(&name);
        if parsed.is_merge_patch || parsed.has_prefix(self.ctx.metadata_prefix) {
            log::debug!("reference to {name} degraded to any");
            return TypeIr::Any;
        }

        if self.ctx.emitted.contains(&name) {
            if let Some(identifier) = self.ctx.identifiers.get(&name) {
                deps.insert(identifier.to_string());
                return TypeIr::Ref(identifier.to_string());
            }
        }

        // Not a model (enum, primitive or array alias): resolve it in place.
        if inlining.contains(&name) {
            log::debug!("cyclic inline reference to {name} degraded to any");
            return TypeIr::Any;
        }
        inlining.push(name);
        let ty = self.resolve_node(target, deps, inlining);
        inlining.pop();
        ty
    }

    fn resolve_schema(
        &self,
        schema: &Schema,
        deps: &mut BTreeSet<String>,
        inlining: &mut Vec<String>,
    ) -> TypeIr {
        // Enum before type keywords so that an enumerated null is representable
        if !schema.enum_values.is_empty() {
            return TypeIr::union(schema.enum_values.iter().map(literal));
        }
        if let Some(value) = &schema.const_value {
            return literal(value);
        }

        match &schema.schema_type {
            Some(TypeSet::Single(SchemaType::Null)) => return TypeIr::Null,
            Some(TypeSet::Multiple(types)) => {
                return TypeIr::union(types.iter().map(|t| match t {
                    SchemaType::Null => TypeIr::Null,
                    other => {
                        let branch = Schema {
                            schema_type: Some(TypeSet::Single(*other)),
                            nullable: None,
                            ..schema.clone()
                        };
                        self.resolve_schema(&branch, deps, inlining)
                    }
                }));
            }
            _ => {}
        }

        if !schema.all_of.is_empty() {
            let mut parts: Vec<TypeIr> = schema
                .all_of
                .iter()
                .map(|branch| self.resolve_node(branch, deps, inlining))
                .collect();
            if !schema.properties.is_empty() {
                parts.push(self.resolve_object(schema, deps, inlining));
            }
            return TypeIr::intersection(parts);
        }

        if !schema.one_of.is_empty() || !schema.any_of.is_empty() {
            return TypeIr::union(
                schema
                    .one_of
                    .iter()
                    .chain(&schema.any_of)
                    .map(|branch| self.resolve_node(branch, deps, inlining))
                    .collect::<Vec<_>>(),
            );
        }

        let is_array = matches!(schema.schema_type, Some(TypeSet::Single(SchemaType::Array)))
            || (schema.schema_type.is_none() && schema.items.is_some());
        if is_array {
            let items = match &schema.items {
                Some(items) => self.resolve_slot(items, deps, inlining),
                None => TypeIr::Any,
            };
            return TypeIr::Array(Box::new(items));
        }

        if schema.is_object_shaped() {
            return self.resolve_object(schema, deps, inlining);
        }

        match &schema.schema_type {
            Some(TypeSet::Single(SchemaType::String)) => TypeIr::String,
            Some(TypeSet::Single(SchemaType::Integer | SchemaType::Number)) => TypeIr::Number,
            Some(TypeSet::Single(SchemaType::Boolean)) => TypeIr::Boolean,
            _ => TypeIr::Any,
        }
    }

    fn resolve_object(
        &self,
        schema: &Schema,
        deps: &mut BTreeSet<String>,
        inlining: &mut Vec<String>,
    ) -> TypeIr {
        let additional = match &schema.additional_properties {
            Some(AdditionalProperties::Schema(s)) => Some(self.resolve_slot(s, deps, inlining)),
            Some(AdditionalProperties::Bool(true)) => Some(TypeIr::Any),
            Some(AdditionalProperties::Bool(false)) | None => None,
        };

        if schema.properties.is_empty() {
            if let Some(values) = additional {
                return TypeIr::Map(Box::new(values));
            }
        }

        let props = schema
            .properties
            .iter()
            .map(|(name, prop)| Property {
                name: name.clone(),
                ty: self.resolve_slot(prop, deps, inlining),
                optional: self.is_optional(name, &schema.required),
            })
            .collect();

        TypeIr::Object(ObjectType {
            props,
            additional_properties: additional.map(Box::new),
        })
    }
}

fn literal(value: &serde_json::Value) -> TypeIr {
    match value {
        serde_json::Value::Null => TypeIr::Null,
        other => TypeIr::Literal(other.clone()),
    }
}
