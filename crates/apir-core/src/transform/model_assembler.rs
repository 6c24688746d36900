use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::ir::{IdentifierMap, ModelDefinition, Property, TypeIr};
use crate::parse::ref_resolve::schema_ref_name;
use crate::parse::schema::{AdditionalProperties, Schema, SchemaOrRef};
use crate::parse::spec::OpenApiSpec;

use super::families::envelope_properties;
use super::name_parser::parse_name;
use super::spec_to_ir::TransformOptions;
use super::type_resolver::{ResolveContext, TypeResolver};
use super::usage::SchemaUsage;

/// Effective object shape of one catalog schema, before type resolution.
#[derive(Debug, Default)]
struct Shape<'a> {
    properties: IndexMap<String, &'a SchemaOrRef>,
    required: Vec<String>,
    additional: Option<&'a AdditionalProperties>,
    /// Raw names of emitted schemas this one extends.
    extends: Vec<String>,
    object_like: bool,
    absorbed_base: bool,
}

impl<'a> Shape<'a> {
    fn absorb(&mut self, schema: &'a Schema) {
        if !schema.is_object_shaped() {
            return;
        }
        self.object_like = true;
        for (name, prop) in &schema.properties {
            self.properties.insert(name.clone(), prop);
        }
        for name in &schema.required {
            if !self.required.contains(name) {
                self.required.push(name.clone());
            }
        }
        if schema.additional_properties.is_some() {
            self.additional = schema.additional_properties.as_ref();
        }
    }
}

/// Builds one [`ModelDefinition`] per emitted catalog schema.
pub struct ModelAssembler<'a> {
    spec: &'a OpenApiSpec,
    identifiers: &'a IdentifierMap,
    usage: &'a SchemaUsage,
    options: &'a TransformOptions,
}

impl<'a> ModelAssembler<'a> {
    pub fn new(
        spec: &'a OpenApiSpec,
        identifiers: &'a IdentifierMap,
        usage: &'a SchemaUsage,
        options: &'a TransformOptions,
    ) -> Self {
        Self {
            spec,
            identifiers,
            usage,
            options,
        }
    }

    /// The raw names among `selected` that produce a model.
    ///
    /// A schema stays in the set while its effective shape is object-like or
    /// it extends another member of the set. Dropping one schema can turn its
    /// dependents' `extends` entries into inlined properties, so this iterates
    /// until the set stops shrinking.
    pub fn emitted(&self, selected: &BTreeSet<String>) -> BTreeSet<String> {
        let mut emitted: BTreeSet<String> = selected
            .iter()
            .filter(|name| self.is_model_candidate(name))
            .cloned()
            .collect();

        loop {
            let next: BTreeSet<String> = emitted
                .iter()
                .filter(|name| {
                    self.spec.schema(name).is_some_and(|schema| {
                        let shape = self.shape(schema, &emitted);
                        shape.object_like || !shape.extends.is_empty()
                    })
                })
                .cloned()
                .collect();
            if next.len() == emitted.len() {
                break;
            }
            for name in emitted.difference(&next) {
                log::debug!("{name} is not model-shaped, no model emitted");
            }
            emitted = next;
        }

        emitted
    }

    /// Assemble every emitted schema, sorted by identifier.
    pub fn assemble(&self, emitted: &BTreeSet<String>) -> Vec<ModelDefinition> {
        let emitted_identifiers: BTreeSet<&str> = emitted
            .iter()
            .filter_map(|name| self.identifiers.get(name))
            .collect();
        let resolver = TypeResolver::new(ResolveContext {
            spec: self.spec,
            identifiers: self.identifiers,
            emitted,
            required_mode: self.options.required_mode,
            metadata_prefix: &self.options.metadata_prefix,
        });

        let mut models: Vec<ModelDefinition> = emitted
            .iter()
            .filter_map(|name| {
                let schema = self.spec.schema(name)?;
                let identifier = self.identifiers.get(name)?;
                Some(self.build(name, identifier, schema, emitted, &emitted_identifiers, &resolver))
            })
            .collect();

        models.sort_by(|a, b| a.name.cmp(&b.name));
        models
    }

    fn build(
        &self,
        name: &str,
        identifier: &str,
        schema: &'a SchemaOrRef,
        emitted: &BTreeSet<String>,
        emitted_identifiers: &BTreeSet<&str>,
        resolver: &TypeResolver<'_>,
    ) -> ModelDefinition {
        let shape = self.shape(schema, emitted);
        let envelope = self
            .usage
            .preferred_family(name)
            .and_then(|index| self.options.families.get(index))
            .map_or(&[][..], |family| envelope_properties(family));

        let mut deps = BTreeSet::new();
        let mut stripped = false;
        let mut props = Vec::with_capacity(shape.properties.len());
        for (prop_name, prop) in &shape.properties {
            if envelope.contains(&prop_name.as_str()) {
                stripped = true;
                continue;
            }
            props.push(Property {
                name: prop_name.clone(),
                ty: resolver.resolve(prop, &mut deps),
                optional: resolver.is_optional(prop_name, &shape.required),
            });
        }

        let additional_properties = match shape.additional {
            Some(AdditionalProperties::Schema(values)) => Some(resolver.resolve(values, &mut deps)),
            Some(AdditionalProperties::Bool(true)) => Some(TypeIr::Any),
            _ => None,
        };

        let extends: Vec<String> = shape
            .extends
            .iter()
            .filter_map(|raw| self.identifiers.get(raw))
            .map(str::to_string)
            .collect();

        let imports: Vec<String> = deps
            .iter()
            .map(String::as_str)
            .chain(extends.iter().map(String::as_str))
            .filter(|dep| *dep != identifier && emitted_identifiers.contains(dep))
            .collect::<BTreeSet<_>>()
            .into_iter()
            .map(str::to_string)
            .collect();

        ModelDefinition {
            name: identifier.to_string(),
            source: name.to_string(),
            props,
            additional_properties,
            imports,
            extends,
            extends_marker: stripped || shape.absorbed_base,
        }
    }

    fn is_model_candidate(&self, name: &str) -> bool {
        let parsed = parse_name(name);
        !parsed.is_merge_patch
            && !parsed.has_prefix(&self.options.metadata_prefix)
            && self.identifiers.get(name).is_some()
    }

    fn shape(&self, schema: &'a SchemaOrRef, emitted: &BTreeSet<String>) -> Shape<'a> {
        let mut shape = Shape::default();
        match schema {
            // An alias composes exactly like a one-branch allOf.
            SchemaOrRef::Ref { .. } => {
                self.compose(std::slice::from_ref(schema), emitted, &mut shape);
            }
            SchemaOrRef::Bool(_) => {}
            SchemaOrRef::Schema(s) => {
                if !s.all_of.is_empty() {
                    self.compose(&s.all_of, emitted, &mut shape);
                }
                shape.absorb(s);
            }
        }
        shape
    }

    fn compose(&self, branches: &'a [SchemaOrRef], emitted: &BTreeSet<String>, shape: &mut Shape<'a>) {
        let flattenable = branches
            .iter()
            .all(|branch| {
                self.is_base_ref(branch)
                    || is_plain_object(branch)
                    || matches!(branch, SchemaOrRef::Bool(_))
            });

        for branch in branches {
            match branch {
                SchemaOrRef::Schema(inline) => {
                    if inline.is_object_shaped() {
                        shape.absorb(inline);
                    } else {
                        log::debug!("skipping non-object allOf branch");
                    }
                }
                SchemaOrRef::Bool(_) => log::debug!("skipping boolean allOf branch"),
                SchemaOrRef::Ref { ref_path } => {
                    let Some(target_name) = schema_ref_name(ref_path) else {
                        log::warn!("allOf branch outside the schema catalog: {ref_path}");
                        continue;
                    };
                    let Some(target) = self.spec.schema(&target_name) else {
                        log::warn!("allOf branch references unknown schema: {ref_path}");
                        continue;
                    };

                    let is_base = target_name == self.options.base_schema;
                    if !flattenable && emitted.contains(&target_name) {
                        shape.extends.push(target_name);
                        continue;
                    }
                    if !flattenable && !is_base {
                        log::warn!("inlining properties of {target_name}: not an emitted model");
                    }
                    if let Some(target) = target.as_schema() {
                        shape.absorb(target);
                    }
                    shape.absorbed_base |= is_base;
                }
            }
        }
    }

    fn is_base_ref(&self, branch: &SchemaOrRef) -> bool {
        !self.options.base_schema.is_empty()
            && branch
                .ref_path()
                .and_then(schema_ref_name)
                .is_some_and(|name| name == self.options.base_schema)
    }
}

fn is_plain_object(branch: &SchemaOrRef) -> bool {
    branch
        .as_schema()
        .is_some_and(|s| s.is_object_shaped() && !s.has_composition())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;
    use crate::transform::transform;

    fn models(doc: &str, options: &TransformOptions) -> Vec<ModelDefinition> {
        let spec = parse::from_yaml(doc).unwrap();
        transform(&spec, options).unwrap().models
    }

    fn json_options() -> TransformOptions {
        TransformOptions {
            families: vec!["application/json".into()],
            ..Default::default()
        }
    }

    fn composed_doc(base: &str) -> String {
        format!(
            r##"
openapi: "3.0.3"
info: {{ title: T, version: "1" }}
paths:
  /things:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: {{ $ref: "#/components/schemas/Thing" }}
components:
  schemas:
    {base}:
      type: object
      properties:
        id: {{ type: string }}
    Thing:
      allOf:
        - $ref: "#/components/schemas/{base}"
        - type: object
          properties:
            x: {{ type: string }}
"##
        )
    }

    #[test]
    fn test_safe_flatten_absorbs_base() {
        let options = TransformOptions {
            base_schema: "Base".into(),
            ..json_options()
        };
        let models = models(&composed_doc("Base"), &options);
        let thing = models.iter().find(|m| m.name == "Thing").unwrap();
        assert!(thing.extends.is_empty());
        assert!(thing.extends_marker);
        assert!(thing.prop("x").is_some());
        assert!(thing.prop("id").is_some());
        assert!(thing.imports.is_empty());
    }

    #[test]
    fn test_unrelated_ref_falls_back_to_extends() {
        let models = models(&composed_doc("Base"), &json_options());
        let thing = models.iter().find(|m| m.name == "Thing").unwrap();
        assert_eq!(thing.extends, vec!["Base"]);
        assert_eq!(thing.imports, vec!["Base"]);
        assert_eq!(thing.props.len(), 1);
        assert_eq!(thing.props[0].name, "x");
        assert!(!thing.extends_marker);
        assert!(models.iter().any(|m| m.name == "Base"));
    }

    #[test]
    fn test_non_model_and_merge_patch_schemas_are_skipped() {
        let doc = r##"
openapi: "3.0.3"
info: { title: T, version: "1" }
paths:
  /things:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Thing" }
    put:
      requestBody:
        content:
          application/json:
            schema: { $ref: "#/components/schemas/Thing.jsonMergePatch" }
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Names" }
components:
  schemas:
    Thing:
      type: object
      properties:
        status: { $ref: "#/components/schemas/Status" }
    Status:
      type: string
      enum: [on, off]
    Names:
      type: array
      items: { type: string }
    Thing.jsonMergePatch:
      type: object
      properties:
        status: { type: string }
"##;
        let models = models(doc, &json_options());
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Thing"]);
        let status = &models[0].prop("status").unwrap().ty;
        assert!(matches!(status, TypeIr::Union(members) if members.len() == 2));
        assert!(models[0].imports.is_empty());
    }

    #[test]
    fn test_envelope_stripped_for_preferred_family() {
        let doc = r##"
openapi: "3.1.0"
info: { title: T, version: "1" }
paths:
  /books:
    get:
      responses:
        "200":
          content:
            application/ld+json:
              schema: { $ref: "#/components/schemas/Book.jsonld" }
components:
  schemas:
    Book.jsonld:
      type: object
      required: ["@id", title]
      properties:
        "@context": { type: string }
        "@id": { type: string }
        "@type": { type: string }
        title: { type: string }
        self: { $ref: "#/components/schemas/Book.jsonld" }
"##;
        let models = models(doc, &TransformOptions::default());
        assert_eq!(models.len(), 1);
        let book = &models[0];
        assert_eq!(book.name, "Book");
        assert_eq!(book.source, "Book.jsonld");
        assert!(book.extends_marker);
        let names: Vec<&str> = book.props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["title", "self"]);
        assert_eq!(book.prop("self").unwrap().ty, TypeIr::Ref("Book".into()));
        // Self-reference never lands in imports.
        assert!(book.imports.is_empty());
    }

    #[test]
    fn test_unemitted_branch_target_is_inlined() {
        let doc = r##"
openapi: "3.0.3"
info: { title: T, version: "1" }
paths:
  /things:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Thing" }
components:
  schemas:
    HydraStamp:
      properties:
        at: { type: string }
    Stamp:
      properties:
        by: { type: string }
    Thing:
      allOf:
        - $ref: "#/components/schemas/HydraStamp"
        - $ref: "#/components/schemas/Stamp"
        - $ref: "#/components/schemas/Label"
        - type: object
          properties:
            x: { type: number }
    Label:
      type: string
"##;
        let models = models(doc, &json_options());
        let thing = models.iter().find(|m| m.name == "Thing").unwrap();
        assert_eq!(thing.extends, vec!["Stamp"]);
        let names: Vec<&str> = thing.props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["at", "x"]);
        assert!(models.iter().all(|m| m.name != "Label"));
    }

    #[test]
    fn test_alias_schema_extends_target() {
        let doc = r##"
openapi: "3.0.3"
info: { title: T, version: "1" }
paths:
  /things:
    get:
      responses:
        "200":
          content:
            application/json:
              schema: { $ref: "#/components/schemas/Alias" }
components:
  schemas:
    Alias:
      $ref: "#/components/schemas/Thing"
    Thing:
      type: object
      properties:
        x: { type: number }
"##;
        let models = models(doc, &json_options());
        let alias = models.iter().find(|m| m.name == "Alias").unwrap();
        assert_eq!(alias.extends, vec!["Thing"]);
        assert!(alias.props.is_empty());
    }

    #[test]
    fn test_models_sorted_by_identifier() {
        let models = models(&composed_doc("Zeta"), &json_options());
        let names: Vec<&str> = models.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["Thing", "Zeta"]);
    }
}
