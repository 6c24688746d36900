use crate::error::TransformError;
use crate::ir::IrSpec;
use crate::parse::spec::OpenApiSpec;

use super::endpoint_assembler::EndpointAssembler;
use super::families::canonicalize;
use super::filter::{FilterRule, is_selected};
use super::identifiers::{Candidate, allocate};
use super::model_assembler::ModelAssembler;
use super::name_parser::parse_name;
use super::type_resolver::{RequiredMode, ResolveContext, TypeResolver};
use super::usage::{SchemaUsage, UsageAnalyzer};

/// Default content-type family when none is configured.
pub const DEFAULT_FAMILY: &str = "application/ld+json";
/// Default prefix of reserved protocol-metadata schemas.
pub const DEFAULT_METADATA_PREFIX: &str = "Hydra";
/// Default flatten-compatible protocol base schema.
pub const DEFAULT_BASE_SCHEMA: &str = "HydraItemBaseSchema";

/// Options controlling selection, naming and type resolution.
#[derive(Debug, Clone)]
pub struct TransformOptions {
    pub required_mode: RequiredMode,
    /// Content-type families, most preferred first.
    pub families: Vec<String>,
    /// Raw catalog names to select even when no operation reaches them.
    pub schemas: Vec<String>,
    pub include: Vec<FilterRule>,
    pub exclude: Vec<FilterRule>,
    pub metadata_prefix: String,
    pub base_schema: String,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self {
            required_mode: RequiredMode::Spec,
            families: vec![DEFAULT_FAMILY.to_string()],
            schemas: Vec::new(),
            include: Vec::new(),
            exclude: Vec::new(),
            metadata_prefix: DEFAULT_METADATA_PREFIX.to_string(),
            base_schema: DEFAULT_BASE_SCHEMA.to_string(),
        }
    }
}

impl TransformOptions {
    fn has_filters(&self) -> bool {
        !self.include.is_empty() || !self.exclude.is_empty()
    }
}

/// Transform a parsed contract document into the IR.
pub fn transform(spec: &OpenApiSpec, options: &TransformOptions) -> Result<IrSpec, TransformError> {
    // Phase 1: Canonicalize families, dropping duplicates after the first
    let mut families: Vec<String> = Vec::with_capacity(options.families.len());
    for family in &options.families {
        let family = canonicalize(family);
        if !family.is_empty() && !families.contains(&family) {
            families.push(family);
        }
    }
    let options = &TransformOptions {
        families,
        ..options.clone()
    };

    // Phase 2: Select schemas (usage closure, explicit roots, filters)
    let usage = select(spec, options)?;

    // Phase 3: Allocate identifiers for everything that can become a model
    let candidates: Vec<Candidate> = usage
        .names()
        .filter(|name| {
            let parsed = parse_name(name);
            !parsed.is_merge_patch && !parsed.has_prefix(&options.metadata_prefix)
        })
        .filter_map(|name| {
            let family = options.families.get(usage.preferred_family(name)?)?;
            Some(Candidate::new(name, family.as_str()))
        })
        .collect();
    let identifiers = allocate(&candidates, &options.families);

    // Phase 4: Assemble models
    let assembler = ModelAssembler::new(spec, &identifiers, &usage, options);
    let emitted = assembler.emitted(&usage.name_set());
    let models = assembler.assemble(&emitted);

    // Phase 5: Assemble endpoints
    let resolver = TypeResolver::new(ResolveContext {
        spec,
        identifiers: &identifiers,
        emitted: &emitted,
        required_mode: options.required_mode,
        metadata_prefix: &options.metadata_prefix,
    });
    let endpoints = EndpointAssembler::new(spec, resolver, &options.families).assemble();

    log::info!(
        "{} schema(s) selected, {} model(s), {} endpoint(s)",
        usage.len(),
        models.len(),
        endpoints.len()
    );

    Ok(IrSpec {
        models,
        endpoints,
        identifiers,
    })
}

/// The selected schemas with the families that reach each of them.
///
/// Filters run on the closure of the usage roots, and the closure is computed
/// again afterwards so that a selected schema never loses its dependencies.
pub fn select(spec: &OpenApiSpec, options: &TransformOptions) -> Result<SchemaUsage, TransformError> {
    let analyzer = UsageAnalyzer::new(spec, &options.metadata_prefix);
    let mut usage = analyzer.collect_usage(&options.families);
    log::debug!("usage closure: {} schema(s)", usage.len());

    for name in &options.schemas {
        if !spec.has_schema(name) {
            return Err(TransformError::UnknownSchema(name.clone()));
        }
    }
    if !options.schemas.is_empty() && options.families.is_empty() {
        return Err(TransformError::SchemasWithoutFamily(options.schemas.clone()));
    }
    // Requested schemas are attributed to the most preferred family
    for name in &options.schemas {
        usage.insert(name.clone(), 0);
    }

    if !options.has_filters() {
        return Ok(analyzer.expand_closure(usage));
    }

    let mut usage = analyzer.expand_closure(usage);
    usage.retain(|name| is_selected(name, &options.include, &options.exclude));
    if usage.is_empty() && !options.families.is_empty() {
        return Err(TransformError::EmptySelection {
            families: options.families.clone(),
        });
    }

    let usage = analyzer.expand_closure(usage);
    log::debug!("filtered selection: {} schema(s)", usage.len());
    Ok(usage)
}
