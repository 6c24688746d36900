use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::ir::{
    ContentVariant, EndpointDefinition, HttpMethod, QueryParameter, RequestBodyDefinition,
    ResponseVariant, TypeIr,
};
use crate::parse::media_type::MediaType;
use crate::parse::operation::Operation;
use crate::parse::parameter::{Parameter, ParameterLocation, ParameterOrRef};
use crate::parse::ref_resolve::RefResolver;
use crate::parse::schema::SchemaOrRef;
use crate::parse::spec::OpenApiSpec;

use super::families::{canonicalize, is_success_status, matches_family};
use super::type_resolver::TypeResolver;

/// Builds one [`EndpointDefinition`] per path-and-method pair.
pub struct EndpointAssembler<'a> {
    spec: &'a OpenApiSpec,
    refs: RefResolver<'a>,
    resolver: TypeResolver<'a>,
    families: Vec<String>,
}

impl<'a> EndpointAssembler<'a> {
    pub fn new(spec: &'a OpenApiSpec, resolver: TypeResolver<'a>, families: &[String]) -> Self {
        Self {
            spec,
            refs: RefResolver::new(spec),
            resolver,
            families: families.iter().map(|f| canonicalize(f)).collect(),
        }
    }

    /// Endpoints in document path order, methods in fixed order per path.
    /// Operations are never dropped, only detail that no family can express.
    pub fn assemble(&self) -> Vec<EndpointDefinition> {
        let mut endpoints = Vec::new();
        for (path, item) in &self.spec.paths {
            for (method, op) in item.operations() {
                endpoints.push(self.build(method, path, &item.parameters, op));
            }
        }
        endpoints
    }

    fn build(
        &self,
        method: HttpMethod,
        path: &str,
        path_params: &'a [ParameterOrRef],
        op: &'a Operation,
    ) -> EndpointDefinition {
        let mut deps = BTreeSet::new();

        let query = self
            .merge_parameters(path_params, &op.parameters)
            .into_values()
            .filter(|p| p.location == ParameterLocation::Query)
            .map(|p| QueryParameter {
                name: p.name.clone(),
                required: p.required,
                ty: self.resolve_optional(p.schema.as_ref(), &mut deps),
            })
            .collect();

        // Merge-patch bodies are partial updates, never modeled here
        let request_body = if method == HttpMethod::Patch {
            None
        } else {
            op.request_body
                .as_ref()
                .and_then(|body| self.refs.request_body(body))
                .and_then(|body| {
                    let content: Vec<ContentVariant> = self
                        .matching_content(&body.content)
                        .map(|(content_type, media)| ContentVariant {
                            content_type: content_type.to_string(),
                            ty: self.resolve_optional(media.schema.as_ref(), &mut deps),
                        })
                        .collect();
                    (!content.is_empty()).then_some(RequestBodyDefinition {
                        required: body.required,
                        content,
                    })
                })
        };

        let mut responses = Vec::new();
        for (status, response) in &op.responses {
            if !is_success_status(status) {
                continue;
            }
            let Some(response) = self.refs.response(response) else {
                continue;
            };
            if response.content.is_empty() {
                responses.push(ResponseVariant {
                    status: status.clone(),
                    content_type: None,
                    ty: None,
                });
                continue;
            }
            for (content_type, media) in self.matching_content(&response.content) {
                responses.push(ResponseVariant {
                    status: status.clone(),
                    content_type: Some(content_type.to_string()),
                    ty: Some(self.resolve_optional(media.schema.as_ref(), &mut deps)),
                });
            }
        }

        EndpointDefinition {
            method,
            path: path.to_string(),
            operation_id: op.operation_id.clone(),
            query,
            request_body,
            responses,
            imports: deps.into_iter().collect(),
        }
    }

    /// Path-level parameters overridden by operation-level ones sharing the
    /// same name and location.
    fn merge_parameters(
        &self,
        path_params: &'a [ParameterOrRef],
        op_params: &'a [ParameterOrRef],
    ) -> IndexMap<(String, ParameterLocation), &'a Parameter> {
        let mut merged = IndexMap::new();
        for param in path_params.iter().chain(op_params) {
            if let Some(param) = self.refs.parameter(param) {
                merged.insert((param.name.clone(), param.location), param);
            }
        }
        merged
    }

    /// Content entries matching a selected family, most preferred family first.
    fn matching_content<'m>(
        &self,
        content: &'m IndexMap<String, MediaType>,
    ) -> impl Iterator<Item = (&'m str, &'m MediaType)> {
        self.families.iter().flat_map(move |family| {
            content
                .iter()
                .filter(move |(content_type, _)| matches_family(content_type, family))
                .map(|(content_type, media)| (content_type.as_str(), media))
        })
    }

    fn resolve_optional(
        &self,
        schema: Option<&SchemaOrRef>,
        deps: &mut BTreeSet<String>,
    ) -> TypeIr {
        schema.map_or(TypeIr::Any, |s| self.resolver.resolve(s, deps))
    }
}
