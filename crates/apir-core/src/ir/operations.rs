use serde::Serialize;

use super::schemas::TypeIr;

/// HTTP method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Options,
    Head,
    Trace,
}

/// One endpoint per path-and-method pair in the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EndpointDefinition {
    pub method: HttpMethod,
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    pub query: Vec<QueryParameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<RequestBodyDefinition>,
    pub responses: Vec<ResponseVariant>,
    /// Sorted identifiers of emitted models referenced anywhere in the endpoint.
    pub imports: Vec<String>,
}

/// A query-string parameter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryParameter {
    pub name: String,
    pub required: bool,
    #[serde(rename = "type")]
    pub ty: TypeIr,
}

/// A request body with one entry per matching content type.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestBodyDefinition {
    pub required: bool,
    pub content: Vec<ContentVariant>,
}

/// The resolved schema under one content-type key.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentVariant {
    pub content_type: String,
    #[serde(rename = "type")]
    pub ty: TypeIr,
}

/// A success response; `content_type`/`ty` are absent for bodiless responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseVariant {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub ty: Option<TypeIr>,
}
