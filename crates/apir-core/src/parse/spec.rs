use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::components::Components;
use super::operation::PathItem;
use super::schema::SchemaOrRef;

/// Info object describing the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    pub version: String,
}

/// Top-level OpenAPI 3.x contract document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiSpec {
    pub openapi: String,

    pub info: Info,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub paths: IndexMap<String, PathItem>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub components: Option<Components>,
}

impl OpenApiSpec {
    /// The schema catalog, empty when the document has no components.
    pub fn catalog(&self) -> Option<&IndexMap<String, SchemaOrRef>> {
        self.components.as_ref().map(|c| &c.schemas)
    }

    /// Look up a catalog entry by its raw name.
    pub fn schema(&self, name: &str) -> Option<&SchemaOrRef> {
        self.catalog().and_then(|schemas| schemas.get(name))
    }

    /// Whether the catalog holds an entry with this raw name.
    pub fn has_schema(&self, name: &str) -> bool {
        self.schema(name).is_some()
    }
}
