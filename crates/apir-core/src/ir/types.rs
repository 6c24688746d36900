use std::collections::BTreeMap;

use serde::Serialize;

// Re-export schema and operation types for convenience
pub use super::operations::*;
pub use super::schemas::*;

/// Everything one pipeline run hands to the emitters.
#[derive(Debug, Clone, Serialize)]
pub struct IrSpec {
    pub models: Vec<ModelDefinition>,
    pub endpoints: Vec<EndpointDefinition>,
    pub identifiers: IdentifierMap,
}

impl IrSpec {
    pub fn model(&self, name: &str) -> Option<&ModelDefinition> {
        self.models.iter().find(|m| m.name == name)
    }

    pub fn endpoint(&self, method: HttpMethod, path: &str) -> Option<&EndpointDefinition> {
        self.endpoints
            .iter()
            .find(|e| e.method == method && e.path == path)
    }
}

/// Raw catalog name → allocated identifier, unique within one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct IdentifierMap {
    by_raw: BTreeMap<String, String>,
}

impl IdentifierMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, raw: impl Into<String>, identifier: impl Into<String>) {
        self.by_raw.insert(raw.into(), identifier.into());
    }

    pub fn get(&self, raw: &str) -> Option<&str> {
        self.by_raw.get(raw).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.by_raw.iter().map(|(r, i)| (r.as_str(), i.as_str()))
    }

    pub fn len(&self) -> usize {
        self.by_raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_raw.is_empty()
    }
}
