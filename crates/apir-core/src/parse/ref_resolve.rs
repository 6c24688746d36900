use std::collections::HashSet;

use super::components::Components;
use super::parameter::{Parameter, ParameterOrRef};
use super::request_body::{RequestBody, RequestBodyOrRef};
use super::response::{Response, ResponseOrRef};
use super::spec::OpenApiSpec;

/// Prefix of every reference into the schema catalog.
pub const SCHEMA_REF_PREFIX: &str = "#/components/schemas/";

/// Extract the catalog name from a `$ref` like `#/components/schemas/Foo`.
///
/// Returns `None` for references into other component sections and for
/// external/remote references. JSON-pointer escapes (`~1`, `~0`) are decoded.
pub fn schema_ref_name(ref_path: &str) -> Option<String> {
    let name = ref_path.strip_prefix(SCHEMA_REF_PREFIX)?;
    if name.is_empty() || name.contains('/') {
        return None;
    }
    Some(name.replace("~1", "/").replace("~0", "~"))
}

/// Follows `$ref` pointers to reusable parameters, request bodies and
/// responses. Missing or malformed targets resolve to `None`; chained
/// references are followed until a cycle is detected.
pub struct RefResolver<'a> {
    components: Option<&'a Components>,
}

impl<'a> RefResolver<'a> {
    pub fn new(spec: &'a OpenApiSpec) -> Self {
        Self {
            components: spec.components.as_ref(),
        }
    }

    pub fn parameter(&self, param: &'a ParameterOrRef) -> Option<&'a Parameter> {
        let mut visited = HashSet::new();
        let mut current = param;
        loop {
            match current {
                ParameterOrRef::Parameter(p) => return Some(p),
                ParameterOrRef::Ref { ref_path } => {
                    if !visited.insert(ref_path.as_str()) {
                        log::warn!("circular parameter reference {ref_path}");
                        return None;
                    }
                    let name = parse_ref_name(ref_path, "parameters")?;
                    current = self.lookup(ref_path, |c| c.parameters.get(name))?;
                }
            }
        }
    }

    pub fn request_body(&self, body: &'a RequestBodyOrRef) -> Option<&'a RequestBody> {
        let mut visited = HashSet::new();
        let mut current = body;
        loop {
            match current {
                RequestBodyOrRef::RequestBody(rb) => return Some(rb),
                RequestBodyOrRef::Ref { ref_path } => {
                    if !visited.insert(ref_path.as_str()) {
                        log::warn!("circular request body reference {ref_path}");
                        return None;
                    }
                    let name = parse_ref_name(ref_path, "requestBodies")?;
                    current = self.lookup(ref_path, |c| c.request_bodies.get(name))?;
                }
            }
        }
    }

    pub fn response(&self, response: &'a ResponseOrRef) -> Option<&'a Response> {
        let mut visited = HashSet::new();
        let mut current = response;
        loop {
            match current {
                ResponseOrRef::Response(r) => return Some(r),
                ResponseOrRef::Ref { ref_path } => {
                    if !visited.insert(ref_path.as_str()) {
                        log::warn!("circular response reference {ref_path}");
                        return None;
                    }
                    let name = parse_ref_name(ref_path, "responses")?;
                    current = self.lookup(ref_path, |c| c.responses.get(name))?;
                }
            }
        }
    }

    fn lookup<T>(
        &self,
        ref_path: &str,
        get: impl FnOnce(&'a Components) -> Option<&'a T>,
    ) -> Option<&'a T> {
        let found = self.components.and_then(get);
        if found.is_none() {
            log::warn!("reference target not found: {ref_path}");
        }
        found
    }
}

/// Parse a `$ref` path like `#/components/parameters/Foo` and extract the name.
fn parse_ref_name<'r>(ref_path: &'r str, expected_section: &str) -> Option<&'r str> {
    let parsed = ref_path
        .strip_prefix("#/components/")
        .and_then(|stripped| stripped.split_once('/'))
        .filter(|(section, _)| *section == expected_section)
        .map(|(_, name)| name);
    if parsed.is_none() {
        log::warn!("invalid reference for section '{expected_section}': {ref_path}");
    }
    parsed
}
