use std::collections::{BTreeMap, BTreeSet, VecDeque};

use crate::ir::HttpMethod;
use crate::parse::media_type::MediaType;
use crate::parse::ref_resolve::{RefResolver, schema_ref_name};
use crate::parse::schema::SchemaOrRef;
use crate::parse::spec::OpenApiSpec;

use super::families::{canonicalize, is_success_status, matches_family};
use super::name_parser::parse_name;

/// Which content-type families (by index into the caller's ordered family
/// list) reach each raw catalog name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaUsage {
    reached: BTreeMap<String, BTreeSet<usize>>,
}

impl SchemaUsage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `family` reaches `name`. Returns whether anything changed.
    pub fn insert(&mut self, name: impl Into<String>, family: usize) -> bool {
        self.reached.entry(name.into()).or_default().insert(family)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.reached.contains_key(name)
    }

    pub fn families_of(&self, name: &str) -> Option<&BTreeSet<usize>> {
        self.reached.get(name)
    }

    /// The most preferred (lowest index) family reaching `name`.
    pub fn preferred_family(&self, name: &str) -> Option<usize> {
        self.reached.get(name).and_then(|f| f.first().copied())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.reached.keys().map(String::as_str)
    }

    pub fn name_set(&self) -> BTreeSet<String> {
        self.reached.keys().cloned().collect()
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) {
        self.reached.retain(|name, _| keep(name));
    }

    pub fn len(&self) -> usize {
        self.reached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reached.is_empty()
    }
}

/// Finds the catalog schemas real operations use, and their reference closure.
pub struct UsageAnalyzer<'a> {
    spec: &'a OpenApiSpec,
    metadata_prefix: &'a str,
}

impl<'a> UsageAnalyzer<'a> {
    pub fn new(spec: &'a OpenApiSpec, metadata_prefix: &'a str) -> Self {
        Self {
            spec,
            metadata_prefix,
        }
    }

    /// Every schema used by `family`, closure included.
    pub fn collect_used(&self, family: &str) -> BTreeSet<String> {
        self.collect_usage(&[family.to_string()]).name_set()
    }

    /// Usage across several families, remembering which family reached what.
    pub fn collect_usage(&self, families: &[String]) -> SchemaUsage {
        let mut seeds = SchemaUsage::new();
        for (index, family) in families.iter().enumerate() {
            let roots = self.roots(family);
            log::debug!("family {family}: {} root schema(s)", roots.len());
            for root in roots {
                seeds.insert(root, index);
            }
        }
        self.expand_closure(seeds)
    }

    /// Schemas referenced at the root of request bodies (non-PATCH) and
    /// success responses for one family.
    pub fn roots(&self, family: &str) -> BTreeSet<String> {
        let family = canonicalize(family);
        let resolver = RefResolver::new(self.spec);
        let mut roots = BTreeSet::new();

        for item in self.spec.paths.values() {
            for (method, op) in item.operations() {
                // PATCH bodies are partial merge-patch variants, not new models
                if method != HttpMethod::Patch {
                    if let Some(body) = op.request_body.as_ref().and_then(|b| resolver.request_body(b)) {
                        self.collect_content(&body.content, &family, &mut roots);
                    }
                }
                for (status, response) in &op.responses {
                    if !is_success_status(status) {
                        continue;
                    }
                    if let Some(response) = resolver.response(response) {
                        self.collect_content(&response.content, &family, &mut roots);
                    }
                }
            }
        }

        roots
    }

    /// Transitive closure over catalog references, propagating family
    /// membership along every edge until nothing changes.
    pub fn expand_closure(&self, seeds: SchemaUsage) -> SchemaUsage {
        let mut usage = SchemaUsage::new();
        let mut queue: VecDeque<String> = VecDeque::new();

        for (name, families) in seeds.reached {
            if !self.accepts(&name) {
                log::debug!("dropping seed {name}: not a usable catalog entry");
                continue;
            }
            for family in families {
                usage.insert(name.clone(), family);
            }
            queue.push_back(name);
        }

        while let Some(name) = queue.pop_front() {
            let Some(families) = usage.families_of(&name).cloned() else {
                continue;
            };
            for dependency in self.references(&name) {
                let mut grew = false;
                for &family in &families {
                    grew |= usage.insert(dependency.clone(), family);
                }
                if grew {
                    queue.push_back(dependency);
                }
            }
        }

        usage
    }

    /// Direct catalog references of one catalog entry, restricted to names
    /// the closure may follow.
    pub fn references(&self, name: &str) -> BTreeSet<String> {
        let mut refs = BTreeSet::new();
        if let Some(entry) = self.spec.schema(name) {
            collect_refs(entry, &mut refs);
        }
        refs.retain(|r| self.accepts(r));
        refs
    }

    /// In the catalog and not reserved protocol metadata.
    fn accepts(&self, name: &str) -> bool {
        self.spec.has_schema(name) && !parse_name(name).has_prefix(self.metadata_prefix)
    }

    fn collect_content(
        &self,
        content: &indexmap::IndexMap<String, MediaType>,
        family: &str,
        out: &mut BTreeSet<String>,
    ) {
        for (content_type, media) in content {
            if !matches_family(content_type, family) {
                continue;
            }
            if let Some(schema) = &media.schema {
                let mut refs = BTreeSet::new();
                collect_refs(schema, &mut refs);
                out.extend(refs.into_iter().filter(|r| self.accepts(r)));
            }
        }
    }
}

/// Collect catalog names referenced by a schema without following the
/// references themselves.
fn collect_refs(schema: &SchemaOrRef, out: &mut BTreeSet<String>) {
    match schema {
        SchemaOrRef::Ref { ref_path } => {
            if let Some(name) = schema_ref_name(ref_path) {
                out.insert(name);
            }
        }
        SchemaOrRef::Schema(inner) => {
            for child in inner.children() {
                collect_refs(child, out);
            }
        }
        SchemaOrRef::Bool(_) => {}
    }
}
