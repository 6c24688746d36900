use heck::ToPascalCase;
use serde::Serialize;

/// Serialization flavour encoded in a catalog key's base segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatVariant {
    #[default]
    None,
    Ld,
    JsonApi,
    Hal,
    Multipart,
}

/// Canonical shape of a raw catalog key such as `Book.jsonld-book.read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedName {
    pub base_path: String,
    /// Everything after the first `-`; empty when the key has no group.
    pub group_path: String,
    pub variant: FormatVariant,
    pub is_merge_patch: bool,
}

const FORMAT_SUFFIXES: &[(&str, FormatVariant)] = &[
    (".jsonld", FormatVariant::Ld),
    (".ld", FormatVariant::Ld),
    (".jsonapi", FormatVariant::JsonApi),
    (".jsonhal", FormatVariant::Hal),
    (".multipart", FormatVariant::Multipart),
];

const MERGE_PATCH_SUFFIXES: &[&str] = &[".jsonMergePatch", ".mergePatch"];

/// Fallback when a key sanitizes to nothing.
const UNNAMED: &str = "Unnamed";

/// Decompose a raw catalog key. Total: every input yields a `ParsedName`.
pub fn parse_name(raw: &str) -> ParsedName {
    let (base_segment, group_segment) = raw.split_once('-').unwrap_or((raw, ""));

    let mut base = base_segment;
    let mut variant = FormatVariant::None;
    let mut is_merge_patch = false;

    // Suffixes may be stacked in either order, e.g. `Book.jsonld.jsonMergePatch`.
    loop {
        if let Some(stripped) = strip_merge_patch(base) {
            base = stripped;
            is_merge_patch = true;
            continue;
        }
        if variant == FormatVariant::None {
            if let Some((stripped, found)) = strip_format(base) {
                base = stripped;
                variant = found;
                continue;
            }
        }
        break;
    }

    let group = match strip_merge_patch(group_segment) {
        Some(stripped) => {
            is_merge_patch = true;
            stripped
        }
        None => group_segment,
    };

    ParsedName {
        base_path: base.to_string(),
        group_path: group.to_string(),
        variant,
        is_merge_patch,
    }
}

impl ParsedName {
    /// Whether the base path carries the given reserved prefix.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty() && self.base_path.starts_with(prefix)
    }

    /// `pascal(base) + pascal(group tokens)`, tokens split on `.`, `:` and `_`.
    pub fn desired_identifier(&self) -> String {
        let mut ident = pascal(&self.base_path);
        for token in self
            .group_path
            .split(['.', ':', '_'])
            .filter(|t| !t.is_empty())
        {
            ident.push_str(&pascal(token));
        }
        if ident.is_empty() {
            return UNNAMED.to_string();
        }
        ident
    }
}

/// PascalCase of an arbitrary fragment, dropping characters that cannot
/// appear in an identifier.
pub fn pascal(fragment: &str) -> String {
    sanitize_identifier(fragment).to_pascal_case()
}

fn strip_format(segment: &str) -> Option<(&str, FormatVariant)> {
    FORMAT_SUFFIXES.iter().find_map(|(suffix, variant)| {
        strip_suffix_ignore_case(segment, suffix).map(|s| (s, *variant))
    })
}

fn strip_merge_patch(segment: &str) -> Option<&str> {
    MERGE_PATCH_SUFFIXES
        .iter()
        .find_map(|suffix| strip_suffix_ignore_case(segment, suffix))
}

fn strip_suffix_ignore_case<'a>(segment: &'a str, suffix: &str) -> Option<&'a str> {
    let split = segment.len().checked_sub(suffix.len())?;
    let tail = segment.get(split..)?;
    tail.eq_ignore_ascii_case(suffix)
        .then(|| &segment[..split])
}

/// Replace runs of non-alphanumeric characters with a single `_`.
fn sanitize_identifier(name: &str) -> String {
    let mut result = String::with_capacity(name.len());
    let mut prev_was_separator = false;

    for ch in name.chars() {
        if ch.is_alphanumeric() {
            if prev_was_separator && !result.is_empty() {
                result.push('_');
            }
            result.push(ch);
            prev_was_separator = false;
        } else {
            prev_was_separator = true;
        }
    }

    result
}
