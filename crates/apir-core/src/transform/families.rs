//! Content-type families: canonical media-type strings that select which
//! body and response entries a run considers.

use heck::ToPascalCase;

/// Suffix used when a family yields no usable token.
const FALLBACK_SUFFIX: &str = "Alt";

/// Lower-case a media type and drop any `;`-delimited parameters.
///
/// `application/ld+json; charset=utf-8` → `application/ld+json`
pub fn canonicalize(media_type: &str) -> String {
    let essence = media_type.split(';').next().unwrap_or_default();
    essence.trim().to_ascii_lowercase()
}

/// Whether a content-type key belongs to the given (canonical) family.
pub fn matches_family(content_type: &str, family: &str) -> bool {
    canonicalize(content_type) == family
}

/// Short identifier suffix derived from a family string.
///
/// `application/vnd.api+json` → `VndApiJson`, `jsonapi` → `Jsonapi`.
pub fn format_suffix(family: &str) -> String {
    let suffix: String = family
        .split(['/', '+', '.', '-'])
        .filter(|token| !token.is_empty() && !token.eq_ignore_ascii_case("application"))
        .map(|token| token.to_pascal_case())
        .collect();
    if suffix.is_empty() {
        FALLBACK_SUFFIX.to_string()
    } else {
        suffix
    }
}

/// Property names injected by a family's framing convention.
pub fn envelope_properties(family: &str) -> &'static [&'static str] {
    if family.contains("ld+json") {
        &["@context", "@id", "@type"]
    } else if family.contains("hal+json") {
        &["_links", "_embedded"]
    } else if family.contains("vnd.api+json") {
        &["links", "meta", "jsonapi"]
    } else {
        &[]
    }
}

/// A 2xx status code, the `2XX` wildcard, or `default`.
pub fn is_success_status(status: &str) -> bool {
    let status = status.trim();
    if status == "default" || status.eq_ignore_ascii_case("2xx") {
        return true;
    }
    status.len() == 3
        && status.starts_with('2')
        && status.bytes().all(|b| b.is_ascii_digit())
}
