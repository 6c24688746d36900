use std::collections::{BTreeMap, HashSet};

use crate::ir::IdentifierMap;

use super::families::format_suffix;
use super::name_parser::parse_name;

/// A reachable schema waiting for an identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub raw_name: String,
    /// The most preferred family that reached this schema.
    pub preferred_family: String,
}

impl Candidate {
    pub fn new(raw_name: impl Into<String>, preferred_family: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            preferred_family: preferred_family.into(),
        }
    }
}

/// Allocate a unique identifier per candidate.
///
/// Candidates are bucketed by their desired identifier; buckets are visited
/// in lexical order. Inside a bucket, candidates are ordered by the rank of
/// their preferred family in `families` (unknown families rank last), then by
/// raw name. The first candidate keeps the bare identifier, later ones get the
/// family's format suffix, and a numeric disambiguator settles any remaining
/// clash.
pub fn allocate(candidates: &[Candidate], families: &[String]) -> IdentifierMap {
    let mut buckets: BTreeMap<String, Vec<&Candidate>> = BTreeMap::new();
    let mut seen_raw: HashSet<&str> = HashSet::new();
    for candidate in candidates {
        if seen_raw.insert(candidate.raw_name.as_str()) {
            let desired = parse_name(&candidate.raw_name).desired_identifier();
            buckets.entry(desired).or_default().push(candidate);
        }
    }

    let rank = |family: &str| {
        families
            .iter()
            .position(|f| f == family)
            .unwrap_or(usize::MAX)
    };

    let mut map = IdentifierMap::new();
    let mut taken: HashSet<String> = HashSet::new();

    for (desired, mut bucket) in buckets {
        bucket.sort_by(|a, b| {
            rank(&a.preferred_family)
                .cmp(&rank(&b.preferred_family))
                .then_with(|| a.raw_name.cmp(&b.raw_name))
        });

        for (i, candidate) in bucket.into_iter().enumerate() {
            let wanted = if i == 0 {
                desired.clone()
            } else {
                format!("{desired}{}", format_suffix(&candidate.preferred_family))
            };
            let identifier = disambiguate(wanted, &taken);
            if i > 0 {
                log::debug!(
                    "identifier collision on {desired}: {} -> {identifier}",
                    candidate.raw_name
                );
            }
            taken.insert(identifier.clone());
            map.insert(candidate.raw_name.clone(), identifier);
        }
    }

    map
}

fn disambiguate(wanted: String, taken: &HashSet<String>) -> String {
    if !taken.contains(&wanted) {
        return wanted;
    }
    (2..)
        .map(|n| format!("{wanted}{n}"))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or(wanted)
}
