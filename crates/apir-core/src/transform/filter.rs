use std::fmt;
use std::sync::Arc;

use regex::Regex;

/// A rule restricting which raw catalog names are selected.
#[derive(Clone)]
pub enum FilterRule {
    Pattern(Regex),
    Substring(String),
    Predicate(Arc<dyn Fn(&str) -> bool + Send + Sync>),
}

impl FilterRule {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(FilterRule::Pattern)
    }

    pub fn substring(needle: impl Into<String>) -> Self {
        FilterRule::Substring(needle.into())
    }

    pub fn predicate(f: impl Fn(&str) -> bool + Send + Sync + 'static) -> Self {
        FilterRule::Predicate(Arc::new(f))
    }

    pub fn matches(&self, name: &str) -> bool {
        match self {
            FilterRule::Pattern(re) => re.is_match(name),
            FilterRule::Substring(needle) => name.contains(needle.as_str()),
            FilterRule::Predicate(f) => f(name),
        }
    }
}

impl fmt::Debug for FilterRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterRule::Pattern(re) => f.debug_tuple("Pattern").field(&re.as_str()).finish(),
            FilterRule::Substring(s) => f.debug_tuple("Substring").field(s).finish(),
            FilterRule::Predicate(_) => f.write_str("Predicate(..)"),
        }
    }
}

/// Included when there are no include rules or any include rule matches,
/// and no exclude rule matches.
pub fn is_selected(name: &str, include: &[FilterRule], exclude: &[FilterRule]) -> bool {
    let included = include.is_empty() || include.iter().any(|r| r.matches(name));
    included && !exclude.iter().any(|r| r.matches(name))
}
