//! Branch name matching.
//!
//! Two primitives, both case-sensitive and pure:
//! - [`GlobList`]: anchored globs where `*` matches any run of characters and
//!   every other character is literal.
//! - [`PrefixList`]: plain string prefixes, no wildcard expansion.

use regex::Regex;

/// Compiled list of `*` glob patterns.
#[derive(Debug, Clone, Default)]
pub struct GlobList {
    patterns: Vec<(String, Regex)>,
}

impl GlobList {
    /// Compile `patterns`. Errors carry the offending pattern.
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self, (String, regex::Error)> {
        let patterns = patterns
            .iter()
            .map(|pattern| {
                let pattern = pattern.as_ref();
                glob_to_regex(pattern)
                    .map(|regex| (pattern.to_string(), regex))
                    .map_err(|e| (pattern.to_string(), e))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// True when any pattern matches the whole of `candidate`.
    pub fn matches(&self, candidate: &str) -> bool {
        self.patterns.iter().any(|(_, regex)| regex.is_match(candidate))
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn patterns(&self) -> impl Iterator<Item = &str> {
        self.patterns.iter().map(|(pattern, _)| pattern.as_str())
    }
}

/// Escape every literal character, then turn the escaped `*` markers back
/// into `.*` and anchor both ends.
fn glob_to_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let escaped = regex::escape(pattern).replace("\\*", ".*");
    Regex::new(&format!("^{escaped}$"))
}

/// One-shot form of [`GlobList::matches`]. Empty `patterns` never match.
pub fn glob_contains<S: AsRef<str>>(patterns: &[S], candidate: &str) -> bool {
    patterns.iter().any(|pattern| {
        glob_to_regex(pattern.as_ref())
            .map(|regex| regex.is_match(candidate))
            .unwrap_or(false)
    })
}

/// Ordered list of literal prefixes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrefixList {
    prefixes: Vec<String>,
}

impl PrefixList {
    pub fn new(prefixes: Vec<String>) -> Self {
        Self { prefixes }
    }

    pub fn matches(&self, candidate: &str) -> bool {
        starts_with_any(&self.prefixes, candidate)
    }

    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty()
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }
}

/// True when `candidate` starts with any of `prefixes`. Empty list never matches.
pub fn starts_with_any<S: AsRef<str>>(prefixes: &[S], candidate: &str) -> bool {
    prefixes
        .iter()
        .any(|prefix| candidate.starts_with(prefix.as_ref()))
}
