use fancy_regex::Regex;
use tracing::warn;

/// Compiled regex rules, evaluated linearly.
///
/// Cost is O(patterns), so the group snapshot consults this sub-index last
/// and only when neither the string nor the wildcard set matched.
#[derive(Default)]
pub struct RegexSet {
    patterns: Vec<Regex>,
}

impl RegexSet {
    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    #[inline]
    pub fn matches(&self, name: &str) -> bool {
        self.patterns
            .iter()
            .any(|p| p.is_match(name).unwrap_or(false))
    }
}

#[derive(Default)]
pub struct RegexSetBuilder {
    patterns: Vec<Regex>,
}

impl RegexSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and keep one pattern. A pattern that fails to compile is
    /// reported and skipped; it never poisons the rest of the set.
    pub fn add(&mut self, pattern: &str) {
        match Regex::new(pattern) {
            Ok(regex) => self.patterns.push(regex),
            Err(e) => warn!(pattern = %pattern, error = %e, "Skipping uncompilable regex rule"),
        }
    }

    pub fn build(self) -> RegexSet {
        RegexSet {
            patterns: self.patterns,
        }
    }
}
