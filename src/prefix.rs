//! Prefix rewrite rules
//!
//! A [`PrefixMap`] translates identifiers from an external namespace into
//! internal ones. The identity rule always comes first.

use serde::Deserialize;

/// A single `(external, internal)` rewrite rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct PrefixRule {
    /// Prefix the incoming identifier must start with
    pub external: String,
    /// Replacement prefix
    pub internal: String,
}

impl PrefixRule {
    /// Create a rule
    pub fn new(external: impl Into<String>, internal: impl Into<String>) -> Self {
        Self {
            external: external.into(),
            internal: internal.into(),
        }
    }

    /// Rewrite `id` if it starts with the external prefix
    #[inline]
    pub fn apply(&self, id: &str) -> Option<String> {
        id.strip_prefix(self.external.as_str())
            .map(|rest| format!("{}{}", self.internal, rest))
    }

    /// Reverse rewrite: internal prefix back to the external one
    #[inline]
    pub fn restore(&self, id: &str) -> Option<String> {
        id.strip_prefix(self.internal.as_str())
            .map(|rest| format!("{}{}", self.external, rest))
    }

    fn is_identity(&self) -> bool {
        self.external.is_empty() && self.internal.is_empty()
    }
}

/// Ordered list of prefix rules.
///
/// # Examples
///
/// ```rust
/// use autowire_di::PrefixMap;
///
/// let map = PrefixMap::new().with_rule("", "auto_wire.");
/// assert_eq!(
///     map.rewrite("fixture_classes.simple"),
///     vec!["fixture_classes.simple", "auto_wire.fixture_classes.simple"]
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrefixMap {
    rules: Vec<PrefixRule>,
}

impl PrefixMap {
    /// Create a map holding only the identity rule
    pub fn new() -> Self {
        Self {
            rules: vec![PrefixRule::new("", "")],
        }
    }

    /// Add a rule and continue the chain
    pub fn with_rule(mut self, external: impl Into<String>, internal: impl Into<String>) -> Self {
        self.push(PrefixRule::new(external, internal));
        self
    }

    /// Append a rule. Extra identity rules are ignored.
    pub fn push(&mut self, rule: PrefixRule) {
        if rule.is_identity() || self.rules.contains(&rule) {
            return;
        }
        self.rules.push(rule);
    }

    /// All rules in the order they are tried
    pub fn rules(&self) -> &[PrefixRule] {
        &self.rules
    }

    /// Candidate identifiers for `id`, in rule order, without duplicates
    pub fn rewrite(&self, id: &str) -> Vec<String> {
        let mut candidates: Vec<String> = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            if let Some(candidate) = rule.apply(id) {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }

    /// Identifiers that may already be stored for `id`: forward rewrites
    /// followed by reverse rewrites, without duplicates
    pub fn lookup_candidates(&self, id: &str) -> Vec<String> {
        let mut candidates = self.rewrite(id);
        for rule in &self.rules {
            if let Some(candidate) = rule.restore(id) {
                if !candidates.contains(&candidate) {
                    candidates.push(candidate);
                }
            }
        }
        candidates
    }
}

impl Default for PrefixMap {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Into<String>, I: Into<String>> FromIterator<(E, I)> for PrefixMap {
    fn from_iter<T: IntoIterator<Item = (E, I)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (external, internal) in iter {
            map.push(PrefixRule::new(external, internal));
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_always_first() {
        let map = PrefixMap::new();
        assert_eq!(map.rules().len(), 1);
        assert_eq!(map.rewrite("a.b"), vec!["a.b"]);
    }

    #[test]
    fn test_rules_in_insertion_order() {
        let map = PrefixMap::new()
            .with_rule("app.", "internal.")
            .with_rule("app.", "legacy.")
            .with_rule("other.", "x.");

        assert_eq!(
            map.rewrite("app.mailer"),
            vec!["app.mailer", "internal.mailer", "legacy.mailer"]
        );
        assert_eq!(map.rewrite("other.y"), vec!["other.y", "x.y"]);
    }

    #[test]
    fn test_duplicates_removed() {
        let map = PrefixMap::new().with_rule("a.", "a.").with_rule("", "");
        assert_eq!(map.rules().len(), 2);
        assert_eq!(map.rewrite("a.b"), vec!["a.b"]);
    }

    #[test]
    fn test_lookup_candidates_include_reverse() {
        let map = PrefixMap::new().with_rule("", "auto_wire.");

        assert_eq!(
            map.lookup_candidates("auto_wire.fixture.value"),
            vec![
                "auto_wire.fixture.value",
                "auto_wire.auto_wire.fixture.value",
                "fixture.value",
            ]
        );
        assert_eq!(map.lookup_candidates("plain"), vec!["plain", "auto_wire.plain"]);
    }

    #[test]
    fn test_from_iter() {
        let map: PrefixMap = [("", "auto_wire.")].into_iter().collect();
        assert_eq!(map.rules()[0], PrefixRule::new("", ""));
        assert_eq!(map.rules()[1], PrefixRule::new("", "auto_wire."));
    }
}
