//! Publish policy: which operation names a handler type may publish.
//!
//! Publication is opt-out by shape. A name is auto-published only when it
//! matches the policy's pattern and sits outside its exclusion set; the
//! exclusion set also guards explicit registration, so lifecycle names can
//! never be made remotely callable by accident.
//!
//! Policies are plain values owned by one registry at a time. A handler
//! type declares its policy once ([`Handler::policy`]) and the registry
//! reads it at construction; there is no global or mutable shared state,
//! so two handler types never interfere through their policies.
//!
//! [`Handler::policy`]: crate::Handler::policy

use std::collections::HashSet;

use regex::Regex;

/// Names the registry infrastructure reserves for itself. Never
/// published, even when requested explicitly.
pub const RESERVED_NAMES: &[&str] = &["shutdown", "register", "resolve", "factory"];

/// Wrapper layers followed by default when resolving a connection
/// reference.
pub const DEFAULT_UNWRAP_HOPS: usize = 2;

lazy_static::lazy_static! {
    /// Default publish pattern: lowercase-leading ASCII word names of at
    /// least two characters. The class is spelled out rather than `\w`,
    /// which is Unicode-aware; published names stay ASCII.
    static ref STANDARD_PATTERN: Regex =
        Regex::new(r"^[a-z][0-9A-Za-z_]+$").expect("hardcoded pattern is valid");

    /// A pattern no name can match.
    static ref DENY_ALL_PATTERN: Regex =
        Regex::new(r"a^").expect("hardcoded pattern is valid");
}

/// Immutable per-type publish configuration.
///
/// Built once through the `with_*` methods, then only read. The pattern
/// gates auto-publication of the declared set; the exclusion set gates
/// every registration path.
#[derive(Debug, Clone)]
pub struct PublishPolicy {
    /// Names must match to be auto-published.
    pattern: Regex,
    /// Names never published, regardless of the pattern.
    exclusions: HashSet<&'static str>,
    /// Wrapper layers to follow when resolving the connection reference.
    unwrap_hops: usize,
}

impl PublishPolicy {
    /// The standard policy: lowercase-leading names, the
    /// [`RESERVED_NAMES`] exclusions, [`DEFAULT_UNWRAP_HOPS`] hops.
    pub fn standard() -> Self {
        Self {
            pattern: STANDARD_PATTERN.clone(),
            exclusions: RESERVED_NAMES.iter().copied().collect(),
            unwrap_hops: DEFAULT_UNWRAP_HOPS,
        }
    }

    /// A policy whose pattern matches no name at all.
    ///
    /// The declared set then publishes nothing; explicit registration
    /// still works, since only auto-publication consults the pattern.
    pub fn deny_all() -> Self {
        Self {
            pattern: DENY_ALL_PATTERN.clone(),
            ..Self::standard()
        }
    }

    /// Replace the publish pattern.
    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = pattern;
        self
    }

    /// Add a name to the exclusion set.
    pub fn exclude(mut self, name: &'static str) -> Self {
        self.exclusions.insert(name);
        self
    }

    /// Set how many wrapper layers to follow when resolving the
    /// connection reference.
    pub fn with_unwrap_hops(mut self, hops: usize) -> Self {
        self.unwrap_hops = hops;
        self
    }

    /// Whether the pattern allows auto-publishing `name`.
    #[inline]
    pub fn allows(&self, name: &str) -> bool {
        self.pattern.is_match(name)
    }

    /// Whether `name` sits in the exclusion set.
    #[inline]
    pub fn is_reserved(&self, name: &str) -> bool {
        self.exclusions.contains(name)
    }

    /// Wrapper-layer budget for connection resolution.
    #[inline]
    pub fn unwrap_hops(&self) -> usize {
        self.unwrap_hops
    }
}

impl Default for PublishPolicy {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_pattern_accepts_plain_names() {
        let policy = PublishPolicy::standard();
        assert!(policy.allows("fetch"));
        assert!(policy.allows("fetch2"));
        assert!(policy.allows("sub_total"));
        assert!(policy.allows("ab"));
    }

    #[test]
    fn test_standard_pattern_rejects_leading_underscore_and_case() {
        let policy = PublishPolicy::standard();
        assert!(!policy.allows("_hidden"));
        assert!(!policy.allows("Fetch"));
        assert!(!policy.allows("2fast"));
    }

    #[test]
    fn test_standard_pattern_rejects_short_and_odd_names() {
        let policy = PublishPolicy::standard();
        // Single-character names do not match: the pattern wants a
        // lowercase lead plus at least one more word character.
        assert!(!policy.allows("f"));
        assert!(!policy.allows(""));
        assert!(!policy.allows("fetch-all"));
        assert!(!policy.allows("fetch all"));
    }

    #[test]
    fn test_standard_pattern_rejects_non_ascii() {
        let policy = PublishPolicy::standard();
        // `\w` would accept these; the spelled-out ASCII class does not.
        assert!(!policy.allows("café"));
        assert!(!policy.allows("naïve"));
    }

    #[test]
    fn test_reserved_names() {
        let policy = PublishPolicy::standard();
        for name in RESERVED_NAMES {
            assert!(policy.is_reserved(name), "{name} should be reserved");
        }
        assert!(!policy.is_reserved("fetch"));
    }

    #[test]
    fn test_reserved_even_when_pattern_allows() {
        // "shutdown" has publishable shape; only the exclusion set
        // keeps it out.
        let policy = PublishPolicy::standard();
        assert!(policy.allows("shutdown"));
        assert!(policy.is_reserved("shutdown"));
    }

    #[test]
    fn test_deny_all_rejects_everything() {
        let policy = PublishPolicy::deny_all();
        assert!(!policy.allows("fetch"));
        assert!(!policy.allows("a"));
        assert!(!policy.allows(""));
    }

    #[test]
    fn test_exclude_builder_extends_the_set() {
        let policy = PublishPolicy::standard().exclude("fetch");
        assert!(policy.is_reserved("fetch"));
        assert!(policy.is_reserved("shutdown"));
    }

    #[test]
    fn test_custom_pattern() {
        let pattern = Regex::new(r"^rpc_\w+$").unwrap();
        let policy = PublishPolicy::standard().with_pattern(pattern);
        assert!(policy.allows("rpc_fetch"));
        assert!(!policy.allows("fetch"));
    }

    #[test]
    fn test_unwrap_hops_builder() {
        assert_eq!(PublishPolicy::standard().unwrap_hops(), DEFAULT_UNWRAP_HOPS);
        let policy = PublishPolicy::standard().with_unwrap_hops(5);
        assert_eq!(policy.unwrap_hops(), 5);
    }
}
