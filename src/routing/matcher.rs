//! Pattern registration.
//!
//! # Responsibilities
//! - Parse and validate patterns at build time
//! - Index fully static patterns in an exact-match table
//! - Index dynamic and splat patterns in the segment trie
//!
//! # Design Decisions
//! - Registration takes `&mut self`; lookups take `&self`. Once the
//!   matcher is shared it can no longer change
//! - Patterns are keyed by their normalised text, so registering the same
//!   pattern twice is a no-op
//! - Invalid patterns abort the build (`register`) or are reported to the
//!   caller (`try_register`); they never surface at request time

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::pattern::{Pattern, PatternError};
use crate::routing::segment::MatcherOptions;
use crate::routing::trie::Node;

/// Registry of route patterns with best-match and nested-match lookups.
#[derive(Debug, Default)]
pub struct Matcher {
    pub(crate) options: MatcherOptions,
    pub(crate) static_patterns: HashMap<String, Arc<Pattern>>,
    pub(crate) dynamic_patterns: HashMap<String, Arc<Pattern>>,
    pub(crate) root: Node,
}

impl Matcher {
    pub fn new(options: MatcherOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    pub fn options(&self) -> &MatcherOptions {
        &self.options
    }

    /// Register a pattern, panicking if it is invalid.
    ///
    /// Meant for route tables built at startup, where a bad pattern is a
    /// programming error.
    pub fn register(&mut self, pattern: &str) -> Arc<Pattern> {
        match self.try_register(pattern) {
            Ok(p) => p,
            Err(e) => panic!("invalid route pattern: {e}"),
        }
    }

    /// Register a pattern, returning the shared parsed form.
    pub fn try_register(&mut self, pattern: &str) -> Result<Arc<Pattern>, PatternError> {
        let parsed = Pattern::parse(pattern, &self.options)?;
        let key = parsed.normalized().to_string();

        if let Some(existing) = self
            .static_patterns
            .get(&key)
            .or_else(|| self.dynamic_patterns.get(&key))
        {
            tracing::debug!(pattern = %pattern, existing = %existing, "Pattern already registered");
            return Ok(existing.clone());
        }

        let parsed = Arc::new(parsed);
        if parsed.is_static() {
            self.static_patterns.insert(key, parsed.clone());
        } else {
            let inserted = self.root.insert(parsed.clone());
            debug_assert!(inserted, "trie and pattern table out of sync");
            self.dynamic_patterns.insert(key, parsed.clone());
        }

        tracing::debug!(
            pattern = %pattern,
            normalized = %parsed.normalized(),
            is_static = parsed.is_static(),
            score = parsed.score(),
            "Pattern registered"
        );
        Ok(parsed)
    }

    /// All registered patterns, static ones first.
    pub fn patterns(&self) -> impl Iterator<Item = &Arc<Pattern>> {
        self.static_patterns.values().chain(self.dynamic_patterns.values())
    }

    pub fn len(&self) -> usize {
        self.static_patterns.len() + self.dynamic_patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index-route key for a normalised path: `/a` -> `/a/_index`.
    pub(crate) fn index_key(&self, normalized: &str) -> String {
        if normalized == "/" {
            format!("/{}", self.options.index_segment)
        } else {
            format!("{}/{}", normalized, self.options.index_segment)
        }
    }
}
