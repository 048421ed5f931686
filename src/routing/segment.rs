//! Path segmentation and segment classification.
//!
//! # Responsibilities
//! - Split request paths and patterns on `/`
//! - Classify pattern segments as Static, Dynamic, Splat or Index
//! - Carry the configurable markers used for classification
//!
//! # Design Decisions
//! - Empty segments are dropped, so `""`, `"/"` and `"//"` are equivalent
//! - Classification happens once, at registration
//! - Excluded segments are organisational only and never reach the trie

use std::fmt;
use std::sync::Arc;

/// Predicate deciding whether a pattern segment is skipped at registration.
pub type SegmentFilter = Arc<dyn Fn(&str) -> bool + Send + Sync>;

/// Segment weight used by the best-match resolver.
pub const STATIC_SCORE: u32 = 3;
pub const DYNAMIC_SCORE: u32 = 2;
pub const SPLAT_SCORE: u32 = 1;
pub const INDEX_SCORE: u32 = 0;

/// The kind of a pattern segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SegmentKind {
    /// Matches only its literal text.
    Static,
    /// Matches any single segment and binds it to a parameter.
    Dynamic,
    /// Matches all remaining segments.
    Splat,
    /// Marks the default child of the parent pattern.
    Index,
}

impl SegmentKind {
    /// Score contributed by one segment of this kind.
    pub fn score(self) -> u32 {
        match self {
            SegmentKind::Static => STATIC_SCORE,
            SegmentKind::Dynamic => DYNAMIC_SCORE,
            SegmentKind::Splat => SPLAT_SCORE,
            SegmentKind::Index => INDEX_SCORE,
        }
    }
}

/// One classified pattern segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// The segment text as written in the pattern (markers included).
    pub value: String,
    pub kind: SegmentKind,
}

impl Segment {
    /// Parameter name of a dynamic segment, without its prefix marker.
    pub fn param_name(&self) -> Option<&str> {
        match self.kind {
            SegmentKind::Dynamic => {
                let mut chars = self.value.chars();
                chars.next();
                Some(chars.as_str())
            }
            _ => None,
        }
    }
}

/// Markers and filters used when classifying pattern segments.
#[derive(Clone)]
pub struct MatcherOptions {
    /// Literal segment marking an index route (default `_index`).
    pub index_segment: String,
    /// Prefix marking a dynamic segment (default `:`).
    pub dynamic_prefix: char,
    /// Lone character marking a splat segment (default `*`).
    pub splat: char,
    /// Segments for which this returns true are dropped from patterns.
    pub exclude: Option<SegmentFilter>,
}

impl Default for MatcherOptions {
    fn default() -> Self {
        Self {
            index_segment: "_index".to_string(),
            dynamic_prefix: ':',
            splat: '*',
            exclude: None,
        }
    }
}

impl fmt::Debug for MatcherOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MatcherOptions")
            .field("index_segment", &self.index_segment)
            .field("dynamic_prefix", &self.dynamic_prefix)
            .field("splat", &self.splat)
            .field("exclude", &self.exclude.is_some())
            .finish()
    }
}

impl MatcherOptions {
    /// Skip every pattern segment starting with `prefix`.
    pub fn exclude_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.exclude = Some(Arc::new(move |segment: &str| segment.starts_with(&prefix)));
        self
    }

    /// Classify a single non-empty segment.
    pub fn classify(&self, segment: &str) -> SegmentKind {
        if segment == self.index_segment {
            return SegmentKind::Index;
        }
        let mut chars = segment.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if c == self.splat => SegmentKind::Splat,
            (Some(c), _) if c == self.dynamic_prefix => SegmentKind::Dynamic,
            _ => SegmentKind::Static,
        }
    }

    pub(crate) fn is_excluded(&self, segment: &str) -> bool {
        self.exclude.as_ref().is_some_and(|filter| filter(segment))
    }

    /// Path of the root catch-all pattern, e.g. `/*`.
    pub(crate) fn root_splat_key(&self) -> String {
        format!("/{}", self.splat)
    }
}

/// Split a path on `/`, dropping empty segments.
pub fn parse_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

/// Join segments back into the normalised `/a/b` form (`/` when empty).
pub fn join_segments<S: AsRef<str>>(segments: &[S]) -> String {
    if segments.is_empty() {
        return "/".to_string();
    }
    let mut out = String::new();
    for segment in segments {
        out.push('/');
        out.push_str(segment.as_ref());
    }
    out
}
