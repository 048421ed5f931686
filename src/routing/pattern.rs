//! Registered route patterns.

use std::fmt;

use thiserror::Error;

use crate::routing::segment::{join_segments, parse_path, MatcherOptions, Segment, SegmentKind};

/// Errors raised when a pattern cannot be registered.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatternError {
    /// A dynamic segment carries no parameter name (e.g. a lone `:`).
    #[error("pattern {pattern:?}: dynamic segment has an empty parameter name")]
    EmptyParamName { pattern: String },

    /// A splat segment is followed by more segments.
    #[error("pattern {pattern:?}: splat segment must be the last segment")]
    SplatNotLast { pattern: String },

    /// An index segment is followed by more segments.
    #[error("pattern {pattern:?}: index segment must be the last segment")]
    IndexNotLast { pattern: String },

    /// The same parameter name is bound twice.
    #[error("pattern {pattern:?}: parameter {name:?} is bound more than once")]
    DuplicateParam { pattern: String, name: String },
}

/// A parsed, immutable route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    source: String,
    normalized: String,
    segments: Vec<Segment>,
    score: u32,
}

impl Pattern {
    /// Parse and validate a pattern string.
    pub fn parse(source: &str, options: &MatcherOptions) -> Result<Self, PatternError> {
        let raw: Vec<&str> = parse_path(source)
            .into_iter()
            .filter(|s| !options.is_excluded(s))
            .collect();

        let mut segments = Vec::with_capacity(raw.len());
        let mut names: Vec<&str> = Vec::new();
        for (i, value) in raw.iter().enumerate() {
            let kind = options.classify(value);
            let is_last = i + 1 == raw.len();
            match kind {
                SegmentKind::Splat if !is_last => {
                    return Err(PatternError::SplatNotLast { pattern: source.to_string() });
                }
                SegmentKind::Index if !is_last => {
                    return Err(PatternError::IndexNotLast { pattern: source.to_string() });
                }
                SegmentKind::Dynamic => {
                    let name = &value[options.dynamic_prefix.len_utf8()..];
                    if name.is_empty() {
                        return Err(PatternError::EmptyParamName { pattern: source.to_string() });
                    }
                    if names.contains(&name) {
                        return Err(PatternError::DuplicateParam {
                            pattern: source.to_string(),
                            name: name.to_string(),
                        });
                    }
                    names.push(name);
                }
                _ => {}
            }
            segments.push(Segment { value: value.to_string(), kind });
        }

        let score = segments.iter().map(|s| s.kind.score()).sum();
        Ok(Self {
            source: source.to_string(),
            normalized: join_segments(&raw),
            segments,
            score,
        })
    }

    /// The pattern exactly as registered.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Normalised `/a/b` form, used as the registration key.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Number of segments, index segment included.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// Sum of per-segment scores.
    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn last_kind(&self) -> Option<SegmentKind> {
        self.segments.last().map(|s| s.kind)
    }

    /// True when no segment is Dynamic or Splat.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s.kind, SegmentKind::Static | SegmentKind::Index))
    }

    /// True for the root catch-all (`/*`).
    pub fn is_lone_splat(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].kind == SegmentKind::Splat
    }

    pub fn ends_in_splat(&self) -> bool {
        self.last_kind() == Some(SegmentKind::Splat)
    }

    pub fn ends_in_index(&self) -> bool {
        self.last_kind() == Some(SegmentKind::Index)
    }

    /// Names of the parameters this pattern binds, in order.
    pub fn param_names(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(Segment::param_name)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Pattern, PatternError> {
        Pattern::parse(s, &MatcherOptions::default())
    }

    #[test]
    fn test_parse_flags() {
        let p = parse("/files/*").unwrap();
        assert!(p.ends_in_splat());
        assert!(!p.is_lone_splat());
        assert!(!p.is_static());
        assert_eq!(p.score(), 4);

        let p = parse("/*").unwrap();
        assert!(p.is_lone_splat());

        let p = parse("/users/_index").unwrap();
        assert!(p.ends_in_index());
        assert!(p.is_static());
        assert_eq!(p.depth(), 2);
    }

    #[test]
    fn test_normalized_form() {
        assert_eq!(parse("users//:id/").unwrap().normalized(), "/users/:id");
        assert_eq!(parse("/").unwrap().normalized(), "/");
        assert_eq!(parse("").unwrap().normalized(), "/");
    }

    #[test]
    fn test_scores() {
        assert_eq!(parse("/a/b/c").unwrap().score(), 9);
        assert_eq!(parse("/a/:b/c").unwrap().score(), 8);
        assert_eq!(parse("/a/:b/*").unwrap().score(), 6);
    }

    #[test]
    fn test_invalid_patterns() {
        assert!(matches!(parse("/a/:"), Err(PatternError::EmptyParamName { .. })));
        assert!(matches!(parse("/*/a"), Err(PatternError::SplatNotLast { .. })));
        assert!(matches!(parse("/_index/a"), Err(PatternError::IndexNotLast { .. })));
        assert!(matches!(
            parse("/:id/x/:id"),
            Err(PatternError::DuplicateParam { name, .. }) if name == "id"
        ));
    }

    #[test]
    fn test_excluded_segments_are_dropped() {
        let opts = MatcherOptions::default().exclude_prefix("__");
        let p = Pattern::parse("/__auth/account/:id", &opts).unwrap();
        assert_eq!(p.normalized(), "/account/:id");
        assert_eq!(p.source(), "/__auth/account/:id");
    }

    #[test]
    fn test_param_names() {
        let p = parse("/orgs/:org/repos/:repo").unwrap();
        assert_eq!(p.param_names().collect::<Vec<_>>(), vec!["org", "repo"]);
    }
}
