//! Nested (layout-style) match resolution.
//!
//! Returns every pattern that contributes to rendering a path: each
//! ancestor layout plus the deepest leaf, ordered from the root down.
//!
//! # Disambiguation
//! 1. Splat and index candidates shallower than the deepest candidate
//!    are dropped.
//! 2. When several kinds share the deepest level: index loses to any other
//!    kind; with the path exactly as deep, dynamic beats splat; with the
//!    path deeper, splat beats dynamic.
//! 3. A chain whose deepest match stops short of the end of the path, and
//!    is not a splat, is rejected. The root catch-all replaces it when
//!    registered; otherwise the path is unmatched.
//! 4. The root layout `/` heads every chain that survives.
//!
//! Paths rules 1 and 2 do not decide fall back to keeping every candidate.

use std::collections::{HashMap, HashSet};

use crate::routing::matcher::Matcher;
use crate::routing::route_match::{Match, Params};
use crate::routing::segment::{parse_path, SegmentKind};
use crate::routing::trie::{Node, Terminal};

/// Ordered chain of matches for one path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NestedMatches {
    /// Ancestor-to-leaf matches.
    pub matches: Vec<Match>,
    /// Longest splat capture among `matches`.
    pub splat_values: Option<Vec<String>>,
}

impl NestedMatches {
    /// The deepest match.
    pub fn leaf(&self) -> Option<&Match> {
        self.matches.last()
    }
}

type Candidates = HashMap<String, Match>;

impl Matcher {
    /// Return the ancestor-to-leaf chain of matches for `path`, if any.
    pub fn find_nested_matches(&self, path: &str) -> Option<NestedMatches> {
        let segments = parse_path(path);
        let mut candidates = Candidates::new();

        if segments.is_empty() {
            self.record_static(&mut candidates, "/");
            self.record_static(&mut candidates, &self.index_key("/"));
            return finish(candidates);
        }

        let mut prefix = String::with_capacity(path.len() + 1);
        let mut found_full_static = false;
        for (i, segment) in segments.iter().enumerate() {
            prefix.push('/');
            prefix.push_str(segment);
            let is_last = i + 1 == segments.len();
            if self.record_static(&mut candidates, &prefix) && is_last {
                found_full_static = true;
            }
            if is_last {
                self.record_static(&mut candidates, &self.index_key(&prefix));
            }
        }

        if !found_full_static {
            let mut search = NestedSearch {
                segments: &segments,
                params: Params::new(),
                candidates: &mut candidates,
            };
            search.visit(&self.root, 0);
        }

        if candidates.len() > 1 {
            disambiguate(&mut candidates, segments.len());
        }
        if !reaches_end(&candidates, segments.len()) {
            candidates.clear();
            let root_splat = self.options.root_splat_key();
            match self.dynamic_patterns.get(&root_splat) {
                Some(pattern) => {
                    candidates.insert(
                        root_splat,
                        Match {
                            pattern: pattern.clone(),
                            params: Params::new(),
                            splat_values: Some(segments.iter().map(|s| s.to_string()).collect()),
                            score: pattern.score(),
                        },
                    );
                }
                None => return None,
            }
        }

        self.record_static(&mut candidates, "/");
        finish(candidates)
    }

    fn record_static(&self, candidates: &mut Candidates, key: &str) -> bool {
        match self.static_patterns.get(key) {
            Some(pattern) => {
                candidates.insert(key.to_string(), Match::exact(pattern));
                true
            }
            None => false,
        }
    }
}

struct NestedSearch<'a> {
    segments: &'a [&'a str],
    params: Params,
    candidates: &'a mut Candidates,
}

impl NestedSearch<'_> {
    fn visit(&mut self, node: &Node, depth: usize) {
        if let Some(terminal) = &node.terminal {
            self.record(terminal, None);
        }

        if depth == self.segments.len() {
            if let Some(terminal) = node.index_terminal() {
                self.record(terminal, None);
            }
            if let Some(terminal) = node.splat_terminal() {
                if !terminal.pattern.is_lone_splat() {
                    self.record(terminal, Some(Vec::new()));
                }
            }
            return;
        }

        let segment = self.segments[depth];
        if let Some(child) = node.statics.get(segment) {
            self.visit(child, depth + 1);
        }
        for (name, child) in &node.dynamics {
            self.params.insert(name.clone(), segment.to_string());
            self.visit(child, depth + 1);
            self.params.remove(name);
        }
        if let Some(terminal) = node.splat_terminal() {
            // the root catch-all only stands in for a chain that falls short
            if !terminal.pattern.is_lone_splat() {
                let rest = self.segments[depth..].iter().map(|s| s.to_string()).collect();
                self.record(terminal, Some(rest));
            }
        }
    }

    fn record(&mut self, terminal: &Terminal, splat_values: Option<Vec<String>>) {
        self.candidates.insert(
            terminal.pattern.normalized().to_string(),
            Match {
                pattern: terminal.pattern.clone(),
                params: self.params.clone(),
                splat_values,
                score: terminal.score,
            },
        );
    }
}

fn disambiguate(candidates: &mut Candidates, path_len: usize) {
    let max_depth = candidates
        .values()
        .map(|m| m.pattern.depth())
        .max()
        .unwrap_or(0);

    candidates.retain(|_, m| {
        m.pattern.depth() == max_depth
            || !(m.pattern.ends_in_splat() || m.pattern.ends_in_index())
    });

    let deepest_kinds: HashSet<SegmentKind> = candidates
        .values()
        .filter(|m| m.pattern.depth() == max_depth)
        .filter_map(|m| m.pattern.last_kind())
        .collect();
    if deepest_kinds.len() < 2 {
        return;
    }

    let has_dynamic = deepest_kinds.contains(&SegmentKind::Dynamic);
    let has_splat = deepest_kinds.contains(&SegmentKind::Splat);
    let mut dropped = vec![SegmentKind::Index];
    if has_dynamic && has_splat {
        if path_len == max_depth {
            dropped.push(SegmentKind::Splat);
        } else if path_len > max_depth {
            dropped.push(SegmentKind::Dynamic);
        }
    }

    candidates.retain(|_, m| {
        m.pattern.depth() != max_depth
            || !m.pattern.last_kind().is_some_and(|k| dropped.contains(&k))
    });
}

/// True when some candidate consumes every segment of the path.
fn reaches_end(candidates: &Candidates, path_len: usize) -> bool {
    candidates.values().any(|m| {
        let pattern = &m.pattern;
        pattern.ends_in_splat() || pattern.depth() - usize::from(pattern.ends_in_index()) == path_len
    })
}

fn finish(candidates: Candidates) -> Option<NestedMatches> {
    if candidates.is_empty() {
        return None;
    }
    let mut matches: Vec<Match> = candidates.into_values().collect();
    matches.sort_by(|a, b| {
        a.pattern
            .depth()
            .cmp(&b.pattern.depth())
            .then_with(|| a.pattern.ends_in_index().cmp(&b.pattern.ends_in_index()))
            .then_with(|| a.pattern.normalized().cmp(b.pattern.normalized()))
    });

    let splat_values = matches
        .iter()
        .filter_map(|m| m.splat_values.as_ref())
        .max_by_key(|values| values.len())
        .cloned();

    Some(NestedMatches {
        matches,
        splat_values,
    })
}
