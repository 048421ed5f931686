//! Single best-match resolution.
//!
//! Lookup order:
//! 1. exact hit in the static table (a static pattern always outscores a
//!    same-length pattern with parameters, so nothing else is tried)
//! 2. the path's index route in the static table
//! 3. depth-first trie walk keeping the highest-scoring terminal
//!
//! Ties keep the first candidate discovered. The walk visits the static
//! child, then dynamic children in registration order, then the splat.

use crate::routing::matcher::Matcher;
use crate::routing::route_match::{Match, Params};
use crate::routing::segment::{join_segments, parse_path};
use crate::routing::trie::{Node, Terminal};

impl Matcher {
    /// Return the highest-scoring match for `path`, if any.
    pub fn find_best_match(&self, path: &str) -> Option<Match> {
        let segments = parse_path(path);
        let key = join_segments(&segments);

        if let Some(pattern) = self.static_patterns.get(&key) {
            return Some(Match::exact(pattern));
        }
        if let Some(pattern) = self.static_patterns.get(&self.index_key(&key)) {
            return Some(Match::exact(pattern));
        }

        let mut search = BestSearch {
            segments: &segments,
            params: Params::new(),
            best: None,
        };
        search.visit(&self.root, 0);
        search.best
    }
}

struct BestSearch<'a> {
    segments: &'a [&'a str],
    /// Bound while descending, unbound on backtrack.
    params: Params,
    best: Option<Match>,
}

impl BestSearch<'_> {
    fn visit(&mut self, node: &Node, depth: usize) {
        if depth == self.segments.len() {
            if let Some(terminal) = &node.terminal {
                self.consider(terminal, None);
            }
            if let Some(terminal) = node.index_terminal() {
                self.consider(terminal, None);
            }
            if let Some(terminal) = node.splat_terminal() {
                self.consider(terminal, Some(Vec::new()));
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
            let rest = self.segments[depth..].iter().map(|s| s.to_string()).collect();
            self.consider(terminal, Some(rest));
        }
    }

    fn consider(&mut self, terminal: &Terminal, splat_values: Option<Vec<String>>) {
        if self.best.as_ref().is_some_and(|b| terminal.score <= b.score) {
            return;
        }
        self.best = Some(Match {
            pattern: terminal.pattern.clone(),
            // cloned here so the recorded match never aliases the walk state
            params: self.params.clone(),
            splat_values,
            score: terminal.score,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::segment::MatcherOptions;

    fn matcher(patterns: &[&str]) -> Matcher {
        let mut m = Matcher::default();
        for p in patterns {
            m.register(p);
        }
        m
    }

    fn dollar_matcher(patterns: &[&str]) -> Matcher {
        let mut m = Matcher::new(MatcherOptions {
            splat: '$',
            ..Default::default()
        });
        for p in patterns {
            m.register(p);
        }
        m
    }

    #[test]
    fn test_users_scenario() {
        let m = matcher(&["/", "/users", "/users/:id"]);
        let found = m.find_best_match("/users/42").unwrap();
        assert_eq!(found.pattern.source(), "/users/:id");
        assert_eq!(found.param("id"), Some("42"));
        assert_eq!(found.splat_values, None);

        let root = m.find_best_match("/").unwrap();
        assert_eq!(root.pattern.source(), "/");
        let root = m.find_best_match("").unwrap();
        assert_eq!(root.pattern.source(), "/");
    }

    #[test]
    fn test_static_patterns_match_themselves() {
        let patterns = ["/", "/a", "/a/b", "/a/b/c", "/about/team"];
        let m = matcher(&patterns);
        for p in patterns {
            let found = m.find_best_match(p).unwrap();
            assert_eq!(found.pattern.source(), p);
            assert!(found.params.is_empty());
            assert!(found.splat_values.is_none());
        }
    }

    #[test]
    fn test_static_beats_dynamic() {
        let m = matcher(&["/users/:id", "/users/me", "/:a/:b"]);
        assert_eq!(m.find_best_match("/users/me").unwrap().pattern.source(), "/users/me");
        assert_eq!(m.find_best_match("/users/7").unwrap().pattern.source(), "/users/:id");
        assert_eq!(m.find_best_match("/teams/7").unwrap().pattern.source(), "/:a/:b");
    }

    #[test]
    fn test_splat_capture() {
        let m = dollar_matcher(&["/files", "/files/$"]);
        let found = m.find_best_match("/files/a/b/c").unwrap();
        assert_eq!(found.pattern.source(), "/files/$");
        assert_eq!(
            found.splat_values,
            Some(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(m.find_best_match("/files").unwrap().pattern.source(), "/files");
    }

    #[test]
    fn test_splat_with_empty_remainder() {
        let m = matcher(&["/files/*"]);
        let found = m.find_best_match("/files").unwrap();
        assert_eq!(found.splat_values, Some(vec![]));
    }

    #[test]
    fn test_dynamic_outscores_splat() {
        let m = matcher(&["/docs/*", "/docs/:page"]);
        let found = m.find_best_match("/docs/intro").unwrap();
        assert_eq!(found.pattern.source(), "/docs/:page");
        let found = m.find_best_match("/docs/intro/setup").unwrap();
        assert_eq!(found.pattern.source(), "/docs/*");
    }

    #[test]
    fn test_root_catch_all() {
        let m = matcher(&["/*", "/health"]);
        let found = m.find_best_match("/nope/at/all").unwrap();
        assert!(found.pattern.is_lone_splat());
        assert_eq!(found.splat_values.unwrap().len(), 3);
        assert_eq!(m.find_best_match("/health").unwrap().pattern.source(), "/health");
    }

    #[test]
    fn test_tie_keeps_first_registered() {
        let m = matcher(&["/:first", "/:second"]);
        let found = m.find_best_match("/x").unwrap();
        assert_eq!(found.pattern.source(), "/:first");
        assert_eq!(found.param("first"), Some("x"));
        assert_eq!(found.param("second"), None);
    }

    #[test]
    fn test_params_do_not_leak_between_branches() {
        let m = matcher(&["/:a/x", "/:b/y"]);
        let found = m.find_best_match("/v/y").unwrap();
        assert_eq!(found.pattern.source(), "/:b/y");
        assert_eq!(found.params.len(), 1);
        assert_eq!(found.param("b"), Some("v"));
    }

    #[test]
    fn test_index_routes() {
        let m = matcher(&["/blog/_index", "/users/:id/_index"]);
        assert_eq!(m.find_best_match("/blog").unwrap().pattern.source(), "/blog/_index");
        let found = m.find_best_match("/users/3").unwrap();
        assert_eq!(found.pattern.source(), "/users/:id/_index");
        assert_eq!(found.param("id"), Some("3"));
    }

    #[test]
    fn test_no_match() {
        let m = matcher(&["/users/:id"]);
        assert!(m.find_best_match("/users").is_none());
        assert!(m.find_best_match("/users/1/2").is_none());
        assert!(Matcher::default().find_best_match("/").is_none());
    }

    #[test]
    fn test_reregistration_does_not_change_results() {
        let once = matcher(&["/a/:b", "/a/*"]);
        let twice = matcher(&["/a/:b", "/a/*", "/a/:b", "/a/*"]);
        for path in ["/a/1", "/a/1/2", "/a"] {
            assert_eq!(once.find_best_match(path), twice.find_best_match(path));
        }
    }
}
