//! Match values produced by the resolvers.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::routing::pattern::Pattern;

/// Parameter name to captured segment.
pub type Params = BTreeMap<String, String>;

/// A resolved pattern for a concrete path.
///
/// `splat_values` is `Some` exactly when the pattern ends in a splat; an
/// empty capture (`Some(vec![])`) is distinct from no splat at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub pattern: Arc<Pattern>,
    pub params: Params,
    pub splat_values: Option<Vec<String>>,
    pub score: u32,
}

impl Match {
    /// A match of a static pattern: no params, no splat.
    pub(crate) fn exact(pattern: &Arc<Pattern>) -> Self {
        Self {
            pattern: pattern.clone(),
            params: Params::new(),
            splat_values: None,
            score: pattern.score(),
        }
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

/// Serializable view of a match, used in HTTP responses.
#[derive(Debug, Clone, Serialize)]
pub struct MatchSummary {
    pub pattern: String,
    pub params: Params,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub splat_values: Option<Vec<String>>,
}

impl From<&Match> for MatchSummary {
    fn from(m: &Match) -> Self {
        Self {
            pattern: m.pattern.source().to_string(),
            params: m.params.clone(),
            splat_values: m.splat_values.clone(),
        }
    }
}
