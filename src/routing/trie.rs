//! Segment trie holding every pattern that binds parameters.
//!
//! Nodes are built during registration and never mutated afterwards, so
//! concurrent lookups need no synchronisation.

use std::collections::HashMap;
use std::sync::Arc;

use crate::routing::pattern::Pattern;
use crate::routing::segment::SegmentKind;

/// A pattern ending at a node, with its cumulative score.
#[derive(Debug)]
pub(crate) struct Terminal {
    pub(crate) pattern: Arc<Pattern>,
    pub(crate) score: u32,
}

#[derive(Debug, Default)]
pub(crate) struct Node {
    /// Children keyed by literal segment.
    pub(crate) statics: HashMap<String, Node>,
    /// Dynamic children, one per parameter name, in registration order.
    pub(crate) dynamics: Vec<(String, Node)>,
    pub(crate) splat: Option<Box<Node>>,
    pub(crate) index: Option<Box<Node>>,
    pub(crate) terminal: Option<Terminal>,
}

impl Node {
    /// Insert a pattern below this node. Returns false when a pattern
    /// with the same shape already ended there.
    pub(crate) fn insert(&mut self, pattern: Arc<Pattern>) -> bool {
        let mut node = self;
        let mut score = 0;
        for segment in pattern.segments() {
            score += segment.kind.score();
            node = match segment.kind {
                SegmentKind::Static => node.statics.entry(segment.value.clone()).or_default(),
                SegmentKind::Dynamic => {
                    let name = segment.param_name().unwrap_or_default();
                    let pos = match node.dynamics.iter().position(|(n, _)| n == name) {
                        Some(pos) => pos,
                        None => {
                            node.dynamics.push((name.to_string(), Node::default()));
                            node.dynamics.len() - 1
                        }
                    };
                    &mut node.dynamics[pos].1
                }
                SegmentKind::Splat => node.splat.get_or_insert_with(Default::default),
                SegmentKind::Index => node.index.get_or_insert_with(Default::default),
            };
        }
        if node.terminal.is_some() {
            return false;
        }
        node.terminal = Some(Terminal { pattern, score });
        true
    }

    /// Terminal of the splat child, if any.
    pub(crate) fn splat_terminal(&self) -> Option<&Terminal> {
        self.splat.as_ref().and_then(|n| n.terminal.as_ref())
    }

    /// Terminal of the index child, if any.
    pub(crate) fn index_terminal(&self) -> Option<&Terminal> {
        self.index.as_ref().and_then(|n| n.terminal.as_ref())
    }
}
