//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup):
//!     pattern strings
//!     → segment.rs (split + classify segments)
//!     → pattern.rs (validate, score)
//!     → matcher.rs (static table | trie.rs)
//!     → Freeze as immutable Matcher
//!
//! Incoming Request (path)
//!     → best_match.rs   → single highest-scoring Match (API handlers)
//!     → nested.rs       → ancestor-to-leaf Matches (layouts + loaders)
//!     → Return: Match(es) or None
//! ```
//!
//! # Design Decisions
//! - Patterns compiled at startup, immutable at runtime
//! - O(1) exact lookup for fully static patterns
//! - Scores: static 3, dynamic 2, splat 1 per segment; a fully static
//!   pattern always beats a same-length pattern with parameters
//! - Explicit `None` rather than a silent default route

pub mod best_match;
pub mod matcher;
pub mod nested;
pub mod pattern;
pub mod route_match;
pub mod segment;
mod trie;

pub use matcher::Matcher;
pub use nested::NestedMatches;
pub use pattern::{Pattern, PatternError};
pub use route_match::{Match, MatchSummary, Params};
pub use segment::{parse_path, MatcherOptions, Segment, SegmentFilter, SegmentKind};
