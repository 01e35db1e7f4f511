//! routing: from scored digest items to candidate page updates.
//!
//! Deterministic entity matching goes first; only unmatched, sufficiently relevant items
//! are handed to the routing oracle. Both results merge into one update list.

pub mod matcher;
pub mod merge;
pub mod router;

pub use matcher::{match_entities, EntityMatches};
pub use merge::{merge_routing, MergedRouting, STANDARD_TIER_MIN_SCORE};
pub use router::{
    parse_router_response, prefilter_candidates, route_candidates, LlmRouter, RoutedNewPage,
    RoutedSkip, RoutedUpdate, RouterDecision, RoutingOracle, DEFAULT_ROUTER_MIN_SCORE,
};
