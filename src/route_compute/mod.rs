mod constraints;
mod disjoint;
mod filter;
mod multipath;
mod reachability;
mod scoring;
mod types;

pub use constraints::{
    resolve_endpoints, BestEffortOutcome, ConstraintFilterEngine, SearchBudget,
};
pub use disjoint::edge_disjoint_paths;
pub use filter::{resolve_capabilities, NodeFilter};
pub use multipath::{
    MultipathSelection, MultipathSelector, MultipathShortfall, RankedPaths,
};
pub use reachability::{has_path, shortest_path};
pub use scoring::{great_circle_miles, hop_latency_ms, round_to, PathScorer, EARTH_RADIUS_MILES};
pub use types::{CostModel, ScoredPath, SearchStats};
