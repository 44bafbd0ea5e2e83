use std::time::Duration;

use serde::Serialize;

use crate::model::request::Optimization;
use crate::model::topology::NodeIndex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CostModel {
    HopCount,
    GeodesicLatency,
}

impl From<Optimization> for CostModel {
    fn from(optimization: Optimization) -> Self {
        match optimization {
            Optimization::MinimizeTotalLatency => CostModel::GeodesicLatency,
            Optimization::MinimizeNumberOfHops | Optimization::None => CostModel::HopCount,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPath {
    pub nodes: Vec<NodeIndex>,
    pub score: f64,
    pub latency_ms: f64,
}

impl ScoredPath {
    pub fn hop_count(&self) -> usize {
        self.nodes.len().saturating_sub(1)
    }
}

/// What the best-effort search did, surfaced for benchmarking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchStats {
    pub requirement_count: usize,
    pub subsets_evaluated: u64,
    pub elapsed: Duration,
    /// The evaluation budget ran out and the empty subset was taken.
    pub truncated: bool,
}
