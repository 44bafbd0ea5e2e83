use std::fmt;
use std::time::Duration;

use serde::{Serialize, Serializer};

use crate::error::RouteError;

pub(crate) fn serialize_secs<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_f64(value.as_secs_f64())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelinePhase {
    Init,
    StrictFiltering,
    BestEffortSearch,
    Scoring,
    MultipathSelection,
    Done,
    Infeasible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteStatus {
    Success,
    /// Fewer disjoint paths than the requested minimum; paths still returned.
    Degraded { available: usize, minimum: usize },
    /// Constrained routing failed and the request asked to hand over to
    /// default inter-domain routing.
    SuccessViaFallback,
    Failure(String),
}

impl RouteStatus {
    pub fn failure(err: &RouteError) -> Self {
        match err {
            RouteError::StrictInfeasible => RouteStatus::Failure("strict unsatisfiable".to_string()),
            other => RouteStatus::Failure(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        !matches!(self, RouteStatus::Failure(_))
    }
}

impl fmt::Display for RouteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteStatus::Success => write!(f, "success"),
            RouteStatus::Degraded { available, minimum } => {
                write!(f, "degraded:multipath {available}/{minimum}")
            }
            RouteStatus::SuccessViaFallback => write!(f, "success-via-fallback"),
            RouteStatus::Failure(reason) => write!(f, "failure:{reason}"),
        }
    }
}

impl Serialize for RouteStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultPath {
    pub nodes: Vec<String>,
    pub hop_count: usize,
    pub latency_ms: f64,
}

impl ResultPath {
    pub fn rounded_latency_ms(&self) -> i64 {
        self.latency_ms.round() as i64
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PhaseTimings {
    #[serde(serialize_with = "serialize_secs")]
    pub graph_build: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub strict: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub best_effort: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub scoring: Duration,
    #[serde(serialize_with = "serialize_secs")]
    pub total: Duration,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SearchSummary {
    pub requirement_count: usize,
    pub subsets_evaluated: u64,
    #[serde(serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub truncated: bool,
}

/// Unconstrained paths over the full topology, kept for cost-of-control
/// comparisons.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Baselines {
    pub shortest: Option<ResultPath>,
    pub fastest: Option<ResultPath>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Comparison {
    pub reference: Option<ResultPath>,
    pub default_path: Option<ResultPath>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RouteResult {
    pub index: usize,
    pub source: String,
    pub destination: String,
    pub status: RouteStatus,
    /// All ranked candidates; the first `selected_count` form the multipath set.
    pub paths: Vec<ResultPath>,
    pub selected_count: usize,
    pub satisfied_best_effort: Vec<String>,
    pub search: SearchSummary,
    pub timings: PhaseTimings,
    pub baselines: Baselines,
    pub comparison: Comparison,
    pub phases: Vec<PipelinePhase>,
}

impl RouteResult {
    pub fn selected(&self) -> &[ResultPath] {
        &self.paths[..self.selected_count.min(self.paths.len())]
    }

    pub fn candidate_count(&self) -> usize {
        self.paths.len()
    }
}
