use std::collections::BTreeSet;
use std::time::Instant;

use itertools::Itertools;
use tracing::debug;

use crate::error::RouteError;
use crate::model::features::FeatureCatalog;
use crate::model::request::{BestEffortMode, RouteRequest};
use crate::model::topology::{NodeIndex, Topology, TopologyView};

use super::filter::{resolve_capabilities, NodeFilter};
use super::reachability::has_path;
use super::SearchStats;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SearchBudget {
    pub max_subset_evaluations: Option<u64>,
}

impl SearchBudget {
    pub fn unbounded() -> Self {
        Self::default()
    }

    fn exhausted(&self, evaluated: u64) -> bool {
        self.max_subset_evaluations
            .is_some_and(|limit| evaluated >= limit)
    }
}

#[derive(Debug, Clone)]
pub struct BestEffortOutcome {
    pub view: TopologyView,
    /// Satisfied requirements in request order.
    pub satisfied: Vec<String>,
    pub stats: SearchStats,
}

pub fn resolve_endpoints(
    topology: &Topology,
    request: &RouteRequest,
) -> Result<(NodeIndex, NodeIndex), RouteError> {
    let src = topology
        .index_of(&request.source)
        .ok_or_else(|| RouteError::UnknownNode(request.source.clone()))?;
    let dst = topology
        .index_of(&request.destination)
        .ok_or_else(|| RouteError::UnknownNode(request.destination.clone()))?;
    if src == dst {
        return Err(RouteError::SameEndpoints(request.source.clone()));
    }
    Ok((src, dst))
}

fn dedup_preserving_order(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

/// Candidate subsets as index lists into the requirement list, largest first.
/// The empty subset is always last.
fn candidate_subsets(k: usize, mode: BestEffortMode) -> Box<dyn Iterator<Item = Vec<usize>>> {
    match mode {
        BestEffortMode::BiggestSubset => {
            Box::new((0..=k).rev().flat_map(move |size| (0..k).combinations(size)))
        }
        BestEffortMode::OrderedList => Box::new((0..=k).rev().map(|size| (0..size).collect())),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ConstraintFilterEngine<'a> {
    catalog: &'a FeatureCatalog,
    budget: SearchBudget,
}

impl<'a> ConstraintFilterEngine<'a> {
    pub fn new(catalog: &'a FeatureCatalog, budget: SearchBudget) -> Self {
        Self { catalog, budget }
    }

    pub fn strict_filter(&self, request: &RouteRequest) -> Result<NodeFilter, RouteError> {
        let required = resolve_capabilities(self.catalog, &request.requirements.strict)?;
        let excluded: BTreeSet<String> = request.geo.exclude.iter().cloned().collect();
        Ok(NodeFilter::new(required, excluded))
    }

    /// Drops every node lacking a strict capability or located in an excluded
    /// country, then checks that source and destination are still connected.
    pub fn apply_strict_filters(
        &self,
        view: &TopologyView,
        request: &RouteRequest,
    ) -> Result<TopologyView, RouteError> {
        let (src, dst) = resolve_endpoints(view.topology(), request)?;
        let filter = self.strict_filter(request)?;
        let pruned = filter.apply(view);

        debug!(
            retained = pruned.node_count(),
            dropped = view.node_count() - pruned.node_count(),
            "strict filters applied"
        );

        if !has_path(&pruned, src, dst) {
            return Err(RouteError::StrictInfeasible);
        }
        Ok(pruned)
    }

    /// Largest set of best-effort requirements that can be enforced on top of
    /// `strict_view` while source and destination stay connected.
    ///
    /// `biggest_subset` walks sizes from k down to 0 and, within a size, index
    /// combinations in lexicographic order; `ordered_list` tries prefixes of
    /// the priority list from longest to shortest. The first feasible
    /// candidate wins.
    pub fn maximize_satisfiable_subset(
        &self,
        strict_view: &TopologyView,
        request: &RouteRequest,
    ) -> Result<BestEffortOutcome, RouteError> {
        let started = Instant::now();
        let (src, dst) = resolve_endpoints(strict_view.topology(), request)?;
        let requirements = dedup_preserving_order(&request.requirements.best_effort);
        let positions = resolve_capabilities(self.catalog, &requirements)?;
        let k = requirements.len();

        let mut stats = SearchStats {
            requirement_count: k,
            ..SearchStats::default()
        };

        for subset in candidate_subsets(k, request.requirements.best_effort_mode) {
            if subset.is_empty() {
                break;
            }
            if self.budget.exhausted(stats.subsets_evaluated) {
                stats.truncated = true;
                break;
            }
            stats.subsets_evaluated += 1;

            let filter = NodeFilter::capabilities(subset.iter().map(|i| positions[*i]).collect());
            let view = filter.apply(strict_view);
            if has_path(&view, src, dst) {
                stats.elapsed = started.elapsed();
                let satisfied: Vec<String> =
                    subset.iter().map(|i| requirements[*i].clone()).collect();
                debug!(
                    satisfied = satisfied.len(),
                    of = k,
                    evaluated = stats.subsets_evaluated,
                    "best-effort subset found"
                );
                return Ok(BestEffortOutcome {
                    view,
                    satisfied,
                    stats,
                });
            }
        }

        stats.subsets_evaluated += 1;
        if !has_path(strict_view, src, dst) {
            return Err(RouteError::InternalInconsistency(
                "empty best-effort subset infeasible on strict-feasible topology".to_string(),
            ));
        }
        stats.elapsed = started.elapsed();
        debug!(
            of = k,
            evaluated = stats.subsets_evaluated,
            truncated = stats.truncated,
            "no best-effort requirement enforceable"
        );
        Ok(BestEffortOutcome {
            view: strict_view.clone(),
            satisfied: Vec::new(),
            stats,
        })
    }
}
