use crate::error::RouteError;
use crate::model::request::{MultipathSpec, Optimization};
use crate::model::topology::{NodeIndex, TopologyView};

use super::disjoint::edge_disjoint_paths;
use super::scoring::PathScorer;
use super::{CostModel, ScoredPath};

/// Disjoint candidates sorted ascending by score; equal scores keep
/// discovery order.
#[derive(Debug, Clone)]
pub struct RankedPaths {
    pub cost_model: CostModel,
    pub ranked: Vec<ScoredPath>,
    /// First path in discovery order, before ranking.
    pub default_path: ScoredPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MultipathShortfall {
    pub available: usize,
    pub minimum: usize,
}

#[derive(Debug, Clone)]
pub struct MultipathSelection {
    pub ranked: RankedPaths,
    pub selected_count: usize,
    pub shortfall: Option<MultipathShortfall>,
}

impl MultipathSelection {
    pub fn selected(&self) -> &[ScoredPath] {
        &self.ranked.ranked[..self.selected_count]
    }

    pub fn candidate_count(&self) -> usize {
        self.ranked.ranked.len()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct MultipathSelector<'a> {
    scorer: PathScorer<'a>,
}

impl<'a> MultipathSelector<'a> {
    pub fn new(scorer: PathScorer<'a>) -> Self {
        Self { scorer }
    }

    /// Discovers edge-disjoint paths (capped at `target_count` unless it is
    /// zero) and ranks them under the cost model implied by `optimization`.
    pub fn rank_candidates(
        &self,
        view: &TopologyView,
        src: NodeIndex,
        dst: NodeIndex,
        optimization: Optimization,
        target_count: usize,
    ) -> Result<RankedPaths, RouteError> {
        let cost_model = CostModel::from(optimization);
        let cap = (target_count > 0).then_some(target_count);
        let discovered = edge_disjoint_paths(view, src, dst, cap);

        let mut scored: Vec<ScoredPath> = discovered
            .into_iter()
            .map(|path| self.scorer.scored(path, cost_model))
            .collect();
        let Some(default_path) = scored.first().cloned() else {
            return Err(RouteError::NoDisjointPath);
        };
        scored.sort_by(|a, b| a.score.total_cmp(&b.score));

        Ok(RankedPaths {
            cost_model,
            ranked: scored,
            default_path,
        })
    }

    pub fn select(&self, ranked: RankedPaths, multipath: MultipathSpec) -> MultipathSelection {
        let available = ranked.ranked.len();
        let selected_count = match multipath.target_count {
            0 => available,
            target => target.min(available),
        };
        let shortfall = (available < multipath.minimum_count).then_some(MultipathShortfall {
            available,
            minimum: multipath.minimum_count,
        });
        MultipathSelection {
            ranked,
            selected_count,
            shortfall,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::topology::{Node, Topology};
    use crate::route_compute::disjoint::assert_pairwise_edge_disjoint;

    use super::*;

    /// S-X-T (2 hops) and S-P-Q-R-T (4 hops). The long branch uses the lower
    /// indices so discovery finds it first.
    fn two_branches() -> Arc<Topology> {
        let nodes = vec![
            Node::new("S", 0.0, 0.0),
            Node::new("P", 1.0, 0.0),
            Node::new("Q", 2.0, 0.0),
            Node::new("R", 3.0, 0.0),
            Node::new("T", 4.0, 0.0),
            Node::new("X", 2.0, 0.5),
        ];
        let edges = [("S", "P"), ("P", "Q"), ("Q", "R"), ("R", "T"), ("S", "X"), ("X", "T")]
            .iter()
            .map(|(u, v)| (u.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        Arc::new(Topology::build(nodes, edges).expect("fixture builds"))
    }

    #[test]
    fn ranks_shorter_path_first() {
        let topo = two_branches();
        let selector = MultipathSelector::new(PathScorer::new(&topo));
        let ranked = selector
            .rank_candidates(&topo.full_view(), 0, 4, Optimization::None, 2)
            .expect("two paths exist");
        let selection = selector.select(
            ranked,
            MultipathSpec {
                target_count: 2,
                minimum_count: 1,
            },
        );

        let selected = selection.selected();
        assert_eq!(selected.len(), 2);
        assert_eq!(selected[0].nodes, vec![0, 5, 4]);
        assert_eq!(selected[0].score, 2.0);
        assert_eq!(selected[1].nodes, vec![0, 1, 2, 3, 4]);
        assert_eq!(selected[1].score, 4.0);
        assert_eq!(selection.ranked.default_path.nodes, vec![0, 1, 2, 3, 4]);
        assert!(selection.shortfall.is_none());

        let paths: Vec<Vec<usize>> = selected.iter().map(|p| p.nodes.clone()).collect();
        assert_pairwise_edge_disjoint(&paths);
    }

    #[test]
    fn target_zero_takes_every_path() {
        let topo = two_branches();
        let selector = MultipathSelector::new(PathScorer::new(&topo));
        let ranked = selector
            .rank_candidates(&topo.full_view(), 0, 4, Optimization::MinimizeTotalLatency, 0)
            .expect("paths exist");
        assert_eq!(ranked.cost_model, CostModel::GeodesicLatency);
        let selection = selector.select(
            ranked,
            MultipathSpec {
                target_count: 0,
                minimum_count: 1,
            },
        );
        assert_eq!(selection.selected_count, 2);
        assert!(selection.selected()[0].score <= selection.selected()[1].score);
    }

    #[test]
    fn shortfall_is_flagged_not_fatal() {
        let topo = two_branches();
        let selector = MultipathSelector::new(PathScorer::new(&topo));
        let ranked = selector
            .rank_candidates(&topo.full_view(), 0, 4, Optimization::MinimizeNumberOfHops, 5)
            .expect("paths exist");
        let selection = selector.select(
            ranked,
            MultipathSpec {
                target_count: 5,
                minimum_count: 3,
            },
        );
        assert_eq!(selection.selected_count, 2);
        assert_eq!(
            selection.shortfall,
            Some(MultipathShortfall {
                available: 2,
                minimum: 3
            })
        );
    }

    #[test]
    fn missing_path_is_no_disjoint_path() {
        let topo = two_branches();
        let view = topo
            .full_view()
            .subgraph_excluding(|n| n.id == "X" || n.id == "Q");
        let selector = MultipathSelector::new(PathScorer::new(&topo));
        let err = selector
            .rank_candidates(&view, 0, 4, Optimization::None, 1)
            .expect_err("no path");
        assert_eq!(err, RouteError::NoDisjointPath);
    }
}
