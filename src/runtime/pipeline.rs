use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use crate::error::{RouteError, TopologyError};
use crate::model::features::FeatureCatalog;
use crate::model::request::RouteRequest;
use crate::model::result::{
    Baselines, Comparison, PhaseTimings, PipelinePhase, ResultPath, RouteResult, RouteStatus,
    SearchSummary,
};
use crate::model::topology::{NodeIndex, NodeRecord, Topology, TopologyView};
use crate::route_compute::{
    edge_disjoint_paths, resolve_endpoints, shortest_path, ConstraintFilterEngine, CostModel,
    MultipathSelector, PathScorer, ScoredPath, SearchBudget,
};

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub catalog: FeatureCatalog,
    pub budget: SearchBudget,
    pub compute_baselines: bool,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            catalog: FeatureCatalog::default(),
            budget: SearchBudget::unbounded(),
            compute_baselines: true,
        }
    }
}

/// Runs route requests against one shared, never-mutated topology. Safe to
/// call from many threads at once.
#[derive(Debug, Clone)]
pub struct RouteRequestPipeline {
    topology: Arc<Topology>,
    full: TopologyView,
    settings: PipelineSettings,
}

impl RouteRequestPipeline {
    pub fn new(topology: Arc<Topology>, settings: PipelineSettings) -> Self {
        let full = topology.full_view();
        Self {
            topology,
            full,
            settings,
        }
    }

    pub fn from_records(
        records: &[NodeRecord],
        settings: PipelineSettings,
    ) -> Result<Self, TopologyError> {
        let topology = Arc::new(Topology::from_records(records)?);
        Ok(Self::new(topology, settings))
    }

    pub fn topology(&self) -> &Arc<Topology> {
        &self.topology
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Always yields exactly one result; failures become its status.
    pub fn evaluate(&self, index: usize, request: &RouteRequest) -> RouteResult {
        let mut evaluation = Evaluation::start(self, index, request);
        let status = match evaluation.run(request) {
            Ok(status) => status,
            Err(err) => {
                warn!(index, "route request failed: {err}");
                RouteStatus::failure(&err)
            }
        };
        evaluation.finish(request, status)
    }

    fn result_path(&self, scored: &ScoredPath) -> ResultPath {
        ResultPath {
            nodes: self.topology.ids_of(&scored.nodes),
            hop_count: scored.hop_count(),
            latency_ms: scored.latency_ms,
        }
    }

    fn baselines(&self, src: NodeIndex, dst: NodeIndex) -> Baselines {
        let scorer = PathScorer::new(&self.topology);
        let shortest = shortest_path(&self.full, src, dst)
            .map(|nodes| self.result_path(&scorer.scored(nodes, CostModel::HopCount)));
        let fastest = edge_disjoint_paths(&self.full, src, dst, None)
            .into_iter()
            .map(|path| scorer.scored(path, CostModel::GeodesicLatency))
            .min_by(|a, b| a.score.total_cmp(&b.score))
            .map(|scored| self.result_path(&scored));
        Baselines { shortest, fastest }
    }

    fn reference_path(&self, ids: &[String]) -> Option<ResultPath> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(idx) = self.topology.index_of(id) else {
                warn!("reference path names unknown node {id}; skipping comparison");
                return None;
            };
            nodes.push(idx);
        }
        let scorer = PathScorer::new(&self.topology);
        Some(self.result_path(&scorer.scored(nodes, CostModel::HopCount)))
    }
}

struct Evaluation<'p> {
    pipeline: &'p RouteRequestPipeline,
    started: Instant,
    endpoints: Option<(NodeIndex, NodeIndex)>,
    result: RouteResult,
}

impl<'p> Evaluation<'p> {
    fn start(pipeline: &'p RouteRequestPipeline, index: usize, request: &RouteRequest) -> Self {
        info!(
            index,
            source = %request.source,
            destination = %request.destination,
            "evaluating route request"
        );
        Self {
            pipeline,
            started: Instant::now(),
            endpoints: None,
            result: RouteResult {
                index,
                source: request.source.clone(),
                destination: request.destination.clone(),
                status: RouteStatus::Success,
                paths: Vec::new(),
                selected_count: 0,
                satisfied_best_effort: Vec::new(),
                search: SearchSummary::default(),
                timings: PhaseTimings {
                    graph_build: pipeline.topology.build_elapsed(),
                    ..PhaseTimings::default()
                },
                baselines: Baselines::default(),
                comparison: Comparison::default(),
                phases: Vec::new(),
            },
        }
    }

    fn enter(&mut self, phase: PipelinePhase) {
        debug!(index = self.result.index, ?phase, "pipeline transition");
        self.result.phases.push(phase);
    }

    fn run(&mut self, request: &RouteRequest) -> Result<RouteStatus, RouteError> {
        let pipeline = self.pipeline;
        self.enter(PipelinePhase::Init);
        let (src, dst) = resolve_endpoints(&pipeline.topology, request)?;
        self.endpoints = Some((src, dst));

        let engine = ConstraintFilterEngine::new(&pipeline.settings.catalog, pipeline.settings.budget);

        self.enter(PipelinePhase::StrictFiltering);
        let phase_started = Instant::now();
        let strict = engine.apply_strict_filters(&pipeline.full, request);
        self.result.timings.strict = phase_started.elapsed();
        let strict_view = match strict {
            Ok(view) => view,
            Err(RouteError::StrictInfeasible) => {
                self.enter(PipelinePhase::Infeasible);
                if request.fallback_on_failure {
                    info!(
                        index = self.result.index,
                        "strict constraints unsatisfiable; handing over to fallback routing"
                    );
                    return Ok(RouteStatus::SuccessViaFallback);
                }
                return Err(RouteError::StrictInfeasible);
            }
            Err(err) => return Err(err),
        };

        self.enter(PipelinePhase::BestEffortSearch);
        let phase_started = Instant::now();
        let outcome = engine.maximize_satisfiable_subset(&strict_view, request);
        self.result.timings.best_effort = phase_started.elapsed();
        let outcome = outcome?;
        self.result.satisfied_best_effort = outcome.satisfied;
        self.result.search = SearchSummary {
            requirement_count: outcome.stats.requirement_count,
            subsets_evaluated: outcome.stats.subsets_evaluated,
            elapsed: outcome.stats.elapsed,
            truncated: outcome.stats.truncated,
        };
        if outcome.stats.truncated {
            warn!(
                index = self.result.index,
                evaluated = outcome.stats.subsets_evaluated,
                "best-effort search budget exhausted"
            );
        }

        self.enter(PipelinePhase::Scoring);
        let phase_started = Instant::now();
        let selector = MultipathSelector::new(PathScorer::new(&pipeline.topology));
        let ranked = selector.rank_candidates(
            &outcome.view,
            src,
            dst,
            request.optimization,
            request.multipath.target_count,
        );
        let ranked = match ranked {
            Ok(ranked) => ranked,
            Err(err) => {
                self.result.timings.scoring = phase_started.elapsed();
                return Err(err);
            }
        };

        self.enter(PipelinePhase::MultipathSelection);
        let selection = selector.select(ranked, request.multipath);
        self.result.timings.scoring = phase_started.elapsed();

        self.result.paths = selection
            .ranked
            .ranked
            .iter()
            .map(|scored| pipeline.result_path(scored))
            .collect();
        self.result.selected_count = selection.selected_count;
        self.result.comparison.default_path =
            Some(pipeline.result_path(&selection.ranked.default_path));

        self.enter(PipelinePhase::Done);
        Ok(match selection.shortfall {
            Some(shortfall) => RouteStatus::Degraded {
                available: shortfall.available,
                minimum: shortfall.minimum,
            },
            None => RouteStatus::Success,
        })
    }

    fn finish(mut self, request: &RouteRequest, status: RouteStatus) -> RouteResult {
        self.result.status = status;
        self.result.timings.total = self.started.elapsed();

        if let Some((src, dst)) = self.endpoints {
            if self.pipeline.settings.compute_baselines {
                self.result.baselines = self.pipeline.baselines(src, dst);
            }
        }
        if let Some(ids) = request.reference_path.as_deref() {
            self.result.comparison.reference = self.pipeline.reference_path(ids);
        }

        info!(
            index = self.result.index,
            status = %self.result.status,
            candidates = self.result.candidate_count(),
            selected = self.result.selected_count,
            "route request finished"
        );
        self.result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::model::request::{BestEffortMode, Optimization};
    use crate::model::topology::fixtures::line;
    use crate::model::topology::{Node, Topology};

    use super::*;

    fn pipeline(topology: Arc<Topology>) -> RouteRequestPipeline {
        RouteRequestPipeline::new(topology, PipelineSettings::default())
    }

    fn ids(path: &ResultPath) -> Vec<&str> {
        path.nodes.iter().map(String::as_str).collect()
    }

    #[test]
    fn line_graph_without_constraints() {
        let pipeline = pipeline(line());
        let request = RouteRequest::new("A", "D")
            .with_optimization(Optimization::MinimizeNumberOfHops)
            .with_multipath(1, 1);

        let result = pipeline.evaluate(0, &request);
        assert_eq!(result.status, RouteStatus::Success);
        assert_eq!(result.selected().len(), 1);
        assert_eq!(ids(&result.selected()[0]), vec!["A", "B", "C", "D"]);
        assert_eq!(result.selected()[0].hop_count, 3);
        assert_eq!(
            result.phases,
            vec![
                PipelinePhase::Init,
                PipelinePhase::StrictFiltering,
                PipelinePhase::BestEffortSearch,
                PipelinePhase::Scoring,
                PipelinePhase::MultipathSelection,
                PipelinePhase::Done,
            ]
        );
        let shortest = result.baselines.shortest.as_ref().expect("baseline exists");
        assert_eq!(ids(shortest), vec!["A", "B", "C", "D"]);
        assert!(result.baselines.fastest.is_some());
    }

    #[test]
    fn strict_failure_without_fallback() {
        let pipeline = pipeline(line());
        let request = RouteRequest::new("A", "D").with_strict(&["0"]);

        let result = pipeline.evaluate(0, &request);
        assert_eq!(result.status.to_string(), "failure:strict unsatisfiable");
        assert!(result.paths.is_empty());
        assert_eq!(
            result.phases,
            vec![
                PipelinePhase::Init,
                PipelinePhase::StrictFiltering,
                PipelinePhase::Infeasible,
            ]
        );
    }

    #[test]
    fn strict_failure_with_fallback() {
        let pipeline = pipeline(line());
        let request = RouteRequest::new("A", "D")
            .with_strict(&["0"])
            .with_fallback(true);

        let result = pipeline.evaluate(0, &request);
        assert_eq!(result.status, RouteStatus::SuccessViaFallback);
        assert!(result.paths.is_empty());
        assert!(result.selected().is_empty());
    }

    fn two_branches() -> Arc<Topology> {
        let nodes = vec![
            Node::new("S", 0.0, 0.0).with_features(&[true]),
            Node::new("P", 1.0, 0.0).with_features(&[true]),
            Node::new("Q", 2.0, 0.0).with_features(&[true]),
            Node::new("R", 3.0, 0.0).with_features(&[true]),
            Node::new("T", 4.0, 0.0).with_features(&[true]),
            Node::new("X", 2.0, 0.5).with_features(&[false]),
        ];
        let edges = [("S", "P"), ("P", "Q"), ("Q", "R"), ("R", "T"), ("S", "X"), ("X", "T")]
            .iter()
            .map(|(u, v)| (u.to_string(), v.to_string()))
            .collect::<Vec<_>>();
        Arc::new(Topology::build(nodes, edges).expect("fixture builds"))
    }

    #[test]
    fn two_disjoint_paths_ordered_shorter_first() {
        let pipeline = pipeline(two_branches());
        let request = RouteRequest::new("S", "T")
            .with_optimization(Optimization::None)
            .with_multipath(2, 1);

        let result = pipeline.evaluate(3, &request);
        assert_eq!(result.index, 3);
        assert_eq!(result.status, RouteStatus::Success);
        let selected = result.selected();
        assert_eq!(selected.len(), 2);
        assert_eq!(ids(&selected[0]), vec!["S", "X", "T"]);
        assert_eq!(ids(&selected[1]), vec!["S", "P", "Q", "R", "T"]);
        let default_path = result.comparison.default_path.as_ref().expect("default path");
        assert_eq!(default_path.hop_count, 4);
    }

    #[test]
    fn best_effort_narrows_paths_and_shortfall_degrades() {
        let pipeline = pipeline(two_branches());
        let request = RouteRequest::new("S", "T")
            .with_best_effort(&["0"], BestEffortMode::BiggestSubset)
            .with_multipath(2, 2);

        let result = pipeline.evaluate(0, &request);
        assert_eq!(result.satisfied_best_effort, vec!["0".to_string()]);
        assert_eq!(result.search.subsets_evaluated, 1);
        assert_eq!(
            result.status,
            RouteStatus::Degraded {
                available: 1,
                minimum: 2
            }
        );
        assert_eq!(ids(&result.selected()[0]), vec!["S", "P", "Q", "R", "T"]);
        // Baselines ignore the request's constraints.
        let shortest = result.baselines.shortest.as_ref().expect("baseline");
        assert_eq!(ids(shortest), vec!["S", "X", "T"]);
    }

    #[test]
    fn repeated_evaluation_is_deterministic() {
        let pipeline = pipeline(two_branches());
        let request = RouteRequest::new("S", "T")
            .with_best_effort(&["0"], BestEffortMode::OrderedList)
            .with_optimization(Optimization::MinimizeTotalLatency)
            .with_multipath(0, 1);

        let first = pipeline.evaluate(0, &request);
        let second = pipeline.evaluate(0, &request);
        assert_eq!(first.paths, second.paths);
        assert_eq!(first.selected_count, second.selected_count);
        assert_eq!(first.satisfied_best_effort, second.satisfied_best_effort);
        assert_eq!(first.status, second.status);
    }

    #[test]
    fn unknown_node_is_a_failure_record() {
        let pipeline = pipeline(line());
        let result = pipeline.evaluate(0, &RouteRequest::new("A", "Z"));
        assert_eq!(result.status.to_string(), "failure:unknown node Z");
        assert_eq!(result.phases, vec![PipelinePhase::Init]);
        assert_eq!(result.baselines, Baselines::default());
    }

    #[test]
    fn reference_path_is_measured() {
        let pipeline = pipeline(line());
        let mut request = RouteRequest::new("A", "D");
        request.reference_path = Some(vec!["A".into(), "B".into(), "C".into(), "D".into()]);
        let result = pipeline.evaluate(0, &request);
        let reference = result.comparison.reference.as_ref().expect("reference scored");
        assert_eq!(reference.hop_count, 3);
        assert!(reference.latency_ms > 0.0);
    }

    #[test]
    fn requests_run_concurrently_on_shared_topology() {
        let pipeline = Arc::new(pipeline(two_branches()));
        let handles: Vec<_> = (0..4)
            .map(|idx| {
                let pipeline = Arc::clone(&pipeline);
                std::thread::spawn(move || {
                    let request = RouteRequest::new("S", "T").with_multipath(0, 1);
                    pipeline.evaluate(idx, &request)
                })
            })
            .collect();
        for handle in handles {
            let result = handle.join().expect("worker should not panic");
            assert_eq!(result.selected_count, 2);
        }
    }
}
