use std::collections::BTreeSet;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use proute::model::request::{BestEffortMode, Optimization, RouteRequest};
use proute::model::topology::{Node, Topology};
use proute::runtime::loader::load_topology_records;
use proute::runtime::pipeline::{PipelineSettings, RouteRequestPipeline};
use serde_json::{json, Value};
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "route_select_bench")]
#[command(about = "Measure best-effort subset search cost as the requirement count grows")]
struct Args {
    #[arg(long, default_value_t = 200)]
    nodes: usize,
    #[arg(long, default_value_t = 0.03)]
    density: f64,
    #[arg(long, default_value_t = 8)]
    features: usize,
    /// Feature availability per node.
    #[arg(long, default_value_t = 0.7)]
    feature_ratio: f64,
    #[arg(long, default_value_t = 6)]
    max_requirements: usize,
    #[arg(long, default_value_t = 3)]
    seeds: usize,
    #[arg(long, default_value_t = 1)]
    start_seed: u64,
    /// Requests per seed and requirement count.
    #[arg(long, default_value_t = 10)]
    requests: usize,
    #[arg(long, default_value_t = 3)]
    target_paths: usize,
    #[arg(long, value_enum, default_value_t = ModeArg::BiggestSubset)]
    mode: ModeArg,
    /// Benchmark a topology dump instead of synthetic graphs.
    #[arg(long)]
    topology: Option<PathBuf>,
    #[arg(long)]
    output_json: Option<PathBuf>,
    #[arg(long, default_value = "WARN")]
    log_level: String,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    BiggestSubset,
    OrderedList,
}

impl From<ModeArg> for BestEffortMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::BiggestSubset => BestEffortMode::BiggestSubset,
            ModeArg::OrderedList => BestEffortMode::OrderedList,
        }
    }
}

#[derive(Debug, Clone)]
struct LcgRng {
    state: u64,
}

impl LcgRng {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(1);
        self.state
    }

    fn next_f64(&mut self) -> f64 {
        let raw = self.next_u64() >> 11;
        (raw as f64) / ((1_u64 << 53) as f64)
    }

    fn range_f64(&mut self, low: f64, high: f64) -> f64 {
        low + (high - low) * self.next_f64()
    }

    fn below(&mut self, bound: usize) -> usize {
        (self.next_u64() >> 33) as usize % bound.max(1)
    }
}

/// Ring plus random chords, nodes scattered over a Europe-sized box.
fn generate_topology(seed: u64, args: &Args) -> Result<Arc<Topology>> {
    let mut rng = LcgRng::new(seed);
    let count = args.nodes.max(2);
    let ratio = args.feature_ratio.clamp(0.0, 1.0);

    let nodes: Vec<Node> = (1..=count)
        .map(|id| {
            let features: Vec<bool> = (0..args.features).map(|_| rng.next_f64() < ratio).collect();
            Node::new(
                id.to_string(),
                rng.range_f64(36.0, 60.0),
                rng.range_f64(-10.0, 30.0),
            )
            .with_features(&features)
        })
        .collect();

    let mut edges = BTreeSet::new();
    for id in 1..=count {
        let next = if id == count { 1 } else { id + 1 };
        edges.insert((id.min(next), id.max(next)));
    }
    let p = args.density.clamp(0.0, 1.0);
    for u in 1..=count {
        for v in (u + 1)..=count {
            if rng.next_f64() < p {
                edges.insert((u, v));
            }
        }
    }

    let edges = edges
        .into_iter()
        .map(|(u, v)| (u.to_string(), v.to_string()))
        .collect::<Vec<_>>();
    let topology = Topology::build(nodes, edges).context("synthetic topology should build")?;
    Ok(Arc::new(topology))
}

fn bench_requirement_count(
    pipeline: &RouteRequestPipeline,
    rng: &mut LcgRng,
    args: &Args,
    requirement_count: usize,
) -> Value {
    let topology = pipeline.topology();
    let node_count = topology.node_count();
    let names: Vec<String> = (0..requirement_count).map(|f| f.to_string()).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();

    let mut subsets = 0_u64;
    let mut search_s = 0.0;
    let mut total_s = 0.0;
    let mut satisfied = 0_usize;
    let mut succeeded = 0_usize;
    let runs = args.requests.max(1);

    for run in 0..runs {
        let src = rng.below(node_count);
        let mut dst = rng.below(node_count);
        if dst == src {
            dst = (src + 1) % node_count;
        }
        let request = RouteRequest::new(&topology.node(src).id, &topology.node(dst).id)
            .with_best_effort(&refs, args.mode.into())
            .with_optimization(Optimization::MinimizeTotalLatency)
            .with_multipath(args.target_paths, 1);
        let result = pipeline.evaluate(run, &request);
        subsets += result.search.subsets_evaluated;
        search_s += result.search.elapsed.as_secs_f64();
        total_s += result.timings.total.as_secs_f64();
        satisfied += result.satisfied_best_effort.len();
        if result.status.is_success() {
            succeeded += 1;
        }
    }

    let runs_f = runs as f64;
    json!({
        "requirements": requirement_count,
        "mean_subsets": subsets as f64 / runs_f,
        "mean_search_ms": search_s * 1000.0 / runs_f,
        "mean_total_ms": total_s * 1000.0 / runs_f,
        "mean_satisfied": satisfied as f64 / runs_f,
        "success_ratio": succeeded as f64 / runs_f,
    })
}

fn field(row: &Value, key: &str) -> f64 {
    row.get(key).and_then(Value::as_f64).unwrap_or(f64::NAN)
}

fn aggregate(seed_rows: &[Vec<Value>], max_requirements: usize) -> Vec<Value> {
    let keys = [
        "mean_subsets",
        "mean_search_ms",
        "mean_total_ms",
        "mean_satisfied",
        "success_ratio",
    ];
    (0..=max_requirements)
        .map(|k| {
            let rows: Vec<&Value> = seed_rows.iter().filter_map(|rows| rows.get(k)).collect();
            let mut out = json!({ "requirements": k });
            for key in keys {
                let avg = if rows.is_empty() {
                    f64::NAN
                } else {
                    rows.iter().map(|row| field(row, key)).sum::<f64>() / rows.len() as f64
                };
                if let Some(map) = out.as_object_mut() {
                    map.insert(key.to_string(), json!(avg));
                }
            }
            out
        })
        .collect()
}

fn print_summary(rows: &[Value]) {
    println!("requirements\tmean_subsets\tmean_search_ms\tmean_total_ms\tmean_satisfied\tsuccess_ratio");
    for row in rows {
        println!(
            "{}\t{:.1}\t{:.4}\t{:.4}\t{:.2}\t{:.2}",
            row.get("requirements").and_then(Value::as_u64).unwrap_or(0),
            field(row, "mean_subsets"),
            field(row, "mean_search_ms"),
            field(row, "mean_total_ms"),
            field(row, "mean_satisfied"),
            field(row, "success_ratio"),
        );
    }
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;
    let max_requirements = args.max_requirements.min(args.features);
    let settings = PipelineSettings {
        compute_baselines: false,
        ..PipelineSettings::default()
    };

    let mut seed_rows = Vec::new();
    let mut per_seed = Vec::new();
    for idx in 0..args.seeds.max(1) {
        let seed = args.start_seed + idx as u64;
        let topology = match args.topology.as_ref() {
            Some(path) => Arc::new(Topology::from_records(&load_topology_records(path)?)?),
            None => generate_topology(seed, &args)?,
        };
        if topology.node_count() < 2 {
            bail!("benchmark topology needs at least two nodes");
        }
        let pipeline = RouteRequestPipeline::new(topology, settings.clone());
        info!(
            seed,
            nodes = pipeline.topology().node_count(),
            edges = pipeline.topology().edge_count(),
            "benchmark topology ready"
        );
        let mut rng = LcgRng::new(seed.wrapping_mul(31).wrapping_add(7));

        let rows: Vec<Value> = (0..=max_requirements)
            .map(|k| bench_requirement_count(&pipeline, &mut rng, &args, k))
            .collect();
        per_seed.push(json!({
            "seed": seed,
            "nodes": pipeline.topology().node_count(),
            "edges": pipeline.topology().edge_count(),
            "rows": rows.clone(),
        }));
        seed_rows.push(rows);
    }

    let aggregated = aggregate(&seed_rows, max_requirements);
    print_summary(&aggregated);

    if let Some(path) = args.output_json.as_ref() {
        let out = json!({
            "nodes": args.nodes,
            "density": args.density,
            "features": args.features,
            "feature_ratio": args.feature_ratio,
            "requests": args.requests,
            "target_paths": args.target_paths,
            "seeds": per_seed,
            "aggregate": aggregated,
        });
        fs::write(path, serde_json::to_string_pretty(&out)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    Ok(())
}
