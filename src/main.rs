use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use proute::runtime::batch::run_batch;
use proute::runtime::config::{load_runner_config, OutputFormat, RunnerConfig};
use proute::runtime::loader::{
    attach_reference_paths, load_reference_paths, load_requests, load_topology_records,
};
use proute::runtime::pipeline::RouteRequestPipeline;
use proute::runtime::result_log::ResultLog;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "proute")]
#[command(about = "Evaluate constrained multipath route requests against an AS topology")]
struct Args {
    /// Directory of per-node JSON files, or one JSON file with a node array.
    #[arg(long)]
    topology: PathBuf,
    /// Directory of per-request JSON files, or one JSON file with a request array.
    #[arg(long)]
    requests: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    /// Result file; stdout when omitted.
    #[arg(long)]
    output: Option<PathBuf>,
    /// One comma-separated AS path per line, aligned with the request order.
    #[arg(long)]
    reference_paths: Option<PathBuf>,
    #[arg(long)]
    workers: Option<usize>,
    #[arg(long)]
    format: Option<String>,
    #[arg(long, default_value = "INFO")]
    log_level: String,
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level)?;

    let mut cfg = match &args.config {
        Some(path) => load_runner_config(path)?,
        None => RunnerConfig::default(),
    };
    if let Some(workers) = args.workers {
        cfg.workers = workers.max(1);
    }
    if let Some(raw) = &args.format {
        cfg.output.format = OutputFormat::parse(raw)?;
    }

    let records = load_topology_records(&args.topology)?;
    let pipeline = RouteRequestPipeline::from_records(&records, cfg.pipeline_settings())
        .context("failed to build topology")?;
    info!(
        nodes = pipeline.topology().node_count(),
        edges = pipeline.topology().edge_count(),
        build_s = pipeline.topology().build_elapsed().as_secs_f64(),
        "topology ready"
    );

    let mut requests = load_requests(&args.requests)?;
    if let Some(path) = &args.reference_paths {
        attach_reference_paths(&mut requests, load_reference_paths(path)?);
    }

    let stop = Arc::new(AtomicBool::new(false));
    let stop_signal = Arc::clone(&stop);
    ctrlc::set_handler(move || {
        stop_signal.store(true, Ordering::SeqCst);
    })
    .context("failed to install signal handler")?;

    let sink: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(BufWriter::new(
            File::create(path)
                .with_context(|| format!("failed to create output {}", path.display()))?,
        )),
        None => Box::new(BufWriter::new(io::stdout().lock())),
    };
    let log = ResultLog::new(sink, cfg.output.clone());

    let outcome = run_batch(&pipeline, &requests, cfg.workers, log, &stop)?;
    if outcome.summary.interrupted {
        info!("stopped early on signal; partial results were written");
    }
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let level = level.parse::<Level>()?;
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(EnvFilter::from_default_env().add_directive(level.into()))
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .compact()
        .init();
    Ok(())
}
