use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use tracing::{debug, info, warn};

use crate::model::request::RouteRequest;
use crate::runtime::pipeline::RouteRequestPipeline;
use crate::runtime::result_log::ResultLog;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub total: usize,
    pub completed: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub interrupted: bool,
}

#[derive(Debug)]
pub struct BatchOutcome<W> {
    pub summary: BatchSummary,
    pub elapsed: Duration,
    pub sink: W,
}

/// Evaluates `requests` on `workers` threads sharing one pipeline. Workers
/// claim request indices from a shared counter and stop claiming once `stop`
/// is raised; the calling thread owns the log and is its only writer.
pub fn run_batch<W: Write>(
    pipeline: &RouteRequestPipeline,
    requests: &[RouteRequest],
    workers: usize,
    mut log: ResultLog<W>,
    stop: &AtomicBool,
) -> Result<BatchOutcome<W>> {
    let started = Instant::now();
    let workers = workers.clamp(1, requests.len().max(1));
    let next = AtomicUsize::new(0);
    let mut summary = BatchSummary {
        total: requests.len(),
        ..BatchSummary::default()
    };
    info!(requests = requests.len(), workers, "starting batch");

    thread::scope(|scope| -> Result<()> {
        let (tx, rx) = mpsc::channel();
        for worker in 0..workers {
            let tx = tx.clone();
            let next = &next;
            thread::Builder::new()
                .name(format!("route-worker-{worker}"))
                .spawn_scoped(scope, move || loop {
                    if stop.load(Ordering::SeqCst) {
                        debug!(worker, "stop requested");
                        break;
                    }
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    let Some(request) = requests.get(index) else {
                        break;
                    };
                    if tx.send(pipeline.evaluate(index, request)).is_err() {
                        break;
                    }
                })
                .map_err(|err| anyhow!("failed to spawn worker {worker}: {err}"))?;
        }
        drop(tx);

        for result in rx {
            summary.completed += 1;
            if result.status.is_success() {
                summary.succeeded += 1;
            } else {
                summary.failed += 1;
            }
            // Dropping the receiver on error makes the workers wind down.
            log.record(result)?;
        }
        Ok(())
    })?;

    summary.interrupted = summary.completed < summary.total;
    if summary.interrupted {
        warn!(
            completed = summary.completed,
            total = summary.total,
            "batch interrupted before all requests were evaluated"
        );
    }
    let sink = log.finish()?;
    let elapsed = started.elapsed();
    info!(
        completed = summary.completed,
        succeeded = summary.succeeded,
        failed = summary.failed,
        elapsed_s = elapsed.as_secs_f64(),
        "batch finished"
    );
    Ok(BatchOutcome {
        summary,
        elapsed,
        sink,
    })
}

#[cfg(test)]
mod tests {
    use crate::model::topology::fixtures::line;
    use crate::runtime::config::OutputConfig;
    use crate::runtime::pipeline::PipelineSettings;

    use super::*;

    fn requests() -> Vec<RouteRequest> {
        vec![
            RouteRequest::new("A", "D"),
            RouteRequest::new("D", "A"),
            RouteRequest::new("A", "Z"),
            RouteRequest::new("B", "C"),
            RouteRequest::new("A", "D").with_strict(&["0"]),
            RouteRequest::new("A", "C").with_strict(&["0"]).with_fallback(true),
        ]
    }

    fn first_columns(sink: Vec<u8>) -> Vec<String> {
        String::from_utf8(sink)
            .expect("utf8")
            .lines()
            .map(|line| line.split(',').next().unwrap_or("").to_string())
            .collect()
    }

    #[test]
    fn batch_writes_every_request_in_order() {
        let pipeline = RouteRequestPipeline::new(line(), PipelineSettings::default());
        let requests = requests();
        let stop = AtomicBool::new(false);
        let log = ResultLog::new(Vec::new(), OutputConfig::default());

        let outcome = run_batch(&pipeline, &requests, 4, log, &stop).expect("batch runs");
        assert_eq!(outcome.summary.total, 6);
        assert_eq!(outcome.summary.completed, 6);
        assert_eq!(outcome.summary.succeeded, 4);
        assert_eq!(outcome.summary.failed, 2);
        assert!(!outcome.summary.interrupted);
        assert_eq!(
            first_columns(outcome.sink),
            vec!["0", "1", "2", "3", "4", "5"]
        );
    }

    #[test]
    fn single_worker_matches_parallel_output() {
        let pipeline = RouteRequestPipeline::new(line(), PipelineSettings::default());
        let requests = requests();
        let stop = AtomicBool::new(false);

        let serial = run_batch(
            &pipeline,
            &requests,
            1,
            ResultLog::new(Vec::new(), OutputConfig::default()),
            &stop,
        )
        .expect("serial batch");
        let parallel = run_batch(
            &pipeline,
            &requests,
            3,
            ResultLog::new(Vec::new(), OutputConfig::default()),
            &stop,
        )
        .expect("parallel batch");

        let statuses = |sink: Vec<u8>| -> Vec<String> {
            String::from_utf8(sink)
                .expect("utf8")
                .lines()
                .map(|line| line.split(',').nth(3).unwrap_or("").to_string())
                .collect()
        };
        assert_eq!(statuses(serial.sink), statuses(parallel.sink));
    }

    #[test]
    fn raised_stop_flag_evaluates_nothing() {
        let pipeline = RouteRequestPipeline::new(line(), PipelineSettings::default());
        let requests = requests();
        let stop = AtomicBool::new(true);
        let log = ResultLog::new(Vec::new(), OutputConfig::default());

        let outcome = run_batch(&pipeline, &requests, 2, log, &stop).expect("batch runs");
        assert_eq!(outcome.summary.completed, 0);
        assert!(outcome.summary.interrupted);
        assert!(outcome.sink.is_empty());
    }

    #[test]
    fn empty_batch_is_not_interrupted() {
        let pipeline = RouteRequestPipeline::new(line(), PipelineSettings::default());
        let stop = AtomicBool::new(false);
        let log = ResultLog::new(Vec::new(), OutputConfig::default());

        let outcome = run_batch(&pipeline, &[], 8, log, &stop).expect("batch runs");
        assert_eq!(outcome.summary, BatchSummary::default());
    }
}
