use std::collections::BTreeMap;
use std::io::Write;

use anyhow::{Context, Result};

use crate::model::result::{ResultPath, RouteResult};
use crate::runtime::config::{OutputConfig, OutputFormat};

fn encode_path(path: &ResultPath) -> String {
    format!("{}-{}", path.nodes.join(";"), path.rounded_latency_ms())
}

fn encode_optional_path(path: Option<&ResultPath>) -> String {
    path.map(encode_path).unwrap_or_default()
}

fn latency_and_hops(path: Option<&ResultPath>) -> String {
    match path {
        Some(path) => format!("{},{}", path.rounded_latency_ms(), path.hop_count),
        None => "0,0".to_string(),
    }
}

fn hops_and_latency(path: Option<&ResultPath>) -> String {
    match path {
        Some(path) => format!("{},{}", path.hop_count, path.rounded_latency_ms()),
        None => "0,0".to_string(),
    }
}

/// `a;b;c-12|a;d;c-15#shortest-9#fastest-9,k,search_s,subsets,ref_ms,ref_hops,default_hops,default_ms`
pub fn path_summary(result: &RouteResult) -> String {
    let selected = result
        .selected()
        .iter()
        .map(encode_path)
        .collect::<Vec<_>>()
        .join("|");
    format!(
        "{}#{}#{},{},{:.3},{},{},{}",
        selected,
        encode_optional_path(result.baselines.shortest.as_ref()),
        encode_optional_path(result.baselines.fastest.as_ref()),
        result.search.requirement_count,
        result.search.elapsed.as_secs_f64(),
        result.search.subsets_evaluated,
        latency_and_hops(result.comparison.reference.as_ref()),
        hops_and_latency(result.comparison.default_path.as_ref()),
    )
}

pub fn encode_csv_line(result: &RouteResult, decimals: u32) -> String {
    let precision = decimals as usize;
    let timings = &result.timings;
    format!(
        "{},{},{},{},{:.p$},{:.p$},{:.p$},{:.p$},{:.p$},{}",
        result.index,
        result.candidate_count(),
        result.selected_count,
        result.status,
        timings.graph_build.as_secs_f64(),
        timings.strict.as_secs_f64(),
        timings.best_effort.as_secs_f64(),
        timings.scoring.as_secs_f64(),
        timings.total.as_secs_f64(),
        path_summary(result),
        p = precision,
    )
}

/// Append-only result sink. Only one owner writes, and records come out in
/// request-index order regardless of completion order.
pub struct ResultLog<W: Write> {
    out: W,
    output: OutputConfig,
    next_index: usize,
    pending: BTreeMap<usize, RouteResult>,
    written: usize,
}

impl<W: Write> ResultLog<W> {
    pub fn new(out: W, output: OutputConfig) -> Self {
        Self {
            out,
            output,
            next_index: 0,
            pending: BTreeMap::new(),
            written: 0,
        }
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn record(&mut self, result: RouteResult) -> Result<()> {
        self.pending.insert(result.index, result);
        while let Some(result) = self.pending.remove(&self.next_index) {
            self.write_one(&result)?;
            self.next_index += 1;
        }
        Ok(())
    }

    /// Writes whatever is still buffered (gaps appear when a run was
    /// interrupted) and hands the sink back.
    pub fn finish(mut self) -> Result<W> {
        let pending = std::mem::take(&mut self.pending);
        for result in pending.values() {
            self.write_one(result)?;
        }
        self.out.flush().context("failed to flush result log")?;
        Ok(self.out)
    }

    fn write_one(&mut self, result: &RouteResult) -> Result<()> {
        match self.output.format {
            OutputFormat::Csv => {
                let line = encode_csv_line(result, self.output.timing_decimals);
                writeln!(self.out, "{line}").context("failed to write result line")?;
            }
            OutputFormat::Json => {
                serde_json::to_writer(&mut self.out, result)
                    .context("failed to encode result record")?;
                writeln!(self.out).context("failed to write result line")?;
            }
        }
        self.written += 1;
        Ok(())
    }
}
