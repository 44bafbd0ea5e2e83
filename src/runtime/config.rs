use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::model::features::FeatureCatalog;
use crate::route_compute::SearchBudget;
use crate::runtime::pipeline::PipelineSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    pub fn parse(raw: &str) -> Result<Self> {
        match raw.trim().to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" | "jsonl" => Ok(OutputFormat::Json),
            other => bail!("unsupported output format: {other}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub format: OutputFormat,
    pub timing_decimals: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Csv,
            timing_decimals: 2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub catalog: FeatureCatalog,
    pub budget: SearchBudget,
    pub compute_baselines: bool,
    pub output: OutputConfig,
    pub workers: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            catalog: FeatureCatalog::default(),
            budget: SearchBudget::unbounded(),
            compute_baselines: true,
            output: OutputConfig::default(),
            workers: default_workers(),
        }
    }
}

impl RunnerConfig {
    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            catalog: self.catalog.clone(),
            budget: self.budget,
            compute_baselines: self.compute_baselines,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
struct RawSearch {
    max_subset_evaluations: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct RawPipeline {
    compute_baselines: Option<bool>,
}

#[derive(Debug, Deserialize, Default)]
struct RawOutput {
    format: Option<String>,
    timing_decimals: Option<u32>,
}

#[derive(Debug, Deserialize, Default)]
struct RawRunnerConfig {
    #[serde(default)]
    features: Vec<String>,
    search: Option<RawSearch>,
    pipeline: Option<RawPipeline>,
    output: Option<RawOutput>,
    workers: Option<usize>,
}

fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

pub fn load_runner_config(path: &Path) -> Result<RunnerConfig> {
    let raw_text = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    parse_runner_config(&raw_text)
}

pub fn parse_runner_config(raw_text: &str) -> Result<RunnerConfig> {
    let raw_cfg: RawRunnerConfig =
        serde_yaml::from_str(raw_text).context("failed to parse runner config yaml")?;

    let search = raw_cfg.search.unwrap_or_default();
    let pipeline = raw_cfg.pipeline.unwrap_or_default();
    let output_raw = raw_cfg.output.unwrap_or_default();

    let features: Vec<String> = raw_cfg
        .features
        .into_iter()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .collect();

    let format = match output_raw.format {
        Some(raw) => OutputFormat::parse(&raw)?,
        None => OutputFormat::Csv,
    };

    Ok(RunnerConfig {
        catalog: FeatureCatalog::new(features),
        budget: SearchBudget {
            max_subset_evaluations: search.max_subset_evaluations,
        },
        compute_baselines: pipeline.compute_baselines.unwrap_or(true),
        output: OutputConfig {
            format,
            timing_decimals: output_raw.timing_decimals.unwrap_or(2).min(9),
        },
        workers: raw_cfg.workers.unwrap_or_else(default_workers).max(1),
    })
}
