use serde::{Deserialize, Serialize};

use super::lenient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BestEffortMode {
    #[default]
    BiggestSubset,
    OrderedList,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Optimization {
    #[default]
    None,
    MinimizeTotalLatency,
    MinimizeNumberOfHops,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Requirements {
    #[serde(default)]
    pub strict: Vec<String>,
    #[serde(default)]
    pub best_effort: Vec<String>,
    #[serde(default)]
    pub best_effort_mode: BestEffortMode,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GeoExclusions {
    #[serde(default)]
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct MultipathSpec {
    /// Zero asks for every discoverable disjoint path.
    #[serde(
        rename = "target_amount_of_paths",
        alias = "target_count",
        default = "default_path_count"
    )]
    pub target_count: usize,
    #[serde(
        rename = "minimum_number_of_paths",
        alias = "minimum_count",
        default = "default_path_count"
    )]
    pub minimum_count: usize,
}

fn default_path_count() -> usize {
    1
}

impl Default for MultipathSpec {
    fn default() -> Self {
        Self {
            target_count: 1,
            minimum_count: 1,
        }
    }
}

/// A path request object: one route computation between two ASes.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RouteRequest {
    #[serde(rename = "as_source", alias = "source", deserialize_with = "lenient::id")]
    pub source: String,
    #[serde(
        rename = "as_destination",
        alias = "destination",
        deserialize_with = "lenient::id"
    )]
    pub destination: String,
    #[serde(default)]
    pub requirements: Requirements,
    #[serde(default, rename = "geolocation")]
    pub geo: GeoExclusions,
    #[serde(default, rename = "path_optimization", alias = "optimization")]
    pub optimization: Optimization,
    #[serde(default)]
    pub multipath: MultipathSpec,
    #[serde(
        default,
        rename = "fallback_to_ebgp_if_no_path_found",
        alias = "fallback_to_alt_routing_on_failure",
        deserialize_with = "lenient::flag"
    )]
    pub fallback_on_failure: bool,
    /// Externally chosen path used only for comparison metrics.
    #[serde(default, deserialize_with = "lenient::opt_ids")]
    pub reference_path: Option<Vec<String>>,
}

impl RouteRequest {
    pub fn new(source: impl Into<String>, destination: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            destination: destination.into(),
            requirements: Requirements::default(),
            geo: GeoExclusions::default(),
            optimization: Optimization::None,
            multipath: MultipathSpec::default(),
            fallback_on_failure: false,
            reference_path: None,
        }
    }

    pub fn with_strict(mut self, capabilities: &[&str]) -> Self {
        self.requirements.strict = capabilities.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_best_effort(mut self, capabilities: &[&str], mode: BestEffortMode) -> Self {
        self.requirements.best_effort = capabilities.iter().map(|c| c.to_string()).collect();
        self.requirements.best_effort_mode = mode;
        self
    }

    pub fn with_geo_exclusions(mut self, countries: &[&str]) -> Self {
        self.geo.exclude = countries.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_optimization(mut self, optimization: Optimization) -> Self {
        self.optimization = optimization;
        self
    }

    pub fn with_multipath(mut self, target_count: usize, minimum_count: usize) -> Self {
        self.multipath = MultipathSpec {
            target_count,
            minimum_count,
        };
        self
    }

    pub fn with_fallback(mut self, fallback_on_failure: bool) -> Self {
        self.fallback_on_failure = fallback_on_failure;
        self
    }
}
