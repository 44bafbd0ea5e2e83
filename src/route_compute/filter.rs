use std::collections::BTreeSet;

use crate::error::RouteError;
use crate::model::features::FeatureCatalog;
use crate::model::topology::{Node, TopologyView};

/// Node admission rule shared by the strict and best-effort phases: every
/// required capability present, no geolocation in the excluded set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NodeFilter {
    required: Vec<usize>,
    excluded_countries: BTreeSet<String>,
}

impl NodeFilter {
    pub fn new(required: Vec<usize>, excluded_countries: BTreeSet<String>) -> Self {
        Self {
            required,
            excluded_countries,
        }
    }

    pub fn capabilities(required: Vec<usize>) -> Self {
        Self::new(required, BTreeSet::new())
    }

    pub fn admits(&self, node: &Node) -> bool {
        self.required.iter().all(|position| node.has_feature(*position))
            && !node.located_in_any(&self.excluded_countries)
    }

    pub fn apply(&self, view: &TopologyView) -> TopologyView {
        view.subgraph_excluding(|node| !self.admits(node))
    }
}

pub fn resolve_capabilities(
    catalog: &FeatureCatalog,
    names: &[String],
) -> Result<Vec<usize>, RouteError> {
    names
        .iter()
        .map(|name| {
            catalog
                .resolve(name)
                .ok_or_else(|| RouteError::UnknownCapability(name.clone()))
        })
        .collect()
}
