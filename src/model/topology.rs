use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use super::lenient;

pub type NodeIndex = usize;
pub type EdgeIndex = usize;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TopologyError {
    #[error("malformed topology: edge {from} -- {to} references unknown node {missing}")]
    UnknownEndpoint {
        from: String,
        to: String,
        missing: String,
    },
    #[error("malformed topology: duplicate node id {0}")]
    DuplicateNode(String),
}

/// One AS as it appears in a topology dump.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeRecord {
    #[serde(alias = "as_number", deserialize_with = "lenient::id")]
    pub id: String,
    #[serde(default)]
    pub geolocation: Vec<String>,
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lat: f64,
    #[serde(deserialize_with = "lenient::coordinate")]
    pub lon: f64,
    #[serde(default, deserialize_with = "lenient::ids")]
    pub connections: Vec<String>,
    #[serde(default, deserialize_with = "lenient::flags")]
    pub features: Vec<bool>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub id: String,
    pub geolocation: Vec<String>,
    pub lat: f64,
    pub lon: f64,
    pub features: Vec<bool>,
}

impl Node {
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            geolocation: Vec::new(),
            lat,
            lon,
            features: Vec::new(),
        }
    }

    pub fn with_geolocation(mut self, countries: &[&str]) -> Self {
        self.geolocation = countries.iter().map(|cc| cc.to_string()).collect();
        self
    }

    pub fn with_features(mut self, features: &[bool]) -> Self {
        self.features = features.to_vec();
        self
    }

    /// Positions past the end of the feature vector count as unsupported.
    pub fn has_feature(&self, position: usize) -> bool {
        self.features.get(position).copied().unwrap_or(false)
    }

    pub fn located_in_any(&self, countries: &BTreeSet<String>) -> bool {
        self.geolocation.iter().any(|cc| countries.contains(cc))
    }
}

impl From<&NodeRecord> for Node {
    fn from(record: &NodeRecord) -> Self {
        Self {
            id: record.id.clone(),
            geolocation: record.geolocation.clone(),
            lat: record.lat,
            lon: record.lon,
            features: record.features.clone(),
        }
    }
}

/// Immutable node arena with undirected adjacency. Filtering never touches
/// this structure; it produces [`TopologyView`]s instead.
#[derive(Debug)]
pub struct Topology {
    nodes: Vec<Node>,
    index: BTreeMap<String, NodeIndex>,
    edges: Vec<(NodeIndex, NodeIndex)>,
    adjacency: Vec<Vec<(NodeIndex, EdgeIndex)>>,
    build_elapsed: Duration,
}

impl Topology {
    pub fn build<I>(nodes: Vec<Node>, edges: I) -> Result<Self, TopologyError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let started = Instant::now();

        let mut index = BTreeMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            if index.insert(node.id.clone(), idx).is_some() {
                return Err(TopologyError::DuplicateNode(node.id.clone()));
            }
        }

        let mut pairs: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
        for (from, to) in edges {
            let Some(u) = index.get(&from).copied() else {
                return Err(TopologyError::UnknownEndpoint {
                    missing: from.clone(),
                    from,
                    to,
                });
            };
            let Some(v) = index.get(&to).copied() else {
                return Err(TopologyError::UnknownEndpoint {
                    missing: to.clone(),
                    from,
                    to,
                });
            };
            if u == v {
                debug!("drop self loop on {from}");
                continue;
            }
            pairs.insert((u.min(v), u.max(v)));
        }

        let edges: Vec<(NodeIndex, NodeIndex)> = pairs.into_iter().collect();
        let mut adjacency: Vec<Vec<(NodeIndex, EdgeIndex)>> = vec![Vec::new(); nodes.len()];
        for (edge_idx, (u, v)) in edges.iter().enumerate() {
            adjacency[*u].push((*v, edge_idx));
            adjacency[*v].push((*u, edge_idx));
        }
        for neighbors in &mut adjacency {
            neighbors.sort_unstable();
        }

        Ok(Self {
            nodes,
            index,
            edges,
            adjacency,
            build_elapsed: started.elapsed(),
        })
    }

    /// Builds the graph from topology dump records, taking edges from each
    /// record's `connections`.
    pub fn from_records(records: &[NodeRecord]) -> Result<Self, TopologyError> {
        let nodes = records.iter().map(Node::from).collect();
        let edges = records.iter().flat_map(|record| {
            record
                .connections
                .iter()
                .map(move |peer| (record.id.clone(), peer.clone()))
        });
        Self::build(nodes, edges)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn node(&self, idx: NodeIndex) -> &Node {
        &self.nodes[idx]
    }

    pub fn index_of(&self, id: &str) -> Option<NodeIndex> {
        self.index.get(id).copied()
    }

    pub fn edge(&self, edge_idx: EdgeIndex) -> (NodeIndex, NodeIndex) {
        self.edges[edge_idx]
    }

    pub fn build_elapsed(&self) -> Duration {
        self.build_elapsed
    }

    pub fn ids_of(&self, path: &[NodeIndex]) -> Vec<String> {
        path.iter().map(|idx| self.nodes[*idx].id.clone()).collect()
    }

    pub fn full_view(self: &Arc<Self>) -> TopologyView {
        TopologyView {
            topology: Arc::clone(self),
            retained: Arc::from(vec![true; self.nodes.len()]),
            retained_count: self.nodes.len(),
        }
    }
}

/// A read-only subgraph: the shared arena plus a node retention mask. Edges
/// survive when both endpoints are retained.
#[derive(Debug, Clone)]
pub struct TopologyView {
    topology: Arc<Topology>,
    retained: Arc<[bool]>,
    retained_count: usize,
}

impl TopologyView {
    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn contains(&self, idx: NodeIndex) -> bool {
        self.retained.get(idx).copied().unwrap_or(false)
    }

    pub fn node_count(&self) -> usize {
        self.retained_count
    }

    pub fn edge_count(&self) -> usize {
        self.topology
            .edges
            .iter()
            .filter(|(u, v)| self.retained[*u] && self.retained[*v])
            .count()
    }

    pub fn node_attributes(&self, idx: NodeIndex) -> Option<&Node> {
        self.contains(idx).then(|| self.topology.node(idx))
    }

    /// Retained neighbours of `idx` with the connecting edge, in ascending
    /// neighbour order.
    pub fn neighbors(&self, idx: NodeIndex) -> impl Iterator<Item = (NodeIndex, EdgeIndex)> + '_ {
        let adjacent: &[(NodeIndex, EdgeIndex)] = if self.contains(idx) {
            self.topology.adjacency[idx].as_slice()
        } else {
            &[]
        };
        adjacent
            .iter()
            .copied()
            .filter(move |(neighbor, _)| self.retained[*neighbor])
    }

    pub fn retained_nodes(&self) -> impl Iterator<Item = NodeIndex> + '_ {
        self.retained
            .iter()
            .enumerate()
            .filter_map(|(idx, keep)| keep.then_some(idx))
    }

    /// New view without the nodes for which `predicate` holds.
    pub fn subgraph_excluding<F>(&self, predicate: F) -> TopologyView
    where
        F: Fn(&Node) -> bool,
    {
        let retained: Vec<bool> = self
            .retained
            .iter()
            .zip(&self.topology.nodes)
            .map(|(keep, node)| *keep && !predicate(node))
            .collect();
        let retained_count = retained.iter().filter(|keep| **keep).count();
        TopologyView {
            topology: Arc::clone(&self.topology),
            retained: Arc::from(retained),
            retained_count,
        }
    }
}
