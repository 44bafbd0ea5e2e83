use crate::model::topology::{Node, NodeIndex, Topology};

use super::{CostModel, ScoredPath};

pub const EARTH_RADIUS_MILES: f64 = 3_958.761_3;

pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10_f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Haversine distance in statute miles.
pub fn great_circle_miles(lat0: f64, lon0: f64, lat1: f64, lon1: f64) -> f64 {
    let phi0 = lat0.to_radians();
    let phi1 = lat1.to_radians();
    let d_phi = (lat1 - lat0).to_radians();
    let d_lambda = (lon1 - lon0).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi0.cos() * phi1.cos() * (d_lambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).max(0.0).sqrt());
    EARTH_RADIUS_MILES * c
}

/// Estimated one-way WAN latency in milliseconds between two adjacent ASes:
/// 10% fiber route inflation plus a fixed 200 mile equipment allowance,
/// round trip at 124 miles/ms, plus 0.5 ms.
pub fn hop_latency_ms(a: &Node, b: &Node) -> f64 {
    let miles = great_circle_miles(a.lat, a.lon, b.lat, b.lon);
    round_to((miles * 1.1 + 200.0) * 2.0 / 124.0 + 0.5, 2)
}

#[derive(Debug, Clone, Copy)]
pub struct PathScorer<'a> {
    topology: &'a Topology,
}

impl<'a> PathScorer<'a> {
    pub fn new(topology: &'a Topology) -> Self {
        Self { topology }
    }

    pub fn hop_count(&self, path: &[NodeIndex]) -> usize {
        path.len().saturating_sub(1)
    }

    /// Sum of per-hop estimates; callers round to whole milliseconds for
    /// reporting.
    pub fn latency_ms(&self, path: &[NodeIndex]) -> f64 {
        path.windows(2)
            .map(|hop| hop_latency_ms(self.topology.node(hop[0]), self.topology.node(hop[1])))
            .sum()
    }

    pub fn score(&self, path: &[NodeIndex], model: CostModel) -> f64 {
        match model {
            CostModel::HopCount => self.hop_count(path) as f64,
            CostModel::GeodesicLatency => self.latency_ms(path),
        }
    }

    pub fn scored(&self, path: Vec<NodeIndex>, model: CostModel) -> ScoredPath {
        let latency_ms = self.latency_ms(&path);
        let score = match model {
            CostModel::HopCount => self.hop_count(&path) as f64,
            CostModel::GeodesicLatency => latency_ms,
        };
        ScoredPath {
            nodes: path,
            score,
            latency_ms,
        }
    }
}
