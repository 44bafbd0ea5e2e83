use std::collections::VecDeque;

use crate::model::topology::{EdgeIndex, NodeIndex, TopologyView};

/// Unit-capacity flow over the undirected edges of a view. `flow[e]` is +1
/// when edge `e = (a, b)` with `a < b` carries a unit from `a` to `b`, -1 for
/// the opposite direction.
struct EdgeFlow<'a> {
    view: &'a TopologyView,
    flow: Vec<i8>,
}

impl<'a> EdgeFlow<'a> {
    fn new(view: &'a TopologyView) -> Self {
        Self {
            view,
            flow: vec![0; view.topology().edge_count()],
        }
    }

    fn along(&self, u: NodeIndex, edge: EdgeIndex) -> i8 {
        let (a, _) = self.view.topology().edge(edge);
        if u == a {
            self.flow[edge]
        } else {
            -self.flow[edge]
        }
    }

    fn push(&mut self, u: NodeIndex, edge: EdgeIndex) {
        let (a, _) = self.view.topology().edge(edge);
        if u == a {
            self.flow[edge] += 1;
        } else {
            self.flow[edge] -= 1;
        }
    }

    /// One BFS augmentation; returns false when the flow is maximal.
    fn augment(&mut self, src: NodeIndex, dst: NodeIndex) -> bool {
        let node_count = self.view.topology().node_count();
        let mut parent: Vec<Option<(NodeIndex, EdgeIndex)>> = vec![None; node_count];
        let mut seen = vec![false; node_count];
        let mut queue = VecDeque::from([src]);
        seen[src] = true;

        'search: while let Some(u) = queue.pop_front() {
            for (v, edge) in self.view.neighbors(u) {
                if seen[v] || self.along(u, edge) >= 1 {
                    continue;
                }
                seen[v] = true;
                parent[v] = Some((u, edge));
                if v == dst {
                    break 'search;
                }
                queue.push_back(v);
            }
        }

        if !seen[dst] {
            return false;
        }

        let mut current = dst;
        while current != src {
            let Some((prev, edge)) = parent[current] else {
                return false;
            };
            self.push(prev, edge);
            current = prev;
        }
        true
    }

    /// Splits the flow into simple src→dst walks, lowest neighbour first.
    fn decompose(&self, src: NodeIndex, dst: NodeIndex) -> Vec<Vec<NodeIndex>> {
        let mut consumed = vec![false; self.flow.len()];
        let mut paths = Vec::new();

        loop {
            let mut path = vec![src];
            let mut current = src;
            while current != dst {
                let next = self
                    .view
                    .neighbors(current)
                    .find(|(_, edge)| !consumed[*edge] && self.along(current, *edge) == 1);
                let Some((v, edge)) = next else {
                    break;
                };
                consumed[edge] = true;
                match path.iter().position(|node| *node == v) {
                    Some(pos) => path.truncate(pos + 1),
                    None => path.push(v),
                }
                current = v;
            }
            if current != dst {
                break;
            }
            paths.push(path);
        }
        paths
    }
}

/// Maximal set of pairwise edge-disjoint paths between `src` and `dst`.
/// Paths may share nodes. With `cap`, discovery stops after that many paths.
pub fn edge_disjoint_paths(
    view: &TopologyView,
    src: NodeIndex,
    dst: NodeIndex,
    cap: Option<usize>,
) -> Vec<Vec<NodeIndex>> {
    if src == dst || !view.contains(src) || !view.contains(dst) {
        return Vec::new();
    }

    let mut flow = EdgeFlow::new(view);
    let mut units = 0usize;
    while cap.map_or(true, |limit| units < limit) && flow.augment(src, dst) {
        units += 1;
    }
    flow.decompose(src, dst)
}

#[cfg(test)]
pub(crate) fn assert_pairwise_edge_disjoint(paths: &[Vec<NodeIndex>]) {
    use std::collections::BTreeSet;

    let mut used: BTreeSet<(NodeIndex, NodeIndex)> = BTreeSet::new();
    for path in paths {
        for hop in path.windows(2) {
            let key = (hop[0].min(hop[1]), hop[0].max(hop[1]));
            assert!(used.insert(key), "edge {key:?} used twice in {paths:?}");
        }
    }
}
