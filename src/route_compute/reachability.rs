use std::collections::VecDeque;

use crate::model::topology::{NodeIndex, TopologyView};

/// Breadth-first reachability inside a view. Endpoints missing from the view
/// are unreachable.
pub fn has_path(view: &TopologyView, src: NodeIndex, dst: NodeIndex) -> bool {
    if !view.contains(src) || !view.contains(dst) {
        return false;
    }
    if src == dst {
        return true;
    }

    let mut seen = vec![false; view.topology().node_count()];
    let mut queue = VecDeque::from([src]);
    seen[src] = true;

    while let Some(u) = queue.pop_front() {
        for (v, _) in view.neighbors(u) {
            if seen[v] {
                continue;
            }
            if v == dst {
                return true;
            }
            seen[v] = true;
            queue.push_back(v);
        }
    }
    false
}

/// Fewest-hop path inside a view. Neighbours are expanded in ascending index
/// order and the first discovery of a node fixes its parent, so equal-length
/// alternatives resolve the same way on every run.
pub fn shortest_path(
    view: &TopologyView,
    src: NodeIndex,
    dst: NodeIndex,
) -> Option<Vec<NodeIndex>> {
    if !view.contains(src) || !view.contains(dst) {
        return None;
    }
    if src == dst {
        return Some(vec![src]);
    }

    let mut parent: Vec<Option<NodeIndex>> = vec![None; view.topology().node_count()];
    let mut queue = VecDeque::from([src]);
    parent[src] = Some(src);

    'search: while let Some(u) = queue.pop_front() {
        for (v, _) in view.neighbors(u) {
            if parent[v].is_some() {
                continue;
            }
            parent[v] = Some(u);
            if v == dst {
                break 'search;
            }
            queue.push_back(v);
        }
    }

    if parent[dst].is_none() {
        return None;
    }
    let mut path = vec![dst];
    let mut current = dst;
    while current != src {
        current = parent[current]?;
        path.push(current);
    }
    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use crate::model::topology::fixtures::{line, node, topology};

    use super::*;

    #[test]
    fn line_is_connected_until_a_node_is_pruned() {
        let topo = line();
        let full = topo.full_view();
        assert!(has_path(&full, 0, 3));

        let pruned = full.subgraph_excluding(|n| n.id == "C");
        assert!(!has_path(&pruned, 0, 3));
        assert!(has_path(&pruned, 0, 1));
        assert!(shortest_path(&pruned, 0, 3).is_none());
        assert_eq!(shortest_path(&full, 0, 3), Some(vec![0, 1, 2, 3]));
    }

    #[test]
    fn pruned_endpoint_is_unreachable() {
        let topo = line();
        let pruned = topo.full_view().subgraph_excluding(|n| n.id == "A");
        assert!(!has_path(&pruned, 0, 3));
        assert!(shortest_path(&pruned, 0, 3).is_none());
    }

    #[test]
    fn shortest_path_prefers_lower_index_on_tie() {
        // A - B - D and A - C - D, both two hops.
        let topo = topology(
            vec![node("A", &[]), node("B", &[]), node("C", &[]), node("D", &[])],
            &[("A", "C"), ("C", "D"), ("A", "B"), ("B", "D")],
        );
        let out = shortest_path(&topo.full_view(), 0, 3).expect("path should exist");
        assert_eq!(out, vec![0, 1, 3]);
    }

    #[test]
    fn shortest_path_takes_fewer_hops() {
        // A - B - C - D plus shortcut A - D.
        let topo = topology(
            vec![node("A", &[]), node("B", &[]), node("C", &[]), node("D", &[])],
            &[("A", "B"), ("B", "C"), ("C", "D"), ("A", "D")],
        );
        let out = shortest_path(&topo.full_view(), 0, 3).expect("path should exist");
        assert_eq!(out, vec![0, 3]);
    }
}
