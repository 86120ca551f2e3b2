//! Undirected multigraph view of the grid.
//!
//! Adjacency lists keep insertion order so breadth-first traversals are
//! deterministic: lines in model order, then transformers.

use std::collections::{BTreeMap, VecDeque};

use super::types::{BusId, LineId};

/// Edge type of the topology graph
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeKind {
    Line(LineId),
    Transformer(u32),
}

impl EdgeKind {
    /// Line id carried by this edge, if it is a line edge
    pub fn line(&self) -> Option<LineId> {
        match self {
            EdgeKind::Line(id) => Some(*id),
            EdgeKind::Transformer(_) => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TopologyGraph {
    adjacency: BTreeMap<BusId, Vec<(BusId, EdgeKind)>>,
}

impl TopologyGraph {
    pub fn new(buses: impl IntoIterator<Item = BusId>) -> Self {
        Self {
            adjacency: buses.into_iter().map(|bus| (bus, Vec::new())).collect(),
        }
    }

    /// Add an undirected edge. Unknown endpoints are added as isolated buses first.
    pub fn add_edge(&mut self, a: BusId, b: BusId, kind: EdgeKind) {
        self.adjacency.entry(a).or_default().push((b, kind));
        if a != b {
            self.adjacency.entry(b).or_default().push((a, kind));
        }
    }

    pub fn contains_bus(&self, bus: BusId) -> bool {
        self.adjacency.contains_key(&bus)
    }

    pub fn neighbors(&self, bus: BusId) -> &[(BusId, EdgeKind)] {
        self.adjacency.get(&bus).map(Vec::as_slice).unwrap_or(&[])
    }

    /// First edge inserted between `a` and `b`
    pub fn edge_between(&self, a: BusId, b: BusId) -> Option<EdgeKind> {
        self.neighbors(a)
            .iter()
            .find(|(other, _)| *other == b)
            .map(|(_, kind)| *kind)
    }

    /// Unweighted shortest paths from `source` to every reachable bus, in BFS
    /// discovery order. The first path is the trivial `[source]`.
    pub fn shortest_paths(&self, source: BusId) -> Vec<Vec<BusId>> {
        if !self.contains_bus(source) {
            return Vec::new();
        }

        let mut parent: BTreeMap<BusId, BusId> = BTreeMap::new();
        let mut order = vec![source];
        let mut queue = VecDeque::from([source]);
        parent.insert(source, source);

        while let Some(bus) = queue.pop_front() {
            for (next, _) in self.neighbors(bus) {
                if parent.contains_key(next) {
                    continue;
                }
                parent.insert(*next, bus);
                order.push(*next);
                queue.push_back(*next);
            }
        }

        order
            .into_iter()
            .map(|target| {
                let mut path = vec![target];
                let mut cursor = target;
                while cursor != source {
                    cursor = parent[&cursor];
                    path.push(cursor);
                }
                path.reverse();
                path
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring() -> TopologyGraph {
        let mut graph = TopologyGraph::new(0..4);
        graph.add_edge(0, 1, EdgeKind::Line(0));
        graph.add_edge(1, 2, EdgeKind::Line(1));
        graph.add_edge(2, 3, EdgeKind::Line(2));
        graph.add_edge(3, 0, EdgeKind::Line(3));
        graph
    }

    #[test]
    fn test_shortest_paths_follow_discovery_order() {
        let paths = ring().shortest_paths(0);
        assert_eq!(paths, vec![vec![0], vec![0, 1], vec![0, 3], vec![0, 1, 2]]);
    }

    #[test]
    fn test_unreachable_buses_have_no_path() {
        let mut graph = ring();
        graph.add_edge(7, 8, EdgeKind::Transformer(0));
        let paths = graph.shortest_paths(0);
        assert!(paths.iter().all(|path| !path.contains(&7) && !path.contains(&8)));
        assert!(graph.shortest_paths(42).is_empty());
    }

    #[test]
    fn test_edge_between_returns_first_inserted() {
        let mut graph = ring();
        graph.add_edge(0, 1, EdgeKind::Transformer(5));
        assert_eq!(graph.edge_between(0, 1), Some(EdgeKind::Line(0)));
        assert_eq!(graph.edge_between(1, 0), Some(EdgeKind::Line(0)));
        assert_eq!(graph.edge_between(0, 2), None);
    }
}
