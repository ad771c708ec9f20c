//! Unweighted breadth-first traversal over a snapshot's edge list.
//!
//! Nothing here touches the search index. Each call builds a throwaway
//! adjacency map from the edges it was given, so a traversal never observes a
//! later snapshot; the visited set bounds expansion to the reachable set even
//! without a depth limit.

use std::collections::VecDeque;

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_PATH_DEPTH;
use crate::model::{Edge, GraphSnapshot, Node, NodeId};

/// Which edge endpoint counts as the neighbor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Follow edges where the node is the `source`.
    Out,
    /// Follow edges where the node is the `target`.
    In,
    #[default]
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraversalOptions {
    /// `None` expands the whole reachable component.
    pub max_depth: Option<usize>,
    pub direction: Direction,
}

impl Default for TraversalOptions {
    fn default() -> Self {
        Self {
            max_depth: Some(1),
            direction: Direction::Both,
        }
    }
}

impl TraversalOptions {
    pub fn new(max_depth: Option<usize>, direction: Direction) -> Self {
        Self {
            max_depth,
            direction,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PathOptions {
    pub max_depth: usize,
}

impl Default for PathOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_PATH_DEPTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DegreeKind {
    In,
    Out,
    #[default]
    Total,
}

// ============================================================================
// Adjacency
// ============================================================================

/// Neighbor lists in edge-list order.
struct Adjacency<'a> {
    neighbors: AHashMap<&'a NodeId, Vec<&'a NodeId>>,
}

impl<'a> Adjacency<'a> {
    fn build(edges: &'a [Edge], direction: Direction) -> Self {
        let mut neighbors: AHashMap<&NodeId, Vec<&NodeId>> = AHashMap::new();
        for edge in edges {
            if matches!(direction, Direction::Out | Direction::Both) {
                neighbors.entry(&edge.source).or_default().push(&edge.target);
            }
            if matches!(direction, Direction::In | Direction::Both) {
                neighbors.entry(&edge.target).or_default().push(&edge.source);
            }
        }
        Self { neighbors }
    }

    fn of(&self, id: &NodeId) -> &[&'a NodeId] {
        self.neighbors.get(id).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Per-node edge counts. A self-loop counts once toward `in`, once toward
/// `out`, and once toward `total`.
#[derive(Debug, Default)]
pub struct DegreeTable<'a> {
    counts: AHashMap<&'a NodeId, (usize, usize, usize)>,
}

impl<'a> DegreeTable<'a> {
    pub fn build(edges: &'a [Edge]) -> Self {
        let mut counts: AHashMap<&NodeId, (usize, usize, usize)> = AHashMap::new();
        for edge in edges {
            counts.entry(&edge.source).or_default().1 += 1;
            counts.entry(&edge.target).or_default().0 += 1;
            counts.entry(&edge.source).or_default().2 += 1;
            if edge.target != edge.source {
                counts.entry(&edge.target).or_default().2 += 1;
            }
        }
        Self { counts }
    }

    pub fn degree(&self, id: &NodeId, kind: DegreeKind) -> usize {
        let Some(&(incoming, outgoing, total)) = self.counts.get(id) else {
            return 0;
        };
        match kind {
            DegreeKind::In => incoming,
            DegreeKind::Out => outgoing,
            DegreeKind::Total => total,
        }
    }
}

// ============================================================================
// Traversal
// ============================================================================

#[derive(Debug, Clone, Copy)]
pub struct GraphTraversal<'a> {
    nodes: &'a [Node],
    edges: &'a [Edge],
}

impl<'a> GraphTraversal<'a> {
    pub fn new(nodes: &'a [Node], edges: &'a [Edge]) -> Self {
        Self { nodes, edges }
    }

    pub fn from_snapshot(snapshot: &'a GraphSnapshot) -> Self {
        Self::new(&snapshot.nodes, &snapshot.edges)
    }

    /// Edges touching `id`, counted per [`DegreeKind`].
    pub fn degree(&self, id: &NodeId, kind: DegreeKind) -> usize {
        self.edges
            .iter()
            .filter(|e| match kind {
                DegreeKind::In => &e.target == id,
                DegreeKind::Out => &e.source == id,
                DegreeKind::Total => e.touches(id),
            })
            .count()
    }

    /// Nodes reachable from `start` within `max_depth` hops, in BFS order.
    ///
    /// The start node itself is never returned, and ids that do not resolve to
    /// a node in the snapshot are skipped.
    pub fn find_connected_nodes(&self, start: &NodeId, options: &TraversalOptions) -> Vec<Node> {
        let adjacency = Adjacency::build(self.edges, options.direction);
        let by_id = self.node_lookup();

        let mut visited: AHashSet<&NodeId> = AHashSet::new();
        let mut queue: VecDeque<(&NodeId, usize)> = VecDeque::new();
        let mut out = Vec::new();
        queue.push_back((start, 0));

        while let Some((current, depth)) = queue.pop_front() {
            if !visited.insert(current) {
                continue;
            }
            if depth > 0 {
                if let Some(node) = by_id.get(current) {
                    out.push((*node).clone());
                }
            }
            if options.max_depth.is_some_and(|max| depth >= max) {
                continue;
            }
            for &neighbor in adjacency.of(current) {
                if !visited.contains(neighbor) {
                    queue.push_back((neighbor, depth + 1));
                }
            }
        }

        out
    }

    /// Shortest path by edge count, ignoring direction.
    ///
    /// Returns the node ids from `source` to `target` inclusive, or `None` if
    /// `target` is not reachable within `max_depth` hops.
    pub fn find_path(
        &self,
        source: &NodeId,
        target: &NodeId,
        options: &PathOptions,
    ) -> Option<Vec<NodeId>> {
        if source == target {
            return Some(vec![source.clone()]);
        }

        let adjacency = Adjacency::build(self.edges, Direction::Both);
        let mut visited: AHashSet<&NodeId> = AHashSet::new();
        let mut queue: VecDeque<(&NodeId, Vec<&NodeId>, usize)> = VecDeque::new();
        visited.insert(source);
        queue.push_back((source, vec![source], 0));

        while let Some((current, path, depth)) = queue.pop_front() {
            if depth >= options.max_depth {
                continue;
            }
            for &neighbor in adjacency.of(current) {
                if neighbor == target {
                    let mut found: Vec<NodeId> = path.iter().map(|id| (*id).clone()).collect();
                    found.push(neighbor.clone());
                    return Some(found);
                }
                if visited.insert(neighbor) {
                    let mut next = path.clone();
                    next.push(neighbor);
                    queue.push_back((neighbor, next, depth + 1));
                }
            }
        }

        None
    }

    fn node_lookup(&self) -> AHashMap<&'a NodeId, &'a Node> {
        let mut by_id = AHashMap::with_capacity(self.nodes.len());
        for node in self.nodes {
            by_id.entry(&node.id).or_insert(node);
        }
        by_id
    }
}
