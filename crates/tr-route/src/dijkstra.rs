//! Shortest-path search over the trail graph.
//!
//! # Cost model
//!
//! Edge cost is `edge_cost` (= `length_km`) in both directions — trails are
//! never one-way.  Costs are `f64` kilometres ordered with `total_cmp`; the
//! heap breaks ties on `VertexId` so expansion order is deterministic.
//!
//! # Edge filtering
//!
//! Route search excludes edges longer than `max_single_edge_km` so giant
//! connectors cannot dominate shortest paths; Yen's algorithm additionally
//! passes per-call edge and vertex bans.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use rustc_hash::FxHashSet;

use tr_core::{EdgeId, VertexId};
use tr_graph::TrailGraph;

// ── Cost ordering ─────────────────────────────────────────────────────────────

/// Total-ordered f64 kilometres for heap keys.
#[derive(Copy, Clone, PartialEq, Debug)]
pub(crate) struct Cost(pub f64);

impl Eq for Cost {}

impl PartialOrd for Cost {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cost {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.total_cmp(&other.0)
    }
}

// ── GraphPath ─────────────────────────────────────────────────────────────────

/// A walk through the graph: `vertices.len() == edges.len() + 1`, and
/// consecutive edges share the intermediate vertex.
#[derive(Clone, Debug, PartialEq)]
pub struct GraphPath {
    pub vertices:  Vec<VertexId>,
    pub edges:     Vec<EdgeId>,
    pub length_km: f64,
}

impl GraphPath {
    /// An empty path standing at `at`.
    pub fn trivial(at: VertexId) -> Self {
        Self { vertices: vec![at], edges: vec![], length_km: 0.0 }
    }

    pub fn start(&self) -> VertexId {
        self.vertices[0]
    }

    pub fn end(&self) -> VertexId {
        self.vertices[self.vertices.len() - 1]
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// Cumulative elevation gain walking the path in order.
    pub fn gain_m(&self, graph: &TrailGraph) -> f64 {
        self.edges
            .iter()
            .zip(&self.vertices)
            .map(|(&e, &from)| graph.gain_along(e, from))
            .sum()
    }

    /// Cumulative elevation loss walking the path in order.
    pub fn loss_m(&self, graph: &TrailGraph) -> f64 {
        self.edges
            .iter()
            .zip(&self.vertices)
            .map(|(&e, &from)| graph.loss_along(e, from))
            .sum()
    }

    /// Append `other`, which must start where `self` ends.
    pub fn join(&self, other: &GraphPath) -> GraphPath {
        debug_assert_eq!(self.end(), other.start());
        let mut vertices = self.vertices.clone();
        vertices.extend(other.vertices.iter().skip(1).copied());
        let mut edges = self.edges.clone();
        edges.extend(other.edges.iter().copied());
        GraphPath {
            vertices,
            edges,
            length_km: self.length_km + other.length_km,
        }
    }
}

// ── Dijkstra ──────────────────────────────────────────────────────────────────

/// Dijkstra searcher bound to one graph and one edge-length cap.
pub struct Dijkstra<'a> {
    graph:              &'a TrailGraph,
    max_single_edge_km: f64,
}

impl<'a> Dijkstra<'a> {
    pub fn new(graph: &'a TrailGraph, max_single_edge_km: f64) -> Self {
        Self { graph, max_single_edge_km }
    }

    pub fn graph(&self) -> &'a TrailGraph {
        self.graph
    }

    #[inline]
    fn edge_usable(&self, edge: EdgeId) -> bool {
        self.graph.edge_length_km[edge.index()] <= self.max_single_edge_km
    }

    /// Single-source single-target shortest path.
    ///
    /// `from == to` yields a trivial empty path.  Returns `None` when no
    /// path exists under the edge filter and bans.
    pub fn shortest_path(&self, from: VertexId, to: VertexId) -> Option<GraphPath> {
        self.shortest_path_with_bans(from, to, &FxHashSet::default(), &FxHashSet::default())
    }

    /// Shortest path avoiding `banned_edges` entirely and `banned_vertices`
    /// as interior or terminal vertices (the start is never banned).
    pub fn shortest_path_with_bans(
        &self,
        from: VertexId,
        to: VertexId,
        banned_edges: &FxHashSet<EdgeId>,
        banned_vertices: &FxHashSet<VertexId>,
    ) -> Option<GraphPath> {
        if from == to {
            return Some(GraphPath::trivial(from));
        }
        let n = self.graph.vertex_count();
        if from.index() >= n || to.index() >= n {
            return None;
        }

        let mut dist      = vec![f64::INFINITY; n];
        let mut prev_edge = vec![EdgeId::INVALID; n];
        let mut prev_vert = vec![VertexId::INVALID; n];
        dist[from.index()] = 0.0;

        // Min-heap: Reverse makes BinaryHeap (max) behave as min-heap.
        // Secondary key VertexId ensures deterministic tie-breaking.
        let mut heap: BinaryHeap<Reverse<(Cost, VertexId)>> = BinaryHeap::new();
        heap.push(Reverse((Cost(0.0), from)));

        while let Some(Reverse((Cost(cost), vertex))) = heap.pop() {
            if vertex == to {
                return Some(self.reconstruct(&prev_edge, &prev_vert, from, to, cost));
            }
            // Skip stale heap entries.
            if cost > dist[vertex.index()] {
                continue;
            }
            for (edge, far) in self.graph.incident(vertex) {
                if !self.edge_usable(edge) || banned_edges.contains(&edge) {
                    continue;
                }
                if banned_vertices.contains(&far) {
                    continue;
                }
                let new_cost = cost + self.graph.edge_cost[edge.index()];
                if new_cost < dist[far.index()] {
                    dist[far.index()] = new_cost;
                    prev_edge[far.index()] = edge;
                    prev_vert[far.index()] = vertex;
                    heap.push(Reverse((Cost(new_cost), far)));
                }
            }
        }
        None
    }

    /// One-to-many scan: vertices whose shortest distance from `from` lies
    /// in `[min_km, max_km]`, in ascending (distance, id) order, capped at
    /// `max_results` (a capacity guard, not a correctness bound).
    pub fn reachable_within(
        &self,
        from: VertexId,
        min_km: f64,
        max_km: f64,
        max_results: usize,
    ) -> Vec<(VertexId, f64)> {
        let n = self.graph.vertex_count();
        if from.index() >= n {
            return Vec::new();
        }
        let mut dist = vec![f64::INFINITY; n];
        dist[from.index()] = 0.0;

        let mut heap: BinaryHeap<Reverse<(Cost, VertexId)>> = BinaryHeap::new();
        heap.push(Reverse((Cost(0.0), from)));
        let mut hits: Vec<(VertexId, f64)> = Vec::new();

        while let Some(Reverse((Cost(cost), vertex))) = heap.pop() {
            if cost > dist[vertex.index()] {
                continue;
            }
            if cost > max_km {
                break; // heap is ordered; nothing closer remains
            }
            if vertex != from && cost >= min_km {
                hits.push((vertex, cost));
                if hits.len() >= max_results {
                    break;
                }
            }
            for (edge, far) in self.graph.incident(vertex) {
                if !self.edge_usable(edge) {
                    continue;
                }
                let new_cost = cost + self.graph.edge_cost[edge.index()];
                if new_cost < dist[far.index()] {
                    dist[far.index()] = new_cost;
                    heap.push(Reverse((Cost(new_cost), far)));
                }
            }
        }
        hits
    }

    fn reconstruct(
        &self,
        prev_edge: &[EdgeId],
        prev_vert: &[VertexId],
        from: VertexId,
        to: VertexId,
        length_km: f64,
    ) -> GraphPath {
        let mut vertices = vec![to];
        let mut edges = Vec::new();
        let mut cur = to;
        while cur != from {
            let e = prev_edge[cur.index()];
            edges.push(e);
            cur = prev_vert[cur.index()];
            vertices.push(cur);
        }
        vertices.reverse();
        edges.reverse();
        GraphPath { vertices, edges, length_km }
    }
}
