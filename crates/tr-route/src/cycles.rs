//! Bounded simple-cycle enumeration.
//!
//! Hawick/James-style depth-first circuit search over the undirected
//! graph, restricted to one component's vertex set.  Three bounds keep it
//! tractable on real trail networks:
//!
//! - `max_length_km`: partial paths longer than the loosest acceptance
//!   bound are cut immediately;
//! - `max_rows`: a hard cap on DFS expansions — hitting it returns the
//!   cycles found so far with `hit_row_cap` set (a Capacity outcome, not
//!   an error);
//! - vertex scope: only vertices of the current component are visited.
//!
//! # Canonical form
//!
//! Each undirected cycle is emitted exactly once: rooted at its smallest
//! vertex id (the DFS never descends below the root), walking toward the
//! smaller of its two neighbours on the cycle.  Two-edge cycles (parallel
//! edges from a midpoint-split loop trail) are canonicalised by edge id.

use tr_core::{CancelToken, EdgeId, VertexId};
use tr_graph::TrailGraph;

use crate::dijkstra::GraphPath;

// ── Outcome ───────────────────────────────────────────────────────────────────

/// Enumeration result: cycles plus the capacity flag.
#[derive(Debug, Default)]
pub struct CycleOutcome {
    pub cycles:      Vec<GraphPath>,
    pub hit_row_cap: bool,
    pub cancelled:   bool,
}

// ── CycleEnumerator ───────────────────────────────────────────────────────────

/// Simple-cycle search bound to one graph and its caps.
pub struct CycleEnumerator<'a> {
    graph:              &'a TrailGraph,
    max_single_edge_km: f64,
    max_length_km:      f64,
    max_rows:           usize,
}

impl<'a> CycleEnumerator<'a> {
    pub fn new(
        graph: &'a TrailGraph,
        max_single_edge_km: f64,
        max_length_km: f64,
        max_rows: usize,
    ) -> Self {
        Self { graph, max_single_edge_km, max_length_km, max_rows }
    }

    /// Enumerate simple cycles whose vertices all lie in `scope`.
    ///
    /// Cycles are returned in discovery order, which is deterministic:
    /// roots ascend, and each vertex's adjacency is scanned in edge-id
    /// order.
    pub fn enumerate(&self, scope: &[VertexId], cancel: &CancelToken) -> CycleOutcome {
        let n = self.graph.vertex_count();
        let mut in_scope = vec![false; n];
        for v in scope {
            in_scope[v.index()] = true;
        }

        let mut ctx = DfsCtx {
            graph:    self.graph,
            max_len:  self.max_length_km,
            max_rows: self.max_rows,
            max_edge: self.max_single_edge_km,
            rows:     0,
            in_scope,
            on_path:  vec![false; n],
            vstack:   Vec::new(),
            estack:   Vec::new(),
            length:   0.0,
            outcome:  CycleOutcome::default(),
        };

        let mut roots: Vec<VertexId> = scope.to_vec();
        roots.sort_unstable();
        for root in roots {
            if cancel.is_cancelled() {
                ctx.outcome.cancelled = true;
                break;
            }
            if ctx.outcome.hit_row_cap {
                break;
            }
            ctx.vstack.push(root);
            ctx.on_path[root.index()] = true;
            ctx.dfs(root, root);
            ctx.on_path[root.index()] = false;
            ctx.vstack.pop();
            debug_assert!(ctx.vstack.is_empty() && ctx.estack.is_empty());
        }
        ctx.outcome
    }
}

// ── DFS state ─────────────────────────────────────────────────────────────────

struct DfsCtx<'g> {
    graph:    &'g TrailGraph,
    max_len:  f64,
    max_rows: usize,
    max_edge: f64,
    rows:     usize,
    in_scope: Vec<bool>,
    on_path:  Vec<bool>,
    vstack:   Vec<VertexId>,
    estack:   Vec<EdgeId>,
    length:   f64,
    outcome:  CycleOutcome,
}

impl DfsCtx<'_> {
    /// Expand from `at`; `root` is the cycle anchor (smallest vertex).
    fn dfs(&mut self, root: VertexId, at: VertexId) {
        let graph = self.graph;
        for (edge, far) in graph.incident(at) {
            if self.outcome.hit_row_cap {
                return;
            }
            self.rows += 1;
            if self.rows > self.max_rows {
                self.outcome.hit_row_cap = true;
                return;
            }
            let edge_len = graph.edge_length_km[edge.index()];
            if edge_len > self.max_edge || !self.in_scope[far.index()] {
                continue;
            }

            // ── Closing edge back to the root ─────────────────────────────
            if far == root {
                if self.estack.is_empty() || self.estack.last() == Some(&edge) {
                    continue; // the edge we arrived on, reversed
                }
                if self.length + edge_len > self.max_len {
                    continue;
                }
                if self.is_canonical(edge) {
                    let mut vertices = self.vstack.clone();
                    vertices.push(root);
                    let mut edges = self.estack.clone();
                    edges.push(edge);
                    self.outcome.cycles.push(GraphPath {
                        vertices,
                        edges,
                        length_km: self.length + edge_len,
                    });
                }
                continue;
            }

            // ── Forward expansion ─────────────────────────────────────────
            // Never descend below the root: every cycle is rooted at its
            // minimum vertex, so smaller ids belong to other roots.
            if far < root || self.on_path[far.index()] {
                continue;
            }
            if self.length + edge_len > self.max_len {
                continue;
            }

            self.vstack.push(far);
            self.estack.push(edge);
            self.on_path[far.index()] = true;
            self.length += edge_len;

            self.dfs(root, far);

            self.length -= edge_len;
            self.on_path[far.index()] = false;
            self.estack.pop();
            self.vstack.pop();
        }
    }

    /// One direction per undirected cycle: require the first interior
    /// vertex to be smaller than the last (edge-id order for the
    /// two-edge parallel case).
    fn is_canonical(&self, closing: EdgeId) -> bool {
        match self.vstack.len() {
            0 | 1 => false,
            2 => self.estack[0] < closing,
            _ => self.vstack[1] < self.vstack[self.vstack.len() - 1],
        }
    }
}
