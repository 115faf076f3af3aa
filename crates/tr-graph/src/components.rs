//! Connected-component labelling (Layer 2c).
//!
//! Standard union-find over the undirected edge set.  Component labels are
//! dense and ordered by each component's smallest member vertex id, so the
//! partition — and the labels themselves — are stable under re-runs.

use serde::Serialize;

use tr_core::{BBox, ComponentId, VertexId};

use crate::graph::TrailGraph;

// ── ComponentSummary ──────────────────────────────────────────────────────────

/// Per-component statistics for reporting and route-generation gating.
#[derive(Clone, Debug, Serialize)]
pub struct ComponentSummary {
    pub id:           ComponentId,
    pub vertex_count: usize,
    pub edge_count:   usize,
    pub bbox:         BBox,
}

// ── ComponentFinder ───────────────────────────────────────────────────────────

/// Layer 2c: label the graph's connected components.
pub struct ComponentFinder;

impl ComponentFinder {
    /// Label every vertex in `graph` and return per-component summaries,
    /// ordered by component id.
    pub fn run(graph: &mut TrailGraph) -> Vec<ComponentSummary> {
        let n = graph.vertex_count();
        let mut parent: Vec<usize> = (0..n).collect();

        fn find(parent: &mut [usize], x: usize) -> usize {
            let mut root = x;
            while parent[root] != root {
                root = parent[root];
            }
            let mut cur = x;
            while parent[cur] != root {
                let next = parent[cur];
                parent[cur] = root;
                cur = next;
            }
            root
        }

        for e in 0..graph.edge_count() {
            let a = graph.edge_source[e].index();
            let b = graph.edge_target[e].index();
            let (ra, rb) = (find(&mut parent, a), find(&mut parent, b));
            if ra != rb {
                parent[ra.max(rb)] = ra.min(rb);
            }
        }

        // Roots in ascending vertex order → dense labels in that order.
        let mut label_of_root: Vec<Option<ComponentId>> = vec![None; n];
        let mut summaries: Vec<ComponentSummary> = Vec::new();
        for v in 0..n {
            let root = find(&mut parent, v);
            let label = *label_of_root[root].get_or_insert_with(|| {
                let id = ComponentId(summaries.len() as u32);
                summaries.push(ComponentSummary {
                    id,
                    vertex_count: 0,
                    edge_count:   0,
                    bbox:         BBox::empty(),
                });
                id
            });
            graph.vertex_component[v] = label;
            let s = &mut summaries[label.index()];
            s.vertex_count += 1;
            s.bbox.expand(graph.vertex_pos[v]);
        }

        for e in 0..graph.edge_count() {
            let label = graph.vertex_component[graph.edge_source[e].index()];
            summaries[label.index()].edge_count += 1;
        }

        summaries
    }

    /// All vertices belonging to `component`, in ascending id order.
    pub fn members(graph: &TrailGraph, component: ComponentId) -> Vec<VertexId> {
        (0..graph.vertex_count())
            .filter(|&v| graph.vertex_component[v] == component)
            .map(|v| VertexId(v as u32))
            .collect()
    }
}
