//! Endpoint selection (Layer 3a): candidate start/end vertices per
//! component.
//!
//! Two modes, chosen by configuration:
//!
//! - **Manual**: user-supplied trailheads snapped to the nearest graph
//!   vertex within each entry's tolerance, restricted to the current
//!   component.  Entries with no match are reported, never fatal.
//! - **Automatic**: degree-1 vertices of the component, sorted by
//!   ascending distance to the component's bbox boundary (prefer vertices
//!   near the geographic edge), capped at `max_endpoints_per_component`.
//!
//! Both modes are deterministic; ties break on vertex id.

use tr_core::config::EndpointSelection as Mode;
use tr_core::{ComponentId, EngineConfig, GeoPoint, VertexId};
use tr_graph::{ComponentFinder, ComponentSummary, TrailGraph};

// ── EndpointSet ───────────────────────────────────────────────────────────────

/// Selected endpoints for one component, plus any trailhead misses.
#[derive(Clone, Debug, Default)]
pub struct EndpointSet {
    pub vertices: Vec<VertexId>,
    /// Names (or coordinates) of manual trailheads with no vertex within
    /// tolerance in this component.
    pub misses: Vec<String>,
}

// ── EndpointSelector ──────────────────────────────────────────────────────────

/// Layer 3a: pick candidate start/end vertices for a component.
pub struct EndpointSelector<'a> {
    graph:  &'a TrailGraph,
    config: &'a EngineConfig,
}

impl<'a> EndpointSelector<'a> {
    pub fn new(graph: &'a TrailGraph, config: &'a EngineConfig) -> Self {
        Self { graph, config }
    }

    pub fn select(&self, component: ComponentId, summary: &ComponentSummary) -> EndpointSet {
        match self.config.endpoint_selection {
            Mode::Manual    => self.select_manual(component),
            Mode::Automatic => self.select_automatic(component, summary),
        }
    }

    // ── Manual trailheads ─────────────────────────────────────────────────

    fn select_manual(&self, component: ComponentId) -> EndpointSet {
        let mut set = EndpointSet::default();
        for th in &self.config.trailheads {
            let pos = GeoPoint::new2d(th.lng, th.lat);
            let mut found = None;
            // Ascending-distance scan; stop once beyond tolerance.  Only
            // vertices of the current component count.
            for v in self.graph.nearest_vertices(pos) {
                let d = pos.distance_m(self.graph.vertex_pos[v.index()]);
                if d > th.tolerance_m {
                    break;
                }
                if self.graph.vertex_component[v.index()] == component {
                    found = Some(v);
                    break;
                }
            }
            match found {
                Some(v) => {
                    if !set.vertices.contains(&v) {
                        set.vertices.push(v);
                    }
                }
                None => set.misses.push(
                    th.name
                        .clone()
                        .unwrap_or_else(|| format!("({:.5}, {:.5})", th.lat, th.lng)),
                ),
            }
        }
        set
    }

    // ── Automatic boundary selection ──────────────────────────────────────

    fn select_automatic(&self, component: ComponentId, summary: &ComponentSummary) -> EndpointSet {
        let mut candidates: Vec<(f64, VertexId)> = ComponentFinder::members(self.graph, component)
            .into_iter()
            .filter(|v| self.graph.vertex_cnt[v.index()] == 1)
            .map(|v| {
                let d = summary.bbox.distance_to_boundary_m(self.graph.vertex_pos[v.index()]);
                (d, v)
            })
            .collect();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.truncate(self.config.max_endpoints_per_component);
        EndpointSet {
            vertices: candidates.into_iter().map(|(_, v)| v).collect(),
            misses:   Vec::new(),
        }
    }
}
