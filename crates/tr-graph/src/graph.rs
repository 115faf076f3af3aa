//! Trail routing graph and builder.
//!
//! # Data layout
//!
//! The graph uses **Compressed Sparse Row (CSR)** format for adjacency.
//! Edges are undirected (one `EdgeId` per trail segment) but each edge
//! contributes two half-edges, so for a `VertexId v` the incident edges
//! occupy the slice:
//!
//! ```text
//! adj_edge[ adj_start[v] .. adj_start[v+1] ]   // EdgeId per half-edge
//! adj_to  [ adj_start[v] .. adj_start[v+1] ]   // far endpoint per half-edge
//! ```
//!
//! All edge attribute arrays (`edge_source`, `edge_target`, `edge_length_km`,
//! `edge_gain_m`, …) are indexed by `EdgeId`.  Iteration over a vertex's
//! incident edges is a contiguous memory scan — ideal for Dijkstra's inner
//! loop.
//!
//! # Spatial index
//!
//! An R-tree (via `rstar`) maps `(lng, lat)` to the nearest `VertexId`.
//! Used by the endpoint selector to snap manual trailheads to graph
//! vertices.

use rstar::{AABB, PointDistance, RTree, RTreeObject};

use tr_core::{BBox, ComponentId, EdgeId, GeoPoint, VertexId};
use tr_geom::Polyline;

// ── R-tree vertex entry ───────────────────────────────────────────────────────

/// Entry stored in the R-tree spatial index: a 2D `[lng, lat]` point with
/// the associated `VertexId`.
#[derive(Clone)]
#[derive(Debug)]
struct VertexEntry {
    point: [f64; 2], // [lng, lat]
    id:    VertexId,
}

impl RTreeObject for VertexEntry {
    type Envelope = AABB<[f64; 2]>;
    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}

impl PointDistance for VertexEntry {
    /// Squared Euclidean distance in degree space.  Sufficient for
    /// nearest-vertex ranking at regional extents; the caller re-measures
    /// the winner in metres before applying a tolerance.
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dlng = self.point[0] - point[0];
        let dlat = self.point[1] - point[1];
        dlng * dlng + dlat * dlat
    }
}

// ── Vertex classification ─────────────────────────────────────────────────────

/// Degree-derived vertex role.
#[derive(Copy, Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VertexClass {
    /// cnt = 1 — a trail end.
    Endpoint,
    /// cnt = 2 — a pass-through join.
    Connector,
    /// cnt ≥ 3 — a true trail intersection.
    Intersection,
}

// ── TrailGraph ────────────────────────────────────────────────────────────────

/// Undirected trail graph in CSR format plus a spatial index for trailhead
/// snapping.
///
/// All fields are `pub` for direct indexed access on hot paths.  Do not
/// construct directly; use [`TrailGraphBuilder`].
#[derive(Debug)]
pub struct TrailGraph {
    // ── Vertex data (indexed by VertexId) ─────────────────────────────────
    /// Geographic position (with clustered mean elevation) of each vertex.
    pub vertex_pos: Vec<GeoPoint>,

    /// Incident-edge count (`cnt`).  Always consistent with the edge arrays.
    pub vertex_cnt: Vec<u32>,

    /// Connected-component label; `ComponentId::INVALID` until
    /// [`ComponentFinder`](crate::ComponentFinder) has run.
    pub vertex_component: Vec<ComponentId>,

    // ── CSR half-edge adjacency ───────────────────────────────────────────
    /// CSR row pointer.  Length = `vertex_count + 1`.
    pub adj_start: Vec<u32>,
    /// EdgeId of each half-edge, grouped by owning vertex.
    pub adj_edge: Vec<EdgeId>,
    /// Far endpoint of each half-edge.
    pub adj_to: Vec<VertexId>,

    // ── Edge data (indexed by EdgeId) ─────────────────────────────────────
    pub edge_source:       Vec<VertexId>,
    pub edge_target:       Vec<VertexId>,
    pub edge_length_km:    Vec<f64>,
    /// Cumulative elevation gain walking source → target.
    pub edge_gain_m:       Vec<f64>,
    /// Cumulative elevation loss walking source → target.
    pub edge_loss_m:       Vec<f64>,
    /// Forward traversal cost.  Equal to `edge_length_km`.
    pub edge_cost:         Vec<f64>,
    /// Reverse traversal cost.  Trails are never one-way, so this equals
    /// `edge_cost`; kept as a separate array for the output contract.
    pub edge_reverse_cost: Vec<f64>,
    /// Full segment geometry, oriented source → target.
    pub edge_geometry:     Vec<Polyline>,
    pub edge_segment_id:   Vec<String>,
    pub edge_parent_trail: Vec<String>,
    /// Display name of the owning trail (route naming + Jaccard dedup).
    pub edge_trail_name:   Vec<String>,

    spatial_idx: RTree<VertexEntry>,
}

impl TrailGraph {
    /// Construct an empty graph with no vertices or edges.
    pub fn empty() -> Self {
        TrailGraphBuilder::new().build()
    }

    // ── Graph dimensions ──────────────────────────────────────────────────

    pub fn vertex_count(&self) -> usize {
        self.vertex_pos.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_source.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertex_pos.is_empty()
    }

    // ── Graph traversal ───────────────────────────────────────────────────

    /// Iterator over `(EdgeId, far endpoint)` for all edges incident to
    /// `vertex`.  This is a contiguous index range — no heap allocation.
    #[inline]
    pub fn incident(&self, vertex: VertexId) -> impl Iterator<Item = (EdgeId, VertexId)> + '_ {
        let start = self.adj_start[vertex.index()] as usize;
        let end   = self.adj_start[vertex.index() + 1] as usize;
        (start..end).map(move |i| (self.adj_edge[i], self.adj_to[i]))
    }

    /// Undirected degree of `vertex` — identical to `vertex_cnt`.
    #[inline]
    pub fn degree(&self, vertex: VertexId) -> u32 {
        self.vertex_cnt[vertex.index()]
    }

    /// The endpoint of `edge` that is not `vertex`.
    #[inline]
    pub fn edge_other(&self, edge: EdgeId, vertex: VertexId) -> VertexId {
        let s = self.edge_source[edge.index()];
        if s == vertex { self.edge_target[edge.index()] } else { s }
    }

    /// Elevation gained traversing `edge` starting from `from`.
    ///
    /// Walking against the stored orientation swaps gain and loss.
    #[inline]
    pub fn gain_along(&self, edge: EdgeId, from: VertexId) -> f64 {
        if self.edge_source[edge.index()] == from {
            self.edge_gain_m[edge.index()]
        } else {
            self.edge_loss_m[edge.index()]
        }
    }

    /// Elevation lost traversing `edge` starting from `from`.
    #[inline]
    pub fn loss_along(&self, edge: EdgeId, from: VertexId) -> f64 {
        if self.edge_source[edge.index()] == from {
            self.edge_loss_m[edge.index()]
        } else {
            self.edge_gain_m[edge.index()]
        }
    }

    pub fn vertex_class(&self, vertex: VertexId) -> VertexClass {
        match self.vertex_cnt[vertex.index()] {
            0 | 1 => VertexClass::Endpoint,
            2     => VertexClass::Connector,
            _     => VertexClass::Intersection,
        }
    }

    /// Bounding box over all vertex positions.
    pub fn bbox(&self) -> BBox {
        BBox::from_points(self.vertex_pos.iter().copied())
    }

    // ── Spatial queries ───────────────────────────────────────────────────

    /// Nearest vertex to `pos` and its distance in metres.
    ///
    /// Returns `None` only if the graph has no vertices.
    pub fn nearest_vertex(&self, pos: GeoPoint) -> Option<(VertexId, f64)> {
        self.spatial_idx
            .nearest_neighbor(&[pos.lng, pos.lat])
            .map(|e| {
                let v = e.id;
                (v, pos.distance_m(self.vertex_pos[v.index()]))
            })
    }

    /// Vertices near `pos` in ascending distance order, for callers that
    /// need to skip candidates (e.g. wrong component).
    pub fn nearest_vertices(&self, pos: GeoPoint) -> impl Iterator<Item = VertexId> + '_ {
        self.spatial_idx
            .nearest_neighbor_iter(&[pos.lng, pos.lat])
            .map(|e| e.id)
    }
}

// ── TrailGraphBuilder ─────────────────────────────────────────────────────────

/// Construct a [`TrailGraph`] incrementally, then call [`build`](Self::build).
///
/// The builder accepts vertices and undirected edges in any order; edge
/// attributes (length, gain, loss, costs) are derived from the supplied
/// geometry.  `build()` constructs the CSR arrays and bulk-loads the R-tree.
pub struct TrailGraphBuilder {
    vertices:  Vec<GeoPoint>,
    raw_edges: Vec<RawEdge>,
}

struct RawEdge {
    source:       VertexId,
    target:       VertexId,
    geometry:     Polyline,
    segment_id:   String,
    parent_trail: String,
    trail_name:   String,
}

impl TrailGraphBuilder {
    pub fn new() -> Self {
        Self { vertices: Vec::new(), raw_edges: Vec::new() }
    }

    /// Pre-allocate for the expected vertex and edge counts.
    pub fn with_capacity(vertices: usize, edges: usize) -> Self {
        Self {
            vertices:  Vec::with_capacity(vertices),
            raw_edges: Vec::with_capacity(edges),
        }
    }

    /// Add a vertex and return its `VertexId` (sequential from 0).
    ///
    /// The caller is responsible for id-order determinism: vertices must be
    /// added in the final (lng, lat)-sorted order.
    pub fn add_vertex(&mut self, pos: GeoPoint) -> VertexId {
        let id = VertexId(self.vertices.len() as u32);
        self.vertices.push(pos);
        id
    }

    /// Add an undirected edge carrying its segment geometry (oriented
    /// source → target) and provenance.
    pub fn add_edge(
        &mut self,
        source: VertexId,
        target: VertexId,
        geometry: Polyline,
        segment_id: impl Into<String>,
        parent_trail: impl Into<String>,
        trail_name: impl Into<String>,
    ) -> EdgeId {
        let id = EdgeId(self.raw_edges.len() as u32);
        self.raw_edges.push(RawEdge {
            source,
            target,
            geometry,
            segment_id:   segment_id.into(),
            parent_trail: parent_trail.into(),
            trail_name:   trail_name.into(),
        });
        id
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edge_count(&self) -> usize {
        self.raw_edges.len()
    }

    pub fn vertex_pos(&self, id: VertexId) -> GeoPoint {
        self.vertices[id.index()]
    }

    /// Consume the builder and produce a [`TrailGraph`].
    ///
    /// Edge ids keep insertion order (the noder inserts in its canonical
    /// sort order).  Time complexity: O(E) CSR build + O(V log V) R-tree
    /// bulk load.
    pub fn build(self) -> TrailGraph {
        let vertex_count = self.vertices.len();
        let edge_count   = self.raw_edges.len();

        let mut edge_source       = Vec::with_capacity(edge_count);
        let mut edge_target       = Vec::with_capacity(edge_count);
        let mut edge_length_km    = Vec::with_capacity(edge_count);
        let mut edge_gain_m       = Vec::with_capacity(edge_count);
        let mut edge_loss_m       = Vec::with_capacity(edge_count);
        let mut edge_geometry     = Vec::with_capacity(edge_count);
        let mut edge_segment_id   = Vec::with_capacity(edge_count);
        let mut edge_parent_trail = Vec::with_capacity(edge_count);
        let mut edge_trail_name   = Vec::with_capacity(edge_count);

        for e in &self.raw_edges {
            edge_source.push(e.source);
            edge_target.push(e.target);
            edge_length_km.push(e.geometry.length_km());
            edge_gain_m.push(e.geometry.elevation_gain_m());
            edge_loss_m.push(e.geometry.elevation_loss_m());
            edge_segment_id.push(e.segment_id.clone());
            edge_parent_trail.push(e.parent_trail.clone());
            edge_trail_name.push(e.trail_name.clone());
        }
        for e in self.raw_edges {
            edge_geometry.push(e.geometry);
        }
        let edge_cost         = edge_length_km.clone();
        let edge_reverse_cost = edge_length_km.clone();

        // ── CSR row pointer over half-edges ───────────────────────────────
        let mut adj_start = vec![0u32; vertex_count + 1];
        for i in 0..edge_count {
            adj_start[edge_source[i].index() + 1] += 1;
            adj_start[edge_target[i].index() + 1] += 1;
        }
        for v in 1..=vertex_count {
            adj_start[v] += adj_start[v - 1];
        }
        debug_assert_eq!(adj_start[vertex_count] as usize, edge_count * 2);

        let mut cursor: Vec<u32> = adj_start[..vertex_count].to_vec();
        let mut adj_edge = vec![EdgeId::INVALID; edge_count * 2];
        let mut adj_to   = vec![VertexId::INVALID; edge_count * 2];
        for i in 0..edge_count {
            let (s, t) = (edge_source[i], edge_target[i]);
            let slot = cursor[s.index()] as usize;
            adj_edge[slot] = EdgeId(i as u32);
            adj_to[slot] = t;
            cursor[s.index()] += 1;

            let slot = cursor[t.index()] as usize;
            adj_edge[slot] = EdgeId(i as u32);
            adj_to[slot] = s;
            cursor[t.index()] += 1;
        }

        let mut vertex_cnt = vec![0u32; vertex_count];
        for i in 0..edge_count {
            vertex_cnt[edge_source[i].index()] += 1;
            vertex_cnt[edge_target[i].index()] += 1;
        }

        // Bulk-load R-tree for O(V log V) construction.
        let entries: Vec<VertexEntry> = self
            .vertices
            .iter()
            .enumerate()
            .map(|(i, &pos)| VertexEntry {
                point: [pos.lng, pos.lat],
                id:    VertexId(i as u32),
            })
            .collect();
        let spatial_idx = RTree::bulk_load(entries);

        TrailGraph {
            vertex_pos: self.vertices,
            vertex_cnt,
            vertex_component: vec![ComponentId::INVALID; vertex_count],
            adj_start,
            adj_edge,
            adj_to,
            edge_source,
            edge_target,
            edge_length_km,
            edge_gain_m,
            edge_loss_m,
            edge_cost,
            edge_reverse_cost,
            edge_geometry,
            edge_segment_id,
            edge_parent_trail,
            edge_trail_name,
            spatial_idx,
        }
    }
}

impl Default for TrailGraphBuilder {
    fn default() -> Self {
        Self::new()
    }
}
