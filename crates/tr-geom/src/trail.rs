//! Trail, segment, and elevation entity records.
//!
//! These are plain data types passed by value between pipeline stages.
//! `RawTrail` is the ingestion-boundary shape (geometry may still be a
//! MultiLineString); `Trail` is the post-preprocessing shape (geometry is a
//! single simple LineString); `Segment` is the post-splitting, edge-level
//! unit consumed by the graph layer.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tr_core::{BBox, GeoPoint};

use crate::polyline::Polyline;

// ── Geometry ──────────────────────────────────────────────────────────────────

/// Input geometry: a single line, or a collection that Layer 1a flattens.
///
/// Mixed GeometryCollections at the boundary are normalised to `Multi` by
/// the reader (non-linear members are dropped there and counted).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Geometry {
    LineString(Polyline),
    MultiLineString(Vec<Polyline>),
}

impl Geometry {
    pub fn is_multi(&self) -> bool {
        matches!(self, Geometry::MultiLineString(_))
    }

    /// Total vertex count across all parts.
    pub fn point_count(&self) -> usize {
        match self {
            Geometry::LineString(l) => l.point_count(),
            Geometry::MultiLineString(parts) => parts.iter().map(Polyline::point_count).sum(),
        }
    }
}

// ── ElevationStats ────────────────────────────────────────────────────────────

/// Aggregated elevation statistics over a vertex sequence.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ElevationStats {
    pub gain_m: f64,
    pub loss_m: f64,
    pub min_m:  f64,
    pub max_m:  f64,
    pub avg_m:  f64,
}

impl ElevationStats {
    /// Recompute from geometry.  Lines with no vertices yield all-zero stats.
    pub fn of(line: &Polyline) -> Self {
        if line.is_empty() {
            return Self { gain_m: 0.0, loss_m: 0.0, min_m: 0.0, max_m: 0.0, avg_m: 0.0 };
        }
        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        for p in &line.points {
            min = min.min(p.elev);
            max = max.max(p.elev);
            sum += p.elev;
        }
        Self {
            gain_m: line.elevation_gain_m(),
            loss_m: line.elevation_loss_m(),
            min_m:  min,
            max_m:  max,
            avg_m:  sum / line.point_count() as f64,
        }
    }
}

// ── TrailAttributes ───────────────────────────────────────────────────────────

/// Descriptive attributes carried through unchanged from the source.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrailAttributes {
    pub trail_type: Option<String>,
    pub surface:    Option<String>,
    pub difficulty: Option<String>,
}

// ── RawTrail ──────────────────────────────────────────────────────────────────

/// An input trail as delivered by a `TrailSource`, before any cleaning.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RawTrail {
    /// Stable source identifier.
    pub id:     String,
    pub name:   String,
    pub region: String,
    pub osm_id: Option<i64>,
    #[serde(default)]
    pub attributes: TrailAttributes,
    /// Source key/value tags; `BTreeMap` for deterministic iteration order.
    #[serde(default)]
    pub source_tags: BTreeMap<String, String>,
    /// Pre-aggregated elevation stats, if the source provides them.
    pub elevation: Option<ElevationStats>,
    pub geometry: Geometry,
}

// ── Trail ─────────────────────────────────────────────────────────────────────

/// A cleaned trail: output of the preprocessor, input to the splitter.
///
/// Geometry is guaranteed simple, valid, and a single LineString.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trail {
    pub id:     String,
    pub name:   String,
    pub region: String,
    pub osm_id: Option<i64>,
    pub attributes:  TrailAttributes,
    pub source_tags: BTreeMap<String, String>,
    pub elevation:   ElevationStats,
    pub geometry:    Polyline,
}

impl Trail {
    pub fn bbox(&self) -> BBox {
        self.geometry.bbox()
    }

    pub fn length_km(&self) -> f64 {
        self.geometry.length_km()
    }
}

// ── Segment ───────────────────────────────────────────────────────────────────

/// A trail split at intersections: the edge-level unit of the routing graph.
///
/// Segment ids are `{parent_trail_id}#{segment_index}`, unique even when
/// multiple segments share a parent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub id:              String,
    pub name:            String,
    pub region:          String,
    pub parent_trail_id: String,
    pub segment_index:   u32,
    pub osm_id:          Option<i64>,
    pub attributes:  TrailAttributes,
    pub source_tags: BTreeMap<String, String>,
    pub elevation:   ElevationStats,
    pub length_km:   f64,
    pub bbox:        BBox,
    pub geometry:    Polyline,
}

impl Segment {
    /// Build a segment from one split piece of a parent trail, recomputing
    /// bbox, length, and elevation stats over the new vertex sequence.
    pub fn from_piece(parent: &Trail, segment_index: u32, geometry: Polyline) -> Self {
        Self {
            id:              format!("{}#{}", parent.id, segment_index),
            name:            parent.name.clone(),
            region:          parent.region.clone(),
            parent_trail_id: parent.id.clone(),
            segment_index,
            osm_id:          parent.osm_id,
            attributes:      parent.attributes.clone(),
            source_tags:     parent.source_tags.clone(),
            elevation:       ElevationStats::of(&geometry),
            length_km:       geometry.length_km(),
            bbox:            geometry.bbox(),
            geometry,
        }
    }

    pub fn start(&self) -> Option<GeoPoint> {
        self.geometry.first()
    }

    pub fn end(&self) -> Option<GeoPoint> {
        self.geometry.last()
    }
}
