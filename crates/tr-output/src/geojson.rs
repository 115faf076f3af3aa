//! GeoJSON boundary: trail ingestion and artifact writing.
//!
//! Coordinates are `[lng, lat, elev]` (WGS-84, elevation preserved).  A
//! missing third ordinate reads as elevation 0 per the ingestion contract.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use serde_json::{Value, json};

use tr_core::{GeoPoint, RunSummary};
use tr_geom::{Geometry, Polyline, RawTrail, Segment, Trail, TrailAttributes};
use tr_graph::TrailGraph;
use tr_route::{RouteGeometry, RouteRecommendation};

use crate::error::{OutputError, OutputResult};
use crate::writer::ArtifactWriter;

// ── Reading ───────────────────────────────────────────────────────────────────

/// Read `RawTrail`s from a GeoJSON FeatureCollection.
///
/// Only LineString and MultiLineString features are trails; features with
/// other geometry types are skipped (the preprocessor accounts for bad
/// linework, but points and polygons were never trails to begin with).
pub fn read_trails<R: Read>(reader: R) -> OutputResult<Vec<RawTrail>> {
    let root: Value = serde_json::from_reader(reader)?;
    let features = root
        .get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| OutputError::InvalidGeoJson("missing features array".into()))?;

    let mut trails = Vec::with_capacity(features.len());
    for (index, feature) in features.iter().enumerate() {
        let Some(geometry) = feature.get("geometry") else { continue };
        let geom_type = geometry.get("type").and_then(Value::as_str).unwrap_or("");
        let coords = geometry.get("coordinates");

        let parsed = match (geom_type, coords) {
            ("LineString", Some(c)) => Some(Geometry::LineString(parse_line(c)?)),
            ("MultiLineString", Some(c)) => {
                let parts = c
                    .as_array()
                    .ok_or_else(|| OutputError::InvalidGeoJson("MultiLineString coordinates must be an array".into()))?
                    .iter()
                    .map(parse_line)
                    .collect::<OutputResult<Vec<_>>>()?;
                Some(Geometry::MultiLineString(parts))
            }
            _ => None,
        };
        let Some(geometry) = parsed else { continue };

        let props = feature.get("properties").and_then(Value::as_object);
        let get_str = |key: &str| -> Option<String> {
            props
                .and_then(|p| p.get(key))
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
        };

        let id = get_str("id")
            .or_else(|| feature.get("id").and_then(Value::as_str).map(str::to_owned))
            .unwrap_or_else(|| format!("trail-{index}"));
        let name = get_str("name").unwrap_or_else(|| id.clone());

        let mut source_tags = BTreeMap::new();
        if let Some(p) = props {
            for (k, v) in p {
                if matches!(k.as_str(), "id" | "name" | "region" | "osm_id" | "trail_type" | "surface" | "difficulty") {
                    continue;
                }
                if let Value::String(s) = v {
                    source_tags.insert(k.clone(), s.clone());
                }
            }
        }

        trails.push(RawTrail {
            id,
            name,
            region: get_str("region").unwrap_or_default(),
            osm_id: props
                .and_then(|p| p.get("osm_id"))
                .and_then(Value::as_i64),
            attributes: TrailAttributes {
                trail_type: get_str("trail_type"),
                surface:    get_str("surface"),
                difficulty: get_str("difficulty"),
            },
            source_tags,
            elevation: None,
            geometry,
        });
    }
    Ok(trails)
}

fn parse_line(coords: &Value) -> OutputResult<Polyline> {
    let positions = coords
        .as_array()
        .ok_or_else(|| OutputError::InvalidGeoJson("LineString coordinates must be an array".into()))?;
    let mut points = Vec::with_capacity(positions.len());
    for pos in positions {
        let nums = pos
            .as_array()
            .ok_or_else(|| OutputError::InvalidGeoJson("position must be an array".into()))?;
        if nums.len() < 2 {
            return Err(OutputError::InvalidGeoJson("position needs lng and lat".into()));
        }
        let lng = nums[0].as_f64().unwrap_or(f64::NAN);
        let lat = nums[1].as_f64().unwrap_or(f64::NAN);
        let elev = nums.get(2).and_then(Value::as_f64).unwrap_or(0.0);
        points.push(GeoPoint::new(lng, lat, elev));
    }
    Ok(Polyline::new(points))
}

// ── Writing ───────────────────────────────────────────────────────────────────

/// Writes each artifact as a GeoJSON FeatureCollection (plus
/// `summary.json`) in the target directory.
pub struct GeoJsonWriter {
    dir:      PathBuf,
    finished: bool,
}

impl GeoJsonWriter {
    pub fn new(dir: &Path) -> Self {
        Self { dir: dir.to_path_buf(), finished: false }
    }

    fn write_collection(&self, file: &str, features: Vec<Value>) -> OutputResult<()> {
        let out = File::create(self.dir.join(file))?;
        let mut w = BufWriter::new(out);
        serde_json::to_writer(
            &mut w,
            &json!({ "type": "FeatureCollection", "features": features }),
        )?;
        w.flush()?;
        Ok(())
    }
}

fn line_coords(line: &Polyline) -> Value {
    Value::Array(
        line.points
            .iter()
            .map(|p| json!([p.lng, p.lat, p.elev]))
            .collect(),
    )
}

fn geometry_value(geometry: &RouteGeometry) -> Value {
    match geometry {
        RouteGeometry::LineString(line) => json!({
            "type": "LineString",
            "coordinates": line_coords(line),
        }),
        RouteGeometry::MultiLineString(parts) => json!({
            "type": "MultiLineString",
            "coordinates": Value::Array(parts.iter().map(line_coords).collect()),
        }),
    }
}

impl ArtifactWriter for GeoJsonWriter {
    fn write_trails(&mut self, trails: &[Trail]) -> OutputResult<()> {
        let features = trails
            .iter()
            .map(|t| {
                json!({
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": line_coords(&t.geometry) },
                    "properties": {
                        "id": t.id,
                        "name": t.name,
                        "region": t.region,
                        "osm_id": t.osm_id,
                        "trail_type": t.attributes.trail_type,
                        "surface": t.attributes.surface,
                        "difficulty": t.attributes.difficulty,
                        "length_km": t.length_km(),
                        "elevation_gain_m": t.elevation.gain_m,
                        "elevation_loss_m": t.elevation.loss_m,
                    },
                })
            })
            .collect();
        self.write_collection("trails.geojson", features)
    }

    fn write_segments(&mut self, segments: &[Segment]) -> OutputResult<()> {
        let features = segments
            .iter()
            .map(|s| {
                json!({
                    "type": "Feature",
                    "geometry": { "type": "LineString", "coordinates": line_coords(&s.geometry) },
                    "properties": {
                        "id": s.id,
                        "parent_trail_id": s.parent_trail_id,
                        "segment_index": s.segment_index,
                        "name": s.name,
                        "region": s.region,
                        "length_km": s.length_km,
                        "elevation_gain_m": s.elevation.gain_m,
                        "elevation_loss_m": s.elevation.loss_m,
                    },
                })
            })
            .collect();
        self.write_collection("segments.geojson", features)
    }

    fn write_graph(&mut self, graph: &TrailGraph) -> OutputResult<()> {
        let vertices = (0..graph.vertex_count())
            .map(|v| {
                let p = graph.vertex_pos[v];
                json!({
                    "type": "Feature",
                    "geometry": { "type": "Point", "coordinates": [p.lng, p.lat, p.elev] },
                    "properties": {
                        "id": v + 1,
                        "cnt": graph.vertex_cnt[v],
                        "component_id": graph.vertex_component[v].0 + 1,
                    },
                })
            })
            .collect();
        self.write_collection("vertices.geojson", vertices)?;

        let edges = (0..graph.edge_count())
            .map(|e| {
                json!({
                    "type": "Feature",
                    "geometry": {
                        "type": "LineString",
                        "coordinates": line_coords(&graph.edge_geometry[e]),
                    },
                    "properties": {
                        "id": e + 1,
                        "source": graph.edge_source[e].0 + 1,
                        "target": graph.edge_target[e].0 + 1,
                        "length_km": graph.edge_length_km[e],
                        "elevation_gain_m": graph.edge_gain_m[e],
                        "elevation_loss_m": graph.edge_loss_m[e],
                        "cost": graph.edge_cost[e],
                        "reverse_cost": graph.edge_reverse_cost[e],
                        "parent_trail_id": graph.edge_parent_trail[e],
                    },
                })
            })
            .collect();
        self.write_collection("edges.geojson", edges)
    }

    fn write_routes(&mut self, routes: &[RouteRecommendation]) -> OutputResult<()> {
        let features = routes
            .iter()
            .map(|r| {
                json!({
                    "type": "Feature",
                    "geometry": geometry_value(&r.geometry),
                    "properties": {
                        "uuid": r.uuid,
                        "region": r.region,
                        "pattern": r.pattern_name,
                        "route_shape": r.shape.as_str(),
                        "target_distance_km": r.target_distance_km,
                        "target_elevation_gain_m": r.target_elevation_gain_m,
                        "recommended_length_km": r.length_km,
                        "total_trail_distance_km": r.total_trail_distance_km,
                        "elevation_gain_m": r.elevation_gain_m,
                        "elevation_loss_m": r.elevation_loss_m,
                        "route_score": r.route_score,
                        "similarity_score": r.similarity_score,
                        "trail_names": r.trail_names,
                        "route_edges": r.edge_ids.iter().map(|e| e.0 + 1).collect::<Vec<_>>(),
                        "route_path": r.vertex_ids.iter().map(|v| v.0 + 1).collect::<Vec<_>>(),
                    },
                })
            })
            .collect();
        self.write_collection("routes.geojson", features)
    }

    fn write_summary(&mut self, summary: &RunSummary) -> OutputResult<()> {
        let out = File::create(self.dir.join("summary.json"))?;
        let mut w = BufWriter::new(out);
        serde_json::to_writer_pretty(&mut w, summary)?;
        w.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        self.finished = true;
        Ok(())
    }
}
