//! CSV output backend.
//!
//! Creates five files in the target directory, one per artifact table.
//! Geometry columns carry WKT (`LINESTRING Z …`).

use std::fs::File;
use std::path::Path;

use csv::Writer;

use tr_core::RunSummary;
use tr_geom::{Segment, Trail};
use tr_graph::TrailGraph;
use tr_route::RouteRecommendation;

use crate::error::OutputResult;
use crate::wkt;
use crate::writer::ArtifactWriter;

/// Writes the artifact tables as CSV files.
pub struct CsvArtifactWriter {
    trails:   Writer<File>,
    segments: Writer<File>,
    vertices: Writer<File>,
    edges:    Writer<File>,
    routes:   Writer<File>,
    summary_path: std::path::PathBuf,
    finished: bool,
}

impl CsvArtifactWriter {
    /// Open (or create) the five CSV files in `dir` and write header rows.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let mut trails = Writer::from_path(dir.join("trails.csv"))?;
        trails.write_record([
            "id", "name", "region", "length_km", "elevation_gain_m", "elevation_loss_m", "wkt",
        ])?;

        let mut segments = Writer::from_path(dir.join("segments.csv"))?;
        segments.write_record([
            "id", "parent_trail_id", "segment_index", "name", "region",
            "length_km", "elevation_gain_m", "elevation_loss_m", "wkt",
        ])?;

        let mut vertices = Writer::from_path(dir.join("vertices.csv"))?;
        vertices.write_record(["id", "lng", "lat", "elevation", "cnt", "component_id"])?;

        let mut edges = Writer::from_path(dir.join("edges.csv"))?;
        edges.write_record([
            "id", "source", "target", "length_km", "elevation_gain_m", "elevation_loss_m",
            "cost", "reverse_cost", "parent_trail_id", "wkt",
        ])?;

        let mut routes = Writer::from_path(dir.join("routes.csv"))?;
        routes.write_record([
            "uuid", "region", "pattern", "route_shape",
            "target_distance_km", "target_elevation_gain_m",
            "recommended_length_km", "total_trail_distance_km",
            "elevation_gain_m", "route_score", "similarity_score", "trail_names", "wkt",
        ])?;

        Ok(Self {
            trails,
            segments,
            vertices,
            edges,
            routes,
            summary_path: dir.join("summary.json"),
            finished: false,
        })
    }
}

impl ArtifactWriter for CsvArtifactWriter {
    fn write_trails(&mut self, trails: &[Trail]) -> OutputResult<()> {
        for t in trails {
            self.trails.write_record(&[
                t.id.clone(),
                t.name.clone(),
                t.region.clone(),
                t.length_km().to_string(),
                t.elevation.gain_m.to_string(),
                t.elevation.loss_m.to_string(),
                wkt::linestring_z(&t.geometry),
            ])?;
        }
        Ok(())
    }

    fn write_segments(&mut self, segments: &[Segment]) -> OutputResult<()> {
        for s in segments {
            self.segments.write_record(&[
                s.id.clone(),
                s.parent_trail_id.clone(),
                s.segment_index.to_string(),
                s.name.clone(),
                s.region.clone(),
                s.length_km.to_string(),
                s.elevation.gain_m.to_string(),
                s.elevation.loss_m.to_string(),
                wkt::linestring_z(&s.geometry),
            ])?;
        }
        Ok(())
    }

    fn write_graph(&mut self, graph: &TrailGraph) -> OutputResult<()> {
        for v in 0..graph.vertex_count() {
            let p = graph.vertex_pos[v];
            self.vertices.write_record(&[
                (v + 1).to_string(),
                p.lng.to_string(),
                p.lat.to_string(),
                p.elev.to_string(),
                graph.vertex_cnt[v].to_string(),
                (graph.vertex_component[v].0 + 1).to_string(),
            ])?;
        }
        for e in 0..graph.edge_count() {
            self.edges.write_record(&[
                (e + 1).to_string(),
                (graph.edge_source[e].0 + 1).to_string(),
                (graph.edge_target[e].0 + 1).to_string(),
                graph.edge_length_km[e].to_string(),
                graph.edge_gain_m[e].to_string(),
                graph.edge_loss_m[e].to_string(),
                graph.edge_cost[e].to_string(),
                graph.edge_reverse_cost[e].to_string(),
                graph.edge_parent_trail[e].clone(),
                wkt::linestring_z(&graph.edge_geometry[e]),
            ])?;
        }
        Ok(())
    }

    fn write_routes(&mut self, routes: &[RouteRecommendation]) -> OutputResult<()> {
        for r in routes {
            self.routes.write_record(&[
                r.uuid.clone(),
                r.region.clone(),
                r.pattern_name.clone(),
                r.shape.as_str().to_owned(),
                r.target_distance_km.to_string(),
                r.target_elevation_gain_m.to_string(),
                r.length_km.to_string(),
                r.total_trail_distance_km.map(|v| v.to_string()).unwrap_or_default(),
                r.elevation_gain_m.to_string(),
                r.route_score.to_string(),
                r.similarity_score.to_string(),
                r.trail_names.join(";"),
                wkt::route_geometry(&r.geometry),
            ])?;
        }
        Ok(())
    }

    fn write_summary(&mut self, summary: &RunSummary) -> OutputResult<()> {
        let out = File::create(&self.summary_path)?;
        serde_json::to_writer_pretty(out, summary)?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.trails.flush()?;
        self.segments.flush()?;
        self.vertices.flush()?;
        self.edges.flush()?;
        self.routes.flush()?;
        Ok(())
    }
}
