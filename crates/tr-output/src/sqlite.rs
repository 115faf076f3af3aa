//! SQLite output backend (feature `sqlite`).
//!
//! Creates a single `trailrec.db` in the target directory holding all five
//! artifact tables plus the run summary as JSON.  Geometry columns carry
//! WKT.

use std::path::Path;

use rusqlite::Connection;

use tr_core::RunSummary;
use tr_geom::{Segment, Trail};
use tr_graph::TrailGraph;
use tr_route::RouteRecommendation;

use crate::error::OutputResult;
use crate::wkt;
use crate::writer::ArtifactWriter;

/// Writes the artifact tables to an SQLite database.
pub struct SqliteWriter {
    conn:     Connection,
    finished: bool,
}

impl SqliteWriter {
    /// Open (or create) `trailrec.db` in `dir` and initialise the schema.
    pub fn new(dir: &Path) -> OutputResult<Self> {
        let conn = Connection::open(dir.join("trailrec.db"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous  = NORMAL;
             CREATE TABLE IF NOT EXISTS trails (
                 id                TEXT PRIMARY KEY,
                 name              TEXT NOT NULL,
                 region            TEXT NOT NULL,
                 length_km         REAL NOT NULL,
                 elevation_gain_m  REAL NOT NULL,
                 elevation_loss_m  REAL NOT NULL,
                 geometry_wkt      TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS segments (
                 id                TEXT PRIMARY KEY,
                 parent_trail_id   TEXT NOT NULL,
                 segment_index     INTEGER NOT NULL,
                 name              TEXT NOT NULL,
                 region            TEXT NOT NULL,
                 length_km         REAL NOT NULL,
                 elevation_gain_m  REAL NOT NULL,
                 elevation_loss_m  REAL NOT NULL,
                 geometry_wkt      TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS vertices (
                 id           INTEGER PRIMARY KEY,
                 lng          REAL NOT NULL,
                 lat          REAL NOT NULL,
                 elevation    REAL NOT NULL,
                 cnt          INTEGER NOT NULL,
                 component_id INTEGER NOT NULL
             );
             CREATE TABLE IF NOT EXISTS edges (
                 id               INTEGER PRIMARY KEY,
                 source           INTEGER NOT NULL,
                 target           INTEGER NOT NULL,
                 length_km        REAL NOT NULL,
                 elevation_gain_m REAL NOT NULL,
                 elevation_loss_m REAL NOT NULL,
                 cost             REAL NOT NULL,
                 reverse_cost     REAL NOT NULL,
                 parent_trail_id  TEXT NOT NULL,
                 geometry_wkt     TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS route_recommendations (
                 uuid                    TEXT PRIMARY KEY,
                 region                  TEXT NOT NULL,
                 pattern                 TEXT NOT NULL,
                 route_shape             TEXT NOT NULL,
                 target_distance_km      REAL NOT NULL,
                 target_elevation_gain_m REAL NOT NULL,
                 recommended_length_km   REAL NOT NULL,
                 total_trail_distance_km REAL,
                 elevation_gain_m        REAL NOT NULL,
                 elevation_loss_m        REAL NOT NULL,
                 route_score             REAL NOT NULL,
                 similarity_score        REAL NOT NULL,
                 trail_names             TEXT NOT NULL,
                 route_edges             TEXT NOT NULL,
                 route_path              TEXT NOT NULL,
                 geometry_wkt            TEXT NOT NULL
             );
             CREATE TABLE IF NOT EXISTS run_summary (
                 id      INTEGER PRIMARY KEY CHECK (id = 1),
                 summary TEXT NOT NULL
             );",
        )?;

        Ok(Self { conn, finished: false })
    }
}

impl ArtifactWriter for SqliteWriter {
    fn write_trails(&mut self, trails: &[Trail]) -> OutputResult<()> {
        if trails.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO trails \
                 (id, name, region, length_km, elevation_gain_m, elevation_loss_m, geometry_wkt) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for t in trails {
                stmt.execute(rusqlite::params![
                    t.id,
                    t.name,
                    t.region,
                    t.length_km(),
                    t.elevation.gain_m,
                    t.elevation.loss_m,
                    wkt::linestring_z(&t.geometry),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_segments(&mut self, segments: &[Segment]) -> OutputResult<()> {
        if segments.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO segments \
                 (id, parent_trail_id, segment_index, name, region, length_km, \
                  elevation_gain_m, elevation_loss_m, geometry_wkt) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            for s in segments {
                stmt.execute(rusqlite::params![
                    s.id,
                    s.parent_trail_id,
                    s.segment_index,
                    s.name,
                    s.region,
                    s.length_km,
                    s.elevation.gain_m,
                    s.elevation.loss_m,
                    wkt::linestring_z(&s.geometry),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_graph(&mut self, graph: &TrailGraph) -> OutputResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO vertices (id, lng, lat, elevation, cnt, component_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            )?;
            for v in 0..graph.vertex_count() {
                let p = graph.vertex_pos[v];
                stmt.execute(rusqlite::params![
                    (v + 1) as i64,
                    p.lng,
                    p.lat,
                    p.elev,
                    graph.vertex_cnt[v],
                    (graph.vertex_component[v].0 + 1) as i64,
                ])?;
            }
        }
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO edges \
                 (id, source, target, length_km, elevation_gain_m, elevation_loss_m, \
                  cost, reverse_cost, parent_trail_id, geometry_wkt) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            for e in 0..graph.edge_count() {
                stmt.execute(rusqlite::params![
                    (e + 1) as i64,
                    (graph.edge_source[e].0 + 1) as i64,
                    (graph.edge_target[e].0 + 1) as i64,
                    graph.edge_length_km[e],
                    graph.edge_gain_m[e],
                    graph.edge_loss_m[e],
                    graph.edge_cost[e],
                    graph.edge_reverse_cost[e],
                    graph.edge_parent_trail[e],
                    wkt::linestring_z(&graph.edge_geometry[e]),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_routes(&mut self, routes: &[RouteRecommendation]) -> OutputResult<()> {
        if routes.is_empty() {
            return Ok(());
        }
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "INSERT OR REPLACE INTO route_recommendations \
                 (uuid, region, pattern, route_shape, target_distance_km, \
                  target_elevation_gain_m, recommended_length_km, total_trail_distance_km, \
                  elevation_gain_m, elevation_loss_m, route_score, similarity_score, \
                  trail_names, route_edges, route_path, geometry_wkt) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            )?;
            for r in routes {
                let edges: Vec<u32> = r.edge_ids.iter().map(|e| e.0 + 1).collect();
                let path: Vec<u32> = r.vertex_ids.iter().map(|v| v.0 + 1).collect();
                stmt.execute(rusqlite::params![
                    r.uuid,
                    r.region,
                    r.pattern_name,
                    r.shape.as_str(),
                    r.target_distance_km,
                    r.target_elevation_gain_m,
                    r.length_km,
                    r.total_trail_distance_km,
                    r.elevation_gain_m,
                    r.elevation_loss_m,
                    r.route_score,
                    r.similarity_score,
                    serde_json::to_string(&r.trail_names)?,
                    serde_json::to_string(&edges)?,
                    serde_json::to_string(&path)?,
                    wkt::route_geometry(&r.geometry),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn write_summary(&mut self, summary: &RunSummary) -> OutputResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO run_summary (id, summary) VALUES (1, ?1)",
            rusqlite::params![serde_json::to_string_pretty(summary)?],
        )?;
        Ok(())
    }

    fn finish(&mut self) -> OutputResult<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
        Ok(())
    }
}
