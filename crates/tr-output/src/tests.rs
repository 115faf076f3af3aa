//! Unit tests for tr-output.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use tr_core::{GeoPoint, RunSummary, VertexId};
    use tr_geom::{ElevationStats, Polyline, Segment, Trail, TrailAttributes};
    use tr_graph::{ComponentFinder, TrailGraph, TrailGraphBuilder};
    use tr_route::{RouteGeometry, RouteRecommendation, RouteShape};
    use tr_route::route::route_uuid;

    pub fn line(coords: &[(f64, f64, f64)]) -> Polyline {
        Polyline::new(coords.iter().map(|&(x, y, z)| GeoPoint::new(x, y, z)).collect())
    }

    pub fn trail(id: &str, name: &str) -> Trail {
        let geometry = line(&[(0.0, 0.0, 100.0), (0.0, 0.01, 150.0)]);
        Trail {
            id:          id.to_owned(),
            name:        name.to_owned(),
            region:      "boulder".to_owned(),
            osm_id:      Some(42),
            attributes:  TrailAttributes::default(),
            source_tags: BTreeMap::new(),
            elevation:   ElevationStats::of(&geometry),
            geometry,
        }
    }

    pub fn segment(parent: &Trail, index: u32) -> Segment {
        Segment::from_piece(parent, index, parent.geometry.clone())
    }

    pub fn small_graph() -> TrailGraph {
        let mut b = TrailGraphBuilder::new();
        let a = b.add_vertex(GeoPoint::new(0.0, 0.0, 100.0));
        let c = b.add_vertex(GeoPoint::new(0.0, 0.01, 150.0));
        b.add_edge(a, c, line(&[(0.0, 0.0, 100.0), (0.0, 0.01, 150.0)]), "t#0", "t", "Mesa");
        let mut g = b.build();
        let _ = ComponentFinder::run(&mut g);
        g
    }

    pub fn route() -> RouteRecommendation {
        let geometry = line(&[(0.0, 0.0, 100.0), (0.0, 0.01, 150.0)]);
        RouteRecommendation {
            uuid:   route_uuid(&[tr_core::EdgeId(0)], RouteShape::PointToPoint),
            region: "boulder".to_owned(),
            pattern_name: "traverse".to_owned(),
            shape:  RouteShape::PointToPoint,
            target_distance_km:      1.1,
            target_elevation_gain_m: 50.0,
            length_km: 1.1119,
            total_trail_distance_km: None,
            elevation_gain_m: 50.0,
            elevation_loss_m: 0.0,
            edge_ids:   vec![tr_core::EdgeId(0)],
            vertex_ids: vec![VertexId(0), VertexId(1)],
            trail_names: vec!["Mesa".to_owned()],
            route_score: 0.99,
            similarity_score: 0.0,
            geometry: RouteGeometry::LineString(geometry),
        }
    }

    pub fn summary() -> RunSummary {
        let mut s = RunSummary::default();
        s.invalid_input.record("bad-trail");
        s.record_pattern("traverse", 1);
        s
    }
}

// ── WKT ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod wkt {
    use super::helpers::line;
    use crate::wkt::{linestring_z, multilinestring_z, point_z};
    use tr_core::GeoPoint;

    #[test]
    fn linestring_z_format() {
        let l = line(&[(-105.3, 40.0, 1000.0), (-105.2, 40.0, 1010.5)]);
        assert_eq!(
            linestring_z(&l),
            "LINESTRING Z (-105.3 40 1000, -105.2 40 1010.5)"
        );
    }

    #[test]
    fn multilinestring_z_format() {
        let parts = vec![
            line(&[(0.0, 0.0, 1.0), (1.0, 0.0, 2.0)]),
            line(&[(1.0, 0.0, 2.0), (0.0, 0.0, 1.0)]),
        ];
        assert_eq!(
            multilinestring_z(&parts),
            "MULTILINESTRING Z ((0 0 1, 1 0 2), (1 0 2, 0 0 1))"
        );
    }

    #[test]
    fn point_z_format() {
        assert_eq!(point_z(GeoPoint::new(-105.25, 40.0, 1620.0)), "POINT Z (-105.25 40 1620)");
    }
}

// ── GeoJSON reading ───────────────────────────────────────────────────────────

#[cfg(test)]
mod geojson_read {
    use crate::read_trails;
    use tr_geom::Geometry;

    const INPUT: &str = r#"{
        "type": "FeatureCollection",
        "features": [
            {
                "type": "Feature",
                "geometry": { "type": "LineString",
                              "coordinates": [[-105.3, 40.0, 1000.0], [-105.2, 40.0]] },
                "properties": { "id": "t1", "name": "Mesa", "region": "boulder",
                                "osm_id": 123, "surface": "dirt", "steward": "OSMP" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "MultiLineString",
                              "coordinates": [[[0, 0, 1], [0, 1, 2]], [[2, 2, 3], [2, 3, 4]]] },
                "properties": { "name": "Branches" }
            },
            {
                "type": "Feature",
                "geometry": { "type": "Point", "coordinates": [0, 0] },
                "properties": { "name": "Not a trail" }
            }
        ]
    }"#;

    #[test]
    fn parses_lines_and_skips_points() {
        let trails = read_trails(INPUT.as_bytes()).unwrap();
        assert_eq!(trails.len(), 2);

        let t1 = &trails[0];
        assert_eq!(t1.id, "t1");
        assert_eq!(t1.name, "Mesa");
        assert_eq!(t1.region, "boulder");
        assert_eq!(t1.osm_id, Some(123));
        assert_eq!(t1.attributes.surface.as_deref(), Some("dirt"));
        // Unknown string properties become source tags.
        assert_eq!(t1.source_tags.get("steward").map(String::as_str), Some("OSMP"));
        let Geometry::LineString(line) = &t1.geometry else {
            panic!("expected single line");
        };
        // Missing third ordinate reads as elevation 0.
        assert_eq!(line.points[0].elev, 1000.0);
        assert_eq!(line.points[1].elev, 0.0);

        assert!(matches!(trails[1].geometry, Geometry::MultiLineString(ref p) if p.len() == 2));
        // No id property: a positional id is minted.
        assert_eq!(trails[1].id, "trail-1");
    }

    #[test]
    fn rejects_non_collection() {
        assert!(read_trails(r#"{"type": "Feature"}"#.as_bytes()).is_err());
    }
}

// ── GeoJSON writing ───────────────────────────────────────────────────────────

#[cfg(test)]
mod geojson_write {
    use serde_json::Value;
    use tempfile::TempDir;

    use super::helpers;
    use crate::{ArtifactWriter, GeoJsonWriter};

    fn read_features(dir: &TempDir, file: &str) -> Vec<Value> {
        let text = std::fs::read_to_string(dir.path().join(file)).unwrap();
        let root: Value = serde_json::from_str(&text).unwrap();
        root["features"].as_array().unwrap().clone()
    }

    #[test]
    fn writes_all_collections() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = GeoJsonWriter::new(dir.path());

        let trail = helpers::trail("t1", "Mesa");
        w.write_trails(std::slice::from_ref(&trail)).unwrap();
        w.write_segments(&[helpers::segment(&trail, 0)]).unwrap();
        w.write_graph(&helpers::small_graph()).unwrap();
        w.write_routes(&[helpers::route()]).unwrap();
        w.write_summary(&helpers::summary()).unwrap();
        w.finish().unwrap();

        assert_eq!(read_features(&dir, "trails.geojson").len(), 1);
        assert_eq!(read_features(&dir, "segments.geojson").len(), 1);
        assert_eq!(read_features(&dir, "vertices.geojson").len(), 2);
        assert_eq!(read_features(&dir, "edges.geojson").len(), 1);
        assert_eq!(read_features(&dir, "routes.geojson").len(), 1);
        assert!(dir.path().join("summary.json").exists());
    }

    #[test]
    fn graph_ids_are_one_based() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = GeoJsonWriter::new(dir.path());
        w.write_graph(&helpers::small_graph()).unwrap();

        let vertices = read_features(&dir, "vertices.geojson");
        let ids: Vec<i64> = vertices
            .iter()
            .map(|f| f["properties"]["id"].as_i64().unwrap())
            .collect();
        assert_eq!(ids, vec![1, 2]);

        let edges = read_features(&dir, "edges.geojson");
        assert_eq!(edges[0]["properties"]["id"], 1);
        assert_eq!(edges[0]["properties"]["source"], 1);
        assert_eq!(edges[0]["properties"]["target"], 2);
    }

    #[test]
    fn route_round_trips_key_fields() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = GeoJsonWriter::new(dir.path());
        let route = helpers::route();
        w.write_routes(std::slice::from_ref(&route)).unwrap();

        let features = read_features(&dir, "routes.geojson");
        let props = &features[0]["properties"];
        assert_eq!(props["uuid"].as_str().unwrap(), route.uuid);
        assert_eq!(props["route_shape"], "point-to-point");
        assert_eq!(props["route_edges"].as_array().unwrap().len(), 1);
        assert_eq!(props["route_edges"][0], 1); // 1-based
        assert!(props["total_trail_distance_km"].is_null());
    }
}

// ── CSV ───────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod csv_write {
    use tempfile::TempDir;

    use super::helpers;
    use crate::{ArtifactWriter, CsvArtifactWriter};

    fn rows(dir: &TempDir, file: &str) -> Vec<csv::StringRecord> {
        let mut rdr = csv::Reader::from_path(dir.path().join(file)).unwrap();
        rdr.records().map(|r| r.unwrap()).collect()
    }

    #[test]
    fn files_created_with_headers() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = CsvArtifactWriter::new(dir.path()).unwrap();
        w.finish().unwrap();

        for file in ["trails.csv", "segments.csv", "vertices.csv", "edges.csv", "routes.csv"] {
            assert!(dir.path().join(file).exists(), "{file} missing");
        }
        let mut rdr = csv::Reader::from_path(dir.path().join("vertices.csv")).unwrap();
        let headers: Vec<_> = rdr.headers().unwrap().iter().map(str::to_owned).collect();
        assert_eq!(headers, ["id", "lng", "lat", "elevation", "cnt", "component_id"]);
    }

    #[test]
    fn graph_rows_use_one_based_ids() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = CsvArtifactWriter::new(dir.path()).unwrap();
        w.write_graph(&helpers::small_graph()).unwrap();
        w.finish().unwrap();

        let vertices = rows(&dir, "vertices.csv");
        assert_eq!(vertices.len(), 2);
        assert_eq!(&vertices[0][0], "1");
        assert_eq!(&vertices[1][0], "2");

        let edges = rows(&dir, "edges.csv");
        assert_eq!(edges.len(), 1);
        assert_eq!(&edges[0][1], "1"); // source
        assert_eq!(&edges[0][2], "2"); // target
        assert!(edges[0][9].starts_with("LINESTRING Z ("));
    }

    #[test]
    fn route_rows_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = CsvArtifactWriter::new(dir.path()).unwrap();
        let route = helpers::route();
        w.write_routes(std::slice::from_ref(&route)).unwrap();
        w.finish().unwrap();

        let routes = rows(&dir, "routes.csv");
        assert_eq!(routes.len(), 1);
        assert_eq!(&routes[0][0], route.uuid.as_str());
        assert_eq!(&routes[0][3], "point-to-point");
        assert_eq!(&routes[0][7], ""); // no total_trail_distance_km for p2p
    }

    #[test]
    fn finish_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = CsvArtifactWriter::new(dir.path()).unwrap();
        w.finish().unwrap();
        w.finish().unwrap();
    }
}

// ── SQLite ────────────────────────────────────────────────────────────────────

#[cfg(all(test, feature = "sqlite"))]
mod sqlite_write {
    use rusqlite::Connection;

    use super::helpers;
    use crate::{ArtifactWriter, SqliteWriter};

    #[test]
    fn writes_all_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SqliteWriter::new(dir.path()).unwrap();

        let trail = helpers::trail("t1", "Mesa");
        w.write_trails(std::slice::from_ref(&trail)).unwrap();
        w.write_segments(&[helpers::segment(&trail, 0)]).unwrap();
        w.write_graph(&helpers::small_graph()).unwrap();
        w.write_routes(&[helpers::route()]).unwrap();
        w.write_summary(&helpers::summary()).unwrap();
        w.finish().unwrap();

        let conn = Connection::open(dir.path().join("trailrec.db")).unwrap();
        let count = |table: &str| -> i64 {
            conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))
                .unwrap()
        };
        assert_eq!(count("trails"), 1);
        assert_eq!(count("segments"), 1);
        assert_eq!(count("vertices"), 2);
        assert_eq!(count("edges"), 1);
        assert_eq!(count("route_recommendations"), 1);
        assert_eq!(count("run_summary"), 1);

        let (source, target): (i64, i64) = conn
            .query_row("SELECT source, target FROM edges WHERE id = 1", [], |r| {
                Ok((r.get(0)?, r.get(1)?))
            })
            .unwrap();
        assert_eq!((source, target), (1, 2));
    }

    #[test]
    fn rewrite_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut w = SqliteWriter::new(dir.path()).unwrap();
        let trail = helpers::trail("t1", "Mesa");
        w.write_trails(std::slice::from_ref(&trail)).unwrap();
        w.write_trails(std::slice::from_ref(&trail)).unwrap();
        w.finish().unwrap();

        let conn = Connection::open(dir.path().join("trailrec.db")).unwrap();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM trails", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
