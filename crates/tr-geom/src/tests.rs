//! Unit tests for tr-geom.
//!
//! All fixtures are hand-crafted around Boulder, CO coordinates so metric
//! expectations can be checked against the equirectangular formula by hand.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use tr_core::GeoPoint;

    use crate::polyline::Polyline;
    use crate::trail::{ElevationStats, Geometry, RawTrail, Trail, TrailAttributes};

    pub fn pts(coords: &[(f64, f64, f64)]) -> Polyline {
        Polyline::new(coords.iter().map(|&(x, y, z)| GeoPoint::new(x, y, z)).collect())
    }

    pub fn raw(id: &str, name: &str, geometry: Geometry) -> RawTrail {
        RawTrail {
            id:          id.to_owned(),
            name:        name.to_owned(),
            region:      "boulder".to_owned(),
            osm_id:      None,
            attributes:  TrailAttributes::default(),
            source_tags: BTreeMap::new(),
            elevation:   None,
            geometry,
        }
    }

    pub fn trail(id: &str, name: &str, line: Polyline) -> Trail {
        Trail {
            id:          id.to_owned(),
            name:        name.to_owned(),
            region:      "boulder".to_owned(),
            osm_id:      None,
            attributes:  TrailAttributes::default(),
            source_tags: BTreeMap::new(),
            elevation:   ElevationStats::of(&line),
            geometry:    line,
        }
    }

    /// Scenario A fixture: a horizontal and a vertical trail crossing at
    /// (-105.25, 40.00).
    pub fn cross_trails() -> Vec<Trail> {
        vec![
            trail(
                "t1",
                "Horizontal",
                pts(&[(-105.30, 40.00, 1000.0), (-105.20, 40.00, 1000.0), (-105.10, 40.00, 1000.0)]),
            ),
            trail(
                "t2",
                "Vertical",
                pts(&[(-105.25, 39.95, 1000.0), (-105.25, 40.00, 1000.0), (-105.25, 40.05, 1000.0)]),
            ),
        ]
    }
}

// ── Polyline basics ───────────────────────────────────────────────────────────

#[cfg(test)]
mod polyline {
    use super::helpers::pts;
    use crate::polyline::{SegSegIntersection, seg_seg_intersection};
    use tr_core::GeoPoint;

    #[test]
    fn length_accumulates_segments() {
        let l = pts(&[(0.0, 0.0, 0.0), (0.0, 0.05, 0.0), (0.0, 0.10, 0.0)]);
        // 0.1° of latitude ≈ 11_119.5 m.
        assert!((l.length_m() - 11_119.5).abs() < 2.0, "got {}", l.length_m());
    }

    #[test]
    fn gain_and_loss_split_by_sign() {
        let l = pts(&[(0.0, 0.0, 100.0), (0.0, 0.01, 150.0), (0.0, 0.02, 120.0), (0.0, 0.03, 160.0)]);
        assert_eq!(l.elevation_gain_m(), 90.0); // +50 +40
        assert_eq!(l.elevation_loss_m(), 30.0); // -30
    }

    #[test]
    fn closed_ring_detected() {
        let ring = pts(&[(0.0, 0.0, 0.0), (0.01, 0.0, 0.0), (0.01, 0.01, 0.0), (0.0, 0.0, 0.0)]);
        assert!(ring.is_closed());
        assert!(ring.is_simple());
        assert!(!pts(&[(0.0, 0.0, 0.0), (0.01, 0.0, 0.0)]).is_closed());
    }

    #[test]
    fn figure_eight_is_not_simple() {
        // Crosses itself between vertices.
        let l = pts(&[
            (0.00, 0.00, 0.0),
            (0.02, 0.02, 0.0),
            (0.02, 0.00, 0.0),
            (0.00, 0.02, 0.0),
        ]);
        assert!(!l.is_simple());
        let cuts = l.self_intersection_chainages();
        assert_eq!(cuts.len(), 2, "one crossing, two passes: {cuts:?}");
    }

    #[test]
    fn repeated_vertex_is_not_simple() {
        let l = pts(&[(0.0, 0.0, 0.0), (0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]);
        assert!(!l.is_simple());
    }

    #[test]
    fn chainage_projection_and_interpolation() {
        let l = pts(&[(0.0, 0.0, 100.0), (0.0, 0.1, 200.0)]);
        let total = l.length_m();
        let mid = l.point_at_chainage(total / 2.0);
        assert!((mid.lat - 0.05).abs() < 1e-9);
        assert!((mid.elev - 150.0).abs() < 1e-6);

        // A point to the side projects onto the line.
        let c = l.chainage_of(GeoPoint::new(0.001, 0.05, 0.0));
        assert!((c - total / 2.0).abs() < 1.0);
    }

    #[test]
    fn split_inserts_interpolated_point() {
        let l = pts(&[(0.0, 0.0, 100.0), (0.0, 0.1, 200.0)]);
        let total = l.length_m();
        let pieces = l.split_at_chainages(&[total / 4.0]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].point_count(), 2);
        let cut = pieces[0].points[1];
        assert!((cut.lat - 0.025).abs() < 1e-9);
        assert!((cut.elev - 125.0).abs() < 1e-6);
        // Pieces chain: end of one is start of the next.
        assert_eq!(pieces[0].points[1], pieces[1].points[0]);
        let sum: f64 = pieces.iter().map(|p| p.length_m()).sum();
        assert!((sum - total).abs() < 1e-6);
    }

    #[test]
    fn split_at_existing_vertex_inserts_nothing() {
        let l = pts(&[(0.0, 0.0, 0.0), (0.0, 0.05, 0.0), (0.0, 0.1, 0.0)]);
        let vertex_chainage = l.cumulative_m()[1];
        let pieces = l.split_at_chainages(&[vertex_chainage]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0].point_count(), 2);
        assert_eq!(pieces[1].point_count(), 2);
    }

    #[test]
    fn split_ignores_out_of_range_cuts() {
        let l = pts(&[(0.0, 0.0, 0.0), (0.0, 0.1, 0.0)]);
        let pieces = l.split_at_chainages(&[0.0, -5.0, l.length_m() + 10.0]);
        assert_eq!(pieces.len(), 1);
    }

    #[test]
    fn seg_seg_crossing_point() {
        let hit = seg_seg_intersection(
            GeoPoint::new(-1.0, 0.0, 0.0),
            GeoPoint::new(1.0, 0.0, 10.0),
            GeoPoint::new(0.0, -1.0, 0.0),
            GeoPoint::new(0.0, 1.0, 0.0),
        );
        match hit {
            SegSegIntersection::Point(p) => {
                assert!((p.lng).abs() < 1e-12 && (p.lat).abs() < 1e-12);
                // Elevation interpolates along the first segment.
                assert!((p.elev - 5.0).abs() < 1e-9);
            }
            other => panic!("expected point, got {other:?}"),
        }
    }

    #[test]
    fn seg_seg_parallel_disjoint() {
        let hit = seg_seg_intersection(
            GeoPoint::new(0.0, 0.0, 0.0),
            GeoPoint::new(1.0, 0.0, 0.0),
            GeoPoint::new(0.0, 1.0, 0.0),
            GeoPoint::new(1.0, 1.0, 0.0),
        );
        assert_eq!(hit, SegSegIntersection::None);
    }

    #[test]
    fn seg_seg_collinear_overlap_endpoints() {
        let hit = seg_seg_intersection(
            GeoPoint::new(0.0, 0.0, 0.0),
            GeoPoint::new(2.0, 0.0, 0.0),
            GeoPoint::new(1.0, 0.0, 0.0),
            GeoPoint::new(3.0, 0.0, 0.0),
        );
        match hit {
            SegSegIntersection::Collinear(p1, p2) => {
                assert!((p1.lng - 1.0).abs() < 1e-9);
                assert!((p2.lng - 2.0).abs() < 1e-9);
            }
            other => panic!("expected overlap, got {other:?}"),
        }
    }
}

// ── Preprocessor ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod preprocess {
    use super::helpers::{pts, raw};
    use crate::preprocess::GeometryPreprocessor;
    use crate::trail::Geometry;
    use crate::GeomError;
    use tr_core::{CancelToken, EngineConfig};

    fn pp() -> GeometryPreprocessor {
        GeometryPreprocessor::new(&EngineConfig::default())
    }

    #[test]
    fn passthrough_clean_line() {
        let input = vec![raw(
            "a",
            "Mesa",
            Geometry::LineString(pts(&[(-105.3, 40.0, 1700.0), (-105.2, 40.0, 1800.0)])),
        )];
        let (out, report) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "a");
        assert_eq!(report.trails_out, 1);
        // Elevation stats recomputed from geometry when absent on input.
        assert_eq!(out[0].elevation.gain_m, 100.0);
    }

    #[test]
    fn disjoint_multi_becomes_segment_named_trails() {
        // Scenario F: a two-part MultiLineString with unjoinable parts.
        let input = vec![raw(
            "m",
            "X",
            Geometry::MultiLineString(vec![
                pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]),
                pts(&[(0.1, 0.0, 0.0), (0.1, 0.01, 0.0)]),
            ]),
        )];
        let (out, report) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "X");
        assert_eq!(out[0].id, "m");
        assert_eq!(out[1].name, "X (Segment 2)");
        assert_ne!(out[1].id, "m");
        let p1 = &report.passes[0];
        assert_eq!(p1.flattened, 1);
        assert_eq!(p1.pieces_minted, 1);
    }

    #[test]
    fn touching_multi_parts_are_merged() {
        let input = vec![raw(
            "m",
            "Joined",
            Geometry::MultiLineString(vec![
                pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]),
                pts(&[(0.0, 0.01, 0.0), (0.0, 0.02, 0.0)]),
            ]),
        )];
        let (out, _) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].geometry.point_count(), 3);
        assert_eq!(out[0].name, "Joined");
    }

    #[test]
    fn non_finite_geometry_dropped_and_counted() {
        let input = vec![
            raw("bad", "NaN trail", Geometry::LineString(pts(&[(f64::NAN, 0.0, 0.0), (0.0, 0.01, 0.0)]))),
            raw("ok", "Fine", Geometry::LineString(pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]))),
        ];
        let (out, report) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "ok");
        assert_eq!(report.invalid_input.count, 1);
        assert_eq!(report.invalid_input.samples, vec!["bad"]);
    }

    #[test]
    fn self_intersecting_line_is_node_split() {
        // Figure-eight-ish: crosses itself once between vertices.
        let input = vec![raw(
            "z",
            "Zig",
            Geometry::LineString(pts(&[
                (0.00, 0.00, 0.0),
                (0.02, 0.02, 0.0),
                (0.02, 0.00, 0.0),
                (0.00, 0.02, 0.0),
            ])),
        )];
        let (out, report) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert!(out.len() > 1, "expected a split, got {}", out.len());
        assert!(out.iter().all(|t| t.geometry.is_simple()));
        assert_eq!(report.passes[0].self_split, 1);
    }

    #[test]
    fn exact_duplicates_drop_keeping_first() {
        let line = pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]);
        let input = vec![
            raw("first", "A", Geometry::LineString(line.clone())),
            raw("second", "B", Geometry::LineString(line.clone())),
            // Reversed orientation is still ST_Equals-equal.
            raw("third", "C", Geometry::LineString(line.reversed())),
        ];
        let (out, report) = pp().run(input, None, None, &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "first");
        assert_eq!(report.passes[0].duplicates_dropped, 2);
    }

    #[test]
    fn min_length_filter_drops_short_lines() {
        let mut config = EngineConfig::default();
        config.min_segment_length_m = 1_000.0;
        let input = vec![
            // ~11 km — kept.
            raw("long", "Long", Geometry::LineString(pts(&[(0.0, 0.0, 0.0), (0.0, 0.1, 0.0)]))),
            // ~111 m — dropped.
            raw("short", "Short", Geometry::LineString(pts(&[(0.0, 0.0, 0.0), (0.0, 0.001, 0.0)]))),
        ];
        let (out, report) = GeometryPreprocessor::new(&config)
            .run(input, None, None, &CancelToken::new())
            .unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "long");
        assert_eq!(report.passes[0].short_dropped, 1);
    }

    #[test]
    fn eliminating_every_trail_is_fatal() {
        let input = vec![raw(
            "only",
            "Broken",
            Geometry::LineString(pts(&[(f64::NAN, 0.0, 0.0), (0.0, 0.01, 0.0)])),
        )];
        let err = pp().run(input, None, None, &CancelToken::new()).unwrap_err();
        assert!(matches!(err, GeomError::EmptyResult { pass: 1 }));
    }

    #[test]
    fn empty_input_is_not_fatal() {
        let (out, report) = pp().run(vec![], None, None, &CancelToken::new()).unwrap();
        assert!(out.is_empty());
        assert_eq!(report.trails_in, 0);
    }

    #[test]
    fn region_filter_excludes_other_regions() {
        let mut other = raw("o", "Elsewhere", Geometry::LineString(pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)])));
        other.region = "moab".to_owned();
        let input = vec![
            raw("b", "Local", Geometry::LineString(pts(&[(1.0, 0.0, 0.0), (1.0, 0.01, 0.0)]))),
            other,
        ];
        let (out, report) = pp().run(input, None, Some("boulder"), &CancelToken::new()).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].id, "b");
        assert_eq!(report.filtered_out, 1);
    }

    #[test]
    fn idempotent_on_own_output() {
        let input = vec![
            raw("m", "X", Geometry::MultiLineString(vec![
                pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]),
                pts(&[(0.1, 0.0, 0.0), (0.1, 0.01, 0.0)]),
            ])),
            raw("a", "A", Geometry::LineString(pts(&[(0.2, 0.0, 0.0), (0.2, 0.01, 0.0)]))),
        ];
        let (once, _) = pp().run(input, None, None, &CancelToken::new()).unwrap();

        let again: Vec<_> = once
            .iter()
            .map(|t| {
                let mut r = raw(&t.id, &t.name, Geometry::LineString(t.geometry.clone()));
                r.elevation = Some(t.elevation);
                r
            })
            .collect();
        let (twice, _) = pp().run(again, None, None, &CancelToken::new()).unwrap();

        assert_eq!(once.len(), twice.len());
        for (a, b) in once.iter().zip(&twice) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.geometry, b.geometry);
        }
    }
}

// ── Splitter ──────────────────────────────────────────────────────────────────

#[cfg(test)]
mod split {
    use super::helpers::{cross_trails, pts, trail};
    use crate::split::TrailSplitter;
    use tr_core::{CancelToken, EngineConfig};

    fn splitter() -> TrailSplitter {
        TrailSplitter::new(&EngineConfig::default())
    }

    #[test]
    fn cross_produces_four_segments() {
        let trails = cross_trails();
        let (segments, report) = splitter().run(&trails, &CancelToken::new()).unwrap();

        assert_eq!(segments.len(), 4);
        assert_eq!(report.intersecting_pairs, 1);

        // Both trails now carry the crossing point.
        for s in &segments {
            assert!(
                s.geometry.points.iter().any(|p| {
                    (p.lng - -105.25).abs() < 1e-9 && (p.lat - 40.0).abs() < 1e-9
                }),
                "segment {} misses the crossing point",
                s.id
            );
        }

        // Elevation at the inserted point interpolates (flat input → 1000).
        let t1_first = segments.iter().find(|s| s.id == "t1#0").unwrap();
        assert_eq!(t1_first.geometry.points.last().unwrap().elev, 1000.0);

        // Segment ids are unique and carry parent + index.
        assert_eq!(t1_first.parent_trail_id, "t1");
        assert_eq!(t1_first.segment_index, 0);
    }

    #[test]
    fn no_intersection_emits_single_segment() {
        let trails = vec![
            trail("t1", "Horizontal", pts(&[(-105.30, 40.00, 1000.0), (-105.10, 40.00, 1000.0)])),
            trail("t3", "Far", pts(&[(-105.10, 40.05, 1000.0), (-105.05, 40.05, 1000.0)])),
        ];
        let (segments, report) = splitter().run(&trails, &CancelToken::new()).unwrap();
        assert_eq!(segments.len(), 2);
        assert!(segments.iter().all(|s| s.segment_index == 0));
        assert_eq!(report.intersecting_pairs, 0);
    }

    #[test]
    fn shared_endpoint_does_not_split() {
        // T-intersection by endpoint: the junction is already an endpoint of
        // both trails, so neither needs a cut.
        let trails = vec![
            trail("a", "A", pts(&[(0.0, 0.0, 0.0), (0.0, 0.05, 0.0)])),
            trail("b", "B", pts(&[(0.0, 0.05, 0.0), (0.05, 0.05, 0.0)])),
        ];
        let (segments, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].geometry.point_count(), 2);
        assert_eq!(segments[1].geometry.point_count(), 2);
    }

    #[test]
    fn interior_vertex_touch_splits_one_trail() {
        // B's endpoint lands on A's interior vertex: A splits there, B does not.
        let trails = vec![
            trail("a", "A", pts(&[(0.0, 0.0, 0.0), (0.0, 0.05, 0.0), (0.0, 0.10, 0.0)])),
            trail("b", "B", pts(&[(0.0, 0.05, 0.0), (0.05, 0.05, 0.0)])),
        ];
        let (segments, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        let a_parts = segments.iter().filter(|s| s.parent_trail_id == "a").count();
        let b_parts = segments.iter().filter(|s| s.parent_trail_id == "b").count();
        assert_eq!(a_parts, 2);
        assert_eq!(b_parts, 1);
        // Split at the existing vertex: no inserted points anywhere.
        assert!(segments.iter().all(|s| s.geometry.point_count() == 2));
    }

    #[test]
    fn overlap_splits_at_overlap_endpoints() {
        // Two collinear trails sharing a middle stretch.
        let trails = vec![
            trail("a", "A", pts(&[(0.00, 0.0, 0.0), (0.20, 0.0, 0.0)])),
            trail("b", "B", pts(&[(0.10, 0.0, 0.0), (0.30, 0.0, 0.0)])),
        ];
        let (segments, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        // A splits at 0.10, B splits at 0.20: two pieces each.
        assert_eq!(segments.iter().filter(|s| s.parent_trail_id == "a").count(), 2);
        assert_eq!(segments.iter().filter(|s| s.parent_trail_id == "b").count(), 2);
    }

    #[test]
    fn segment_stats_are_recomputed() {
        let trails = cross_trails();
        let (segments, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        for s in &segments {
            assert!((s.length_km - s.geometry.length_km()).abs() < 1e-12);
            assert!(!s.bbox.is_empty());
        }
        let total_t1: f64 = segments
            .iter()
            .filter(|s| s.parent_trail_id == "t1")
            .map(|s| s.length_km)
            .sum();
        assert!((total_t1 - trails[0].length_km()).abs() < 1e-9);
    }

    #[test]
    fn deterministic_across_runs() {
        let trails = cross_trails();
        let (a, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        let (b, _) = splitter().run(&trails, &CancelToken::new()).unwrap();
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.geometry, y.geometry);
        }
    }
}
