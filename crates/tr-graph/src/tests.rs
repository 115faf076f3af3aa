//! Unit tests for tr-graph.
//!
//! Graph fixtures are built from real splitter output where the scenario
//! calls for it, or assembled segment-by-segment for targeted cases.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use tr_core::{CancelToken, EngineConfig, GeoPoint};
    use tr_geom::{ElevationStats, Polyline, Segment, Trail, TrailAttributes, TrailSplitter};

    use crate::{Noder, NoderReport, TrailGraph};

    pub fn pts(coords: &[(f64, f64, f64)]) -> Polyline {
        Polyline::new(coords.iter().map(|&(x, y, z)| GeoPoint::new(x, y, z)).collect())
    }

    pub fn seg(id: &str, parent: &str, name: &str, index: u32, line: Polyline) -> Segment {
        Segment {
            id:              id.to_owned(),
            name:            name.to_owned(),
            region:          "boulder".to_owned(),
            parent_trail_id: parent.to_owned(),
            segment_index:   index,
            osm_id:          None,
            attributes:      TrailAttributes::default(),
            source_tags:     BTreeMap::new(),
            elevation:       ElevationStats::of(&line),
            length_km:       line.length_km(),
            bbox:            line.bbox(),
            geometry:        line,
        }
    }

    fn trail(id: &str, name: &str, line: Polyline) -> Trail {
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

    /// Split + node the Scenario A cross (Horizontal × Vertical).
    pub fn cross_graph() -> (TrailGraph, NoderReport) {
        let config = EngineConfig::default();
        let trails = vec![
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
        ];
        let (segments, _) = TrailSplitter::new(&config)
            .run(&trails, &CancelToken::new())
            .unwrap();
        Noder::new(&config).run(&segments, &CancelToken::new()).unwrap()
    }

    pub fn node(segments: &[Segment]) -> (TrailGraph, NoderReport) {
        Noder::new(&EngineConfig::default())
            .run(segments, &CancelToken::new())
            .unwrap()
    }
}

// ── Noder topology ────────────────────────────────────────────────────────────

#[cfg(test)]
mod noder {
    use super::helpers::{cross_graph, node, pts, seg};
    use crate::{Noder, VertexClass};
    use tr_core::{CancelToken, EngineConfig, VertexId};

    #[test]
    fn cross_has_five_vertices_four_edges() {
        let (graph, report) = cross_graph();
        assert_eq!(graph.vertex_count(), 5);
        assert_eq!(graph.edge_count(), 4);
        assert_eq!(report.segments_in, 4);

        // Canonical (lng, lat) order puts the crossing at id 2.
        let crossing = VertexId(2);
        let p = graph.vertex_pos[crossing.index()];
        assert!((p.lng - -105.25).abs() < 1e-9);
        assert!((p.lat - 40.00).abs() < 1e-9);
        assert_eq!(graph.vertex_cnt[crossing.index()], 4);
        assert_eq!(graph.vertex_class(crossing), VertexClass::Intersection);

        // The four arms are endpoints.
        for v in [0usize, 1, 3, 4] {
            assert_eq!(graph.vertex_cnt[v], 1, "vertex {v}");
        }

        // Edge lengths under the equirectangular metric: the north/south
        // arms are ~5.56 km, the west arm ~4.26 km, the east arm ~12.78 km.
        let mut lengths: Vec<f64> = graph.edge_length_km.clone();
        lengths.sort_by(f64::total_cmp);
        assert!((lengths[0] - 4.2592).abs() < 0.01, "{lengths:?}");
        assert!((lengths[1] - 5.5597).abs() < 0.01);
        assert!((lengths[2] - 5.5597).abs() < 0.01);
        assert!((lengths[3] - 12.7777).abs() < 0.01);
    }

    #[test]
    fn every_edge_has_distinct_existing_endpoints() {
        let (graph, _) = cross_graph();
        for e in 0..graph.edge_count() {
            let s = graph.edge_source[e];
            let t = graph.edge_target[e];
            assert_ne!(s, t);
            assert!(s.index() < graph.vertex_count());
            assert!(t.index() < graph.vertex_count());
        }
    }

    #[test]
    fn cnt_matches_incidence() {
        let (graph, _) = cross_graph();
        for v in 0..graph.vertex_count() {
            let by_scan = (0..graph.edge_count())
                .filter(|&e| {
                    graph.edge_source[e].index() == v || graph.edge_target[e].index() == v
                })
                .count() as u32;
            assert_eq!(graph.vertex_cnt[v], by_scan);
        }
    }

    #[test]
    fn costs_mirror_length() {
        let (graph, _) = cross_graph();
        for e in 0..graph.edge_count() {
            assert!(graph.edge_length_km[e] > 0.0);
            assert_eq!(graph.edge_cost[e], graph.edge_length_km[e]);
            assert_eq!(graph.edge_reverse_cost[e], graph.edge_length_km[e]);
        }
    }

    #[test]
    fn nearby_endpoints_snap_to_one_vertex() {
        // End of `a` and start of `b` differ by ~0.01 m — within the 0.1 m
        // default tolerance.
        let a = seg("a#0", "a", "A", 0, pts(&[(0.0, 0.0, 100.0), (0.0, 0.01, 120.0)]));
        let b = seg("b#0", "b", "B", 0, pts(&[(0.0, 0.0100000001, 140.0), (0.0, 0.02, 160.0)]));
        let (graph, _) = node(&[a, b]);
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 2);
        // The shared vertex averages its members' elevations.
        let shared = (0..graph.vertex_count())
            .find(|&v| graph.vertex_cnt[v] == 2)
            .unwrap();
        assert!((graph.vertex_pos[shared].elev - 130.0).abs() < 1e-6);
    }

    #[test]
    fn distant_endpoints_stay_separate() {
        // ~1.1 m apart — outside the default tolerance: four vertices.
        let a = seg("a#0", "a", "A", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]));
        let b = seg("b#0", "b", "B", 0, pts(&[(0.0, 0.01001, 0.0), (0.0, 0.02, 0.0)]));
        let (graph, _) = node(&[a, b]);
        assert_eq!(graph.vertex_count(), 4);
    }

    #[test]
    fn loop_segment_is_midpoint_split() {
        // A closed ring: both endpoints cluster to one vertex, so the noder
        // splits it into two edges around a midpoint vertex.
        let ring = seg(
            "r#0",
            "r",
            "Ring",
            0,
            pts(&[
                (0.000, 0.000, 0.0),
                (0.010, 0.000, 0.0),
                (0.010, 0.010, 0.0),
                (0.000, 0.010, 0.0),
                (0.000, 0.000, 0.0),
            ]),
        );
        let (graph, report) = node(&[ring]);
        assert_eq!(report.loops_split, 1);
        assert_eq!(graph.vertex_count(), 2);
        assert_eq!(graph.edge_count(), 2);
        assert!(graph.vertex_cnt.iter().all(|&c| c == 2));
        // No self-loop survived.
        for e in 0..graph.edge_count() {
            assert_ne!(graph.edge_source[e], graph.edge_target[e]);
        }
    }

    #[test]
    fn overlong_segment_dropped() {
        let mut config = EngineConfig::default();
        config.max_edge_length_km = 1.0;
        // ~11 km segment exceeds the 1 km cap.
        let long = seg("l#0", "l", "Long", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.1, 0.0)]));
        let ok = seg("s#0", "s", "Short", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.005, 0.0)]));
        let (graph, report) = Noder::new(&config)
            .run(&[long, ok], &CancelToken::new())
            .unwrap();
        assert_eq!(report.overlong_dropped, 1);
        assert_eq!(graph.edge_count(), 1);
    }

    #[test]
    fn vertex_ids_are_lng_lat_sorted_and_deterministic() {
        let (a, _) = cross_graph();
        let (b, _) = cross_graph();
        assert_eq!(a.vertex_pos.len(), b.vertex_pos.len());
        for v in 0..a.vertex_count() {
            assert_eq!(a.vertex_pos[v], b.vertex_pos[v]);
        }
        assert_eq!(a.edge_source, b.edge_source);
        assert_eq!(a.edge_target, b.edge_target);
        // Sorted on (lng, lat).
        for w in a.vertex_pos.windows(2) {
            assert!(
                w[0].lng < w[1].lng || (w[0].lng == w[1].lng && w[0].lat <= w[1].lat),
                "vertex order violated"
            );
        }
    }
}

// ── Graph model ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod graph {
    use super::helpers::{pts, seg, node};
    use tr_core::GeoPoint;

    #[test]
    fn incident_iteration_matches_cnt() {
        let a = seg("a#0", "a", "A", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]));
        let b = seg("b#0", "b", "B", 0, pts(&[(0.0, 0.01, 0.0), (0.01, 0.01, 0.0)]));
        let (graph, _) = node(&[a, b]);
        for v in 0..graph.vertex_count() {
            let incident: Vec<_> = graph.incident(tr_core::VertexId(v as u32)).collect();
            assert_eq!(incident.len() as u32, graph.vertex_cnt[v]);
            for (e, far) in incident {
                assert_eq!(graph.edge_other(e, tr_core::VertexId(v as u32)), far);
            }
        }
    }

    #[test]
    fn gain_direction_depends_on_orientation() {
        let climb = seg("c#0", "c", "Climb", 0, pts(&[(0.0, 0.0, 100.0), (0.0, 0.01, 300.0)]));
        let (graph, _) = node(&[climb]);
        let e = tr_core::EdgeId(0);
        let s = graph.edge_source[0];
        let t = graph.edge_target[0];
        assert_eq!(graph.gain_along(e, s), 200.0);
        assert_eq!(graph.loss_along(e, s), 0.0);
        assert_eq!(graph.gain_along(e, t), 0.0);
        assert_eq!(graph.loss_along(e, t), 200.0);
    }

    #[test]
    fn nearest_vertex_snap() {
        let a = seg("a#0", "a", "A", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]));
        let (graph, _) = node(&[a]);
        let (v, dist) = graph.nearest_vertex(GeoPoint::new2d(0.0001, 0.0)).unwrap();
        assert_eq!(graph.vertex_pos[v.index()].lat, 0.0);
        assert!(dist > 0.0 && dist < 20.0);
    }

    #[test]
    fn empty_graph_has_no_nearest() {
        let graph = crate::TrailGraph::empty();
        assert!(graph.is_empty());
        assert!(graph.nearest_vertex(GeoPoint::new2d(0.0, 0.0)).is_none());
    }
}

// ── Components ────────────────────────────────────────────────────────────────

#[cfg(test)]
mod components {
    use super::helpers::{cross_graph, pts, seg, node};
    use crate::ComponentFinder;
    use tr_core::ComponentId;

    #[test]
    fn cross_is_one_component() {
        let (mut graph, _) = cross_graph();
        let summaries = ComponentFinder::run(&mut graph);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].vertex_count, 5);
        assert_eq!(summaries[0].edge_count, 4);
        assert!(graph.vertex_component.iter().all(|&c| c == ComponentId(0)));
    }

    #[test]
    fn disjoint_trails_are_two_components() {
        // Scenario B: the cross's horizontal plus a far-away trail.
        let a = seg("a#0", "a", "A", 0, pts(&[(-105.30, 40.00, 0.0), (-105.10, 40.00, 0.0)]));
        let b = seg("b#0", "b", "B", 0, pts(&[(-105.10, 40.05, 0.0), (-105.05, 40.05, 0.0)]));
        let (mut graph, _) = node(&[a, b]);
        let summaries = ComponentFinder::run(&mut graph);
        assert_eq!(graph.vertex_count(), 4);
        assert_eq!(summaries.len(), 2);
        for s in &summaries {
            assert_eq!(s.vertex_count, 2);
            assert_eq!(s.edge_count, 1);
        }
        // Labels are dense starting at 0.
        assert_eq!(summaries[0].id, ComponentId(0));
        assert_eq!(summaries[1].id, ComponentId(1));
    }

    #[test]
    fn members_listed_in_ascending_order() {
        let a = seg("a#0", "a", "A", 0, pts(&[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]));
        let b = seg("b#0", "b", "B", 0, pts(&[(1.0, 0.0, 0.0), (1.0, 0.01, 0.0)]));
        let (mut graph, _) = node(&[a, b]);
        let _ = ComponentFinder::run(&mut graph);
        let m0 = ComponentFinder::members(&graph, ComponentId(0));
        assert!(m0.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(
            m0.len() + ComponentFinder::members(&graph, ComponentId(1)).len(),
            graph.vertex_count()
        );
    }
}
