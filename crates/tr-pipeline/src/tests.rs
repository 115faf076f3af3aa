//! End-to-end pipeline tests over the literal cross scenario.

#[cfg(test)]
mod helpers {
    use std::collections::BTreeMap;

    use tr_core::{EngineConfig, GeoPoint};
    use tr_geom::{Geometry, Polyline, RawTrail, TrailAttributes};

    pub fn raw(id: &str, name: &str, coords: &[(f64, f64, f64)]) -> RawTrail {
        RawTrail {
            id:          id.to_owned(),
            name:        name.to_owned(),
            region:      "boulder".to_owned(),
            osm_id:      None,
            attributes:  TrailAttributes::default(),
            source_tags: BTreeMap::new(),
            elevation:   None,
            geometry: Geometry::LineString(Polyline::new(
                coords.iter().map(|&(x, y, z)| GeoPoint::new(x, y, z)).collect(),
            )),
        }
    }

    /// Scenario A input: Horizontal × Vertical crossing at (-105.25, 40).
    pub fn cross_input() -> Vec<RawTrail> {
        vec![
            raw("t1", "Horizontal", &[
                (-105.30, 40.00, 1000.0),
                (-105.20, 40.00, 1000.0),
                (-105.10, 40.00, 1000.0),
            ]),
            raw("t2", "Vertical", &[
                (-105.25, 39.95, 1000.0),
                (-105.25, 40.00, 1000.0),
                (-105.25, 40.05, 1000.0),
            ]),
        ]
    }

    pub fn wide_config() -> EngineConfig {
        let mut c = EngineConfig::default();
        // The cross's arms exceed the 2 km default single-edge search cap.
        c.max_single_edge_km = 50.0;
        c
    }
}

#[cfg(test)]
mod end_to_end {
    use super::helpers::{cross_input, raw, wide_config};
    use crate::{Pipeline, PipelineError};
    use tr_core::CancelToken;
    use tr_route::{RoutePattern, RouteShape};

    #[test]
    fn cross_flows_through_every_stage() {
        let config = wide_config();
        let patterns = vec![RoutePattern::new("oab", 19.64, 0.0, RouteShape::OutAndBack)];
        let artifacts = Pipeline::new(&config)
            .run(cross_input(), &patterns, &CancelToken::new())
            .unwrap();

        assert_eq!(artifacts.trails.len(), 2);
        assert_eq!(artifacts.segments.len(), 4);
        assert_eq!(artifacts.graph.vertex_count(), 5);
        assert_eq!(artifacts.graph.edge_count(), 4);
        assert_eq!(artifacts.components.len(), 1);
        assert!(!artifacts.routes.is_empty());
        assert_eq!(artifacts.routes[0].region, "boulder");

        // Five stages, five timings.
        let stages: Vec<&str> = artifacts
            .summary
            .stage_timings
            .iter()
            .map(|t| t.stage.as_str())
            .collect();
        assert_eq!(stages, vec!["preprocess", "split", "node", "components", "routes"]);
        assert!(!artifacts.summary.cancelled);
    }

    #[test]
    fn p2p_excluded_from_output_by_default() {
        let config = wide_config();
        let patterns = vec![RoutePattern::new("traverse", 10.0, 0.0, RouteShape::PointToPoint)];
        let artifacts = Pipeline::new(&config)
            .run(cross_input(), &patterns, &CancelToken::new())
            .unwrap();
        // Searched (pattern counts prove it) but not exported.
        assert!(artifacts.routes.is_empty());
        assert_eq!(artifacts.summary.pattern_routes[0].pattern, "traverse");
        assert!(artifacts.summary.pattern_routes[0].accepted >= 1);

        let mut config = wide_config();
        config.include_p2p_in_output = true;
        let patterns = vec![RoutePattern::new("traverse", 10.0, 0.0, RouteShape::PointToPoint)];
        let artifacts = Pipeline::new(&config)
            .run(cross_input(), &patterns, &CancelToken::new())
            .unwrap();
        assert!(!artifacts.routes.is_empty());
    }

    #[test]
    fn disconnected_input_yields_two_components() {
        let config = wide_config();
        let mut input = cross_input();
        input.push(raw("t3", "Far", &[(-105.10, 40.05, 1000.0), (-105.05, 40.05, 1000.0)]));
        let artifacts = Pipeline::new(&config)
            .run(input, &[], &CancelToken::new())
            .unwrap();
        assert_eq!(artifacts.components.len(), 2);
    }

    #[test]
    fn determinism_across_runs() {
        let config = wide_config();
        let patterns = vec![
            RoutePattern::new("oab", 19.64, 0.0, RouteShape::OutAndBack),
            RoutePattern::new("traverse", 10.0, 0.0, RouteShape::PointToPoint),
        ];
        let a = Pipeline::new(&config)
            .run(cross_input(), &patterns, &CancelToken::new())
            .unwrap();
        let b = Pipeline::new(&config)
            .run(cross_input(), &patterns, &CancelToken::new())
            .unwrap();

        assert_eq!(a.graph.vertex_count(), b.graph.vertex_count());
        for v in 0..a.graph.vertex_count() {
            assert_eq!(a.graph.vertex_pos[v], b.graph.vertex_pos[v]);
        }
        assert_eq!(a.graph.edge_source, b.graph.edge_source);
        let ua: Vec<_> = a.routes.iter().map(|r| r.uuid.clone()).collect();
        let ub: Vec<_> = b.routes.iter().map(|r| r.uuid.clone()).collect();
        assert_eq!(ua, ub);
    }

    #[test]
    fn region_filter_drops_foreign_trails() {
        let config = wide_config();
        let mut input = cross_input();
        let mut foreign = raw("m1", "Moab Rim", &[(-109.6, 38.6, 1200.0), (-109.55, 38.6, 1250.0)]);
        foreign.region = "moab".to_owned();
        input.push(foreign);

        let artifacts = Pipeline::new(&config)
            .with_region("boulder")
            .run(input, &[], &CancelToken::new())
            .unwrap();
        assert_eq!(artifacts.trails.len(), 2);
        assert!(artifacts.trails.iter().all(|t| t.region == "boulder"));
    }

    #[test]
    fn invalid_config_is_fatal() {
        let mut config = wide_config();
        config.tolerance_ladder_percent = vec![];
        let err = Pipeline::new(&config)
            .run(cross_input(), &[], &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Config(_)));
    }

    #[test]
    fn all_invalid_input_is_fatal() {
        let config = wide_config();
        let input = vec![raw("bad", "NaN", &[(f64::NAN, 40.0, 0.0), (-105.2, 40.0, 0.0)])];
        let err = Pipeline::new(&config)
            .run(input, &[], &CancelToken::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyAfterPreprocess(_)));
    }

    #[test]
    fn cancellation_returns_partial_flagged() {
        let config = wide_config();
        let cancel = CancelToken::new();
        cancel.cancel();
        let artifacts = Pipeline::new(&config)
            .run(cross_input(), &[], &cancel)
            .unwrap();
        assert!(artifacts.summary.cancelled);
        assert!(artifacts.trails.is_empty());
    }

    #[test]
    fn empty_input_is_empty_not_fatal() {
        let config = wide_config();
        let artifacts = Pipeline::new(&config)
            .run(vec![], &[], &CancelToken::new())
            .unwrap();
        assert!(artifacts.is_empty());
        assert!(!artifacts.summary.cancelled);
    }

    #[test]
    fn multiline_input_splits_into_named_trails() {
        use tr_core::GeoPoint;
        use tr_geom::{Geometry, Polyline};

        let config = wide_config();
        let mut input = cross_input();
        let mut multi = raw("m", "X", &[(0.0, 0.0, 0.0), (0.0, 0.01, 0.0)]);
        multi.geometry = Geometry::MultiLineString(vec![
            Polyline::new(vec![GeoPoint::new(0.0, 0.0, 0.0), GeoPoint::new(0.0, 0.01, 0.0)]),
            Polyline::new(vec![GeoPoint::new(0.1, 0.0, 0.0), GeoPoint::new(0.1, 0.01, 0.0)]),
        ]);
        input.push(multi);

        let artifacts = Pipeline::new(&config)
            .run(input, &[], &CancelToken::new())
            .unwrap();
        let names: Vec<&str> = artifacts.trails.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"X"));
        assert!(names.contains(&"X (Segment 2)"));
    }
}
