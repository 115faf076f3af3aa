//! WKT encoding for the text boundary.
//!
//! Three-dimensional coordinates are always preserved:
//! `LINESTRING Z (x y z, …)`.  Coordinates render with enough digits to
//! round-trip f64 exactly (Rust's shortest-representation float
//! formatting), which keeps files compact for grid-aligned test data while
//! losing nothing for survey-precision input.

use tr_core::GeoPoint;
use tr_geom::Polyline;
use tr_route::RouteGeometry;

pub fn point_z(p: GeoPoint) -> String {
    format!("POINT Z ({} {} {})", p.lng, p.lat, p.elev)
}

pub fn linestring_z(line: &Polyline) -> String {
    format!("LINESTRING Z ({})", coord_seq(line))
}

pub fn multilinestring_z(parts: &[Polyline]) -> String {
    let inner: Vec<String> = parts.iter().map(|p| format!("({})", coord_seq(p))).collect();
    format!("MULTILINESTRING Z ({})", inner.join(", "))
}

/// WKT for an aggregated route geometry.
pub fn route_geometry(geometry: &RouteGeometry) -> String {
    match geometry {
        RouteGeometry::LineString(line)       => linestring_z(line),
        RouteGeometry::MultiLineString(parts) => multilinestring_z(parts),
    }
}

fn coord_seq(line: &Polyline) -> String {
    line.points
        .iter()
        .map(|p| format!("{} {} {}", p.lng, p.lat, p.elev))
        .collect::<Vec<_>>()
        .join(", ")
}
