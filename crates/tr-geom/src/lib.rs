//! `tr-geom` — Layer 1 of the trailrec engine: trail geometry.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                 |
//! |----------------|----------------------------------------------------------|
//! | [`trail`]      | `RawTrail`, `Trail`, `Segment`, `ElevationStats`         |
//! | [`polyline`]   | `Polyline` ops: length, chainage, simplicity, splitting  |
//! | [`preprocess`] | `GeometryPreprocessor` — fixed-point cleaning loop       |
//! | [`split`]      | `TrailSplitter` — split at pairwise true intersections   |
//! | [`error`]      | `GeomError`, `GeomResult<T>`                             |
//!
//! The output of this crate (a set of [`Segment`]s with simple, valid,
//! non-duplicated LineString geometry) is the input contract of `tr-graph`.

pub mod error;
pub mod polyline;
pub mod preprocess;
pub mod split;
pub mod trail;

#[cfg(test)]
mod tests;

pub use error::{GeomError, GeomResult};
pub use polyline::{Polyline, SegSegIntersection};
pub use preprocess::{GeometryPreprocessor, PassCounts, PreprocessReport};
pub use split::{SplitReport, TrailSplitter};
pub use trail::{ElevationStats, Geometry, RawTrail, Segment, Trail, TrailAttributes};
