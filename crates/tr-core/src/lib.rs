//! `tr-core` — foundational types for the trailrec route-recommendation engine.
//!
//! This crate is a dependency of every other `tr-*` crate.  It intentionally
//! has no `tr-*` dependencies and minimal external ones (only `serde` and
//! `thiserror`).
//!
//! # What lives here
//!
//! | Module      | Contents                                                  |
//! |-------------|-----------------------------------------------------------|
//! | [`ids`]     | `VertexId`, `EdgeId`, `ComponentId`                       |
//! | [`geo`]     | `GeoPoint`, equirectangular distance, `BBox`              |
//! | [`config`]  | `EngineConfig`, `LollipopConfig`, `TrailheadSpec`         |
//! | [`cancel`]  | `CancelToken` — cooperative cancellation                  |
//! | [`summary`] | `RunSummary`, per-stage timings, drop counters            |
//! | [`error`]   | `CoreError`, `CoreResult`                                 |

pub mod cancel;
pub mod config;
pub mod error;
pub mod geo;
pub mod ids;
pub mod summary;


// ── Re-exports ────────────────────────────────────────────────────────────────

pub use cancel::CancelToken;
pub use config::{EndpointSelection, EngineConfig, LollipopConfig, TrailheadSpec};
pub use error::{CoreError, CoreResult};
pub use geo::{BBox, GeoPoint, EARTH_RADIUS_M};
pub use ids::{ComponentId, EdgeId, VertexId};
pub use summary::{RunSummary, SampleCounter, StageTiming};
