//! `tr-output` — artifact writers for the trailrec engine.
//!
//! Backends behind one trait:
//!
//! | Feature  | Backend | Files created                                            |
//! |----------|---------|----------------------------------------------------------|
//! | *(none)* | CSV     | `trails.csv`, `segments.csv`, `vertices.csv`, `edges.csv`, `routes.csv` |
//! | *(none)* | GeoJSON | `trails.geojson`, `segments.geojson`, `vertices.geojson`, `edges.geojson`, `routes.geojson`, `summary.json` |
//! | `sqlite` | SQLite  | `trailrec.db`                                            |
//!
//! All backends implement [`ArtifactWriter`].  `finish()` is idempotent.
//!
//! # Id convention
//!
//! Graph ids are 0-based in memory; every backend writes the 1-based dense
//! ids the artifact contract specifies.  The conversion lives here and
//! nowhere else.

pub mod csv;
pub mod error;
pub mod geojson;
pub mod wkt;
pub mod writer;

#[cfg(feature = "sqlite")]
pub mod sqlite;

#[cfg(test)]
mod tests;

pub use crate::csv::CsvArtifactWriter;
pub use error::{OutputError, OutputResult};
pub use geojson::{GeoJsonWriter, read_trails};
pub use writer::ArtifactWriter;

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteWriter;
