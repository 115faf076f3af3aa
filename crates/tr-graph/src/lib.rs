//! `tr-graph` — Layer 2 of the trailrec engine: the routing graph.
//!
//! # Crate layout
//!
//! | Module         | Contents                                                |
//! |----------------|---------------------------------------------------------|
//! | [`graph`]      | `TrailGraph` (CSR + R-tree), `TrailGraphBuilder`        |
//! | [`noder`]      | `Noder` — endpoint clustering, dense ids, edge attrs    |
//! | [`components`] | `ComponentFinder` — connected-component labels          |
//! | [`error`]      | `GraphError`, `GraphResult<T>`                          |
//!
//! # Data layout
//!
//! Vertices and edges live in contiguous index-addressable arrays; all
//! relations are integer ids, never references, so the vertex↔edge cycle is
//! expressed as data.  See [`graph`] for the CSR layout.

pub mod components;
pub mod error;
pub mod graph;
pub mod noder;

#[cfg(test)]
mod tests;

pub use components::{ComponentFinder, ComponentSummary};
pub use error::{GraphError, GraphResult};
pub use graph::{TrailGraph, TrailGraphBuilder, VertexClass};
pub use noder::{Noder, NoderReport};
