//! `tr-route` — Layer 3 of the trailrec engine: route generation.
//!
//! # Crate layout
//!
//! | Module        | Contents                                                 |
//! |---------------|----------------------------------------------------------|
//! | [`dijkstra`]  | `Dijkstra` searcher, `GraphPath`, reachability scan      |
//! | [`ksp`]       | Yen's K-shortest simple paths                            |
//! | [`cycles`]    | Bounded simple-cycle enumeration                         |
//! | [`endpoints`] | `EndpointSelector` — trailheads / boundary vertices      |
//! | [`pattern`]   | `RoutePattern`, `RouteShape`, tolerance ladder, scoring  |
//! | [`route`]     | `RouteRecommendation`, deterministic uuid, geometry      |
//! | [`dedup`]     | Trail-set Jaccard deduplication                          |
//! | [`search`]    | `RouteSearch` — per-pattern orchestration                |
//! | [`error`]     | `RouteError`, `RouteResult<T>`                           |
//!
//! # Determinism
//!
//! Every algorithm breaks ties on vertex/edge id, candidate lists are
//! sorted before acceptance, and parallel per-anchor results are merged in
//! anchor order, so identical inputs yield identical routes and route ids.

pub mod cycles;
pub mod dedup;
pub mod dijkstra;
pub mod endpoints;
pub mod error;
pub mod ksp;
pub mod pattern;
pub mod route;
pub mod search;


pub use cycles::CycleEnumerator;
pub use dedup::{RouteDeduper, jaccard};
pub use dijkstra::{Dijkstra, GraphPath};
pub use endpoints::{EndpointSelector, EndpointSet};
pub use error::{RouteError, RouteResult};
pub use ksp::k_shortest_paths;
pub use pattern::{RoutePattern, RouteShape};
pub use route::{RouteGeometry, RouteRecommendation};
pub use search::{RouteSearch, SearchOutcome};
