//! `tr-pipeline` — the staged runner tying the three layers together.
//!
//! | Module       | Contents                                        |
//! |--------------|-------------------------------------------------|
//! | [`pipeline`] | `Pipeline`, `PipelineArtifacts`                 |
//! | [`error`]    | `PipelineError`, `PipelineResult<T>`            |
//!
//! The pipeline is a linear sequence of synchronous stages communicating by
//! value; each stage's report is folded into one [`RunSummary`] returned
//! alongside the artifacts.  Cancellation is checked between stages (the
//! stages themselves check it in their inner loops); on cancel the
//! completed portion comes back with `summary.cancelled` set and nothing is
//! meant to be persisted.

pub mod error;
pub mod pipeline;

#[cfg(test)]
mod tests;

pub use error::{PipelineError, PipelineResult};
pub use pipeline::{Pipeline, PipelineArtifacts};

pub use tr_core::RunSummary;
