//! Domain types for the inkseal batch generator.
//!
//! Pure logic only: job descriptors, sampling defaults, and the
//! deterministic job-graph builder. Nothing in this crate touches the
//! network or the filesystem.

pub mod descriptor;
pub mod error;
pub mod graph;
