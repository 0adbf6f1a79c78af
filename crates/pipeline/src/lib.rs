//! Batch generation pipeline.
//!
//! Drives each job descriptor through submission, completion polling,
//! output location and materialization, isolating failures per item.

pub mod batch;
pub mod locator;
pub mod materialize;
pub mod outcome;
