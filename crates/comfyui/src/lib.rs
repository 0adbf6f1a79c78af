//! ComfyUI REST client library.
//!
//! Provides the HTTP API wrapper for workflow submission and history
//! retrieval, typed history records, the [`service::RenderService`]
//! seam used by the batch pipeline, and the completion poller.

pub mod api;
pub mod history;
pub mod poller;
pub mod service;
