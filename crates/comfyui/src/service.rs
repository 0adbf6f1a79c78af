//! The rendering-service seam.
//!
//! The batch pipeline and the poller only need two calls from the
//! server: enqueue a workflow and read its history. [`RenderService`]
//! captures exactly that so tests can substitute scripted fakes for
//! [`ComfyUIApi`](crate::api::ComfyUIApi).

use std::fmt;

use async_trait::async_trait;
use inkseal_core::graph::JobGraph;

use crate::api::ComfyUIApiError;
use crate::history::HistoryResponse;

/// Server-assigned identifier of a queued prompt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(prompt_id: impl Into<String>) -> Self {
        Self(prompt_id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Minimal job API of an image-rendering server.
#[async_trait]
pub trait RenderService: Send + Sync {
    /// Enqueue `graph` and return its handle.
    async fn submit(&self, graph: &JobGraph) -> Result<JobHandle, ComfyUIApiError>;

    /// Fetch the history document for `handle`.
    async fn history(&self, handle: &JobHandle) -> Result<HistoryResponse, ComfyUIApiError>;
}
