//! REST API client for the ComfyUI HTTP endpoints.
//!
//! Wraps workflow submission (`POST /prompt`) and history retrieval
//! (`GET /history/{prompt_id}`) using [`reqwest`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use inkseal_core::graph::JobGraph;
use serde::Deserialize;

use crate::history::HistoryResponse;
use crate::service::{JobHandle, RenderService};

/// Per-request ceiling used by [`ComfyUIApi::new`].
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client for a single ComfyUI instance.
pub struct ComfyUIApi {
    client: reqwest::Client,
    api_url: String,
    client_id: String,
}

/// Response returned by the ComfyUI `/prompt` endpoint after
/// successfully queuing a workflow.
#[derive(Debug, Deserialize)]
pub struct SubmitResponse {
    /// Server-assigned identifier for the queued prompt.
    pub prompt_id: String,
    /// Position in the execution queue.
    #[serde(default)]
    pub number: i32,
    /// Per-node validation failures; non-empty means the prompt was refused.
    #[serde(default)]
    pub node_errors: HashMap<String, serde_json::Value>,
}

/// Errors from the ComfyUI REST API layer.
#[derive(Debug, thiserror::Error)]
pub enum ComfyUIApiError {
    /// The HTTP request itself failed (network, DNS, TLS, body decode).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// ComfyUI returned a non-2xx status code.
    #[error("ComfyUI API error ({status}): {body}")]
    ApiError {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// ComfyUI accepted the request but refused to queue the workflow.
    #[error("ComfyUI rejected the workflow: {0}")]
    Rejected(String),
}

impl ComfyUIApi {
    /// Create a new API client for a ComfyUI instance.
    ///
    /// * `api_url` - Base HTTP URL, e.g. `http://host:8188`.
    ///
    /// Each request is bounded by [`REQUEST_TIMEOUT`].
    pub fn new(api_url: impl Into<String>) -> Self {
        let client = match reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Failed to build HTTP client with request timeout, requests are unbounded",
                );
                reqwest::Client::new()
            }
        };
        Self::with_client(client, api_url)
    }

    /// Create an API client reusing an existing [`reqwest::Client`].
    pub fn with_client(client: reqwest::Client, api_url: impl Into<String>) -> Self {
        let api_url = api_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            api_url,
            client_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Submit a workflow for execution.
    ///
    /// Sends `POST /prompt` with `{"prompt": <graph>, "client_id": ...}`.
    /// A 2xx answer without a usable `prompt_id`, or with node errors, is
    /// reported as [`ComfyUIApiError::Rejected`].
    pub async fn submit_workflow(
        &self,
        workflow: &JobGraph,
        client_id: &str,
    ) -> Result<SubmitResponse, ComfyUIApiError> {
        let body = serde_json::json!({
            "prompt": workflow,
            "client_id": client_id,
        });

        let response = self
            .client
            .post(format!("{}/prompt", self.api_url))
            .json(&body)
            .send()
            .await?;

        let submitted: SubmitResponse = Self::parse_response(response).await?;

        if !submitted.node_errors.is_empty() {
            let nodes: Vec<&str> = submitted.node_errors.keys().map(String::as_str).collect();
            return Err(ComfyUIApiError::Rejected(format!(
                "node errors in {}",
                nodes.join(", ")
            )));
        }
        if submitted.prompt_id.trim().is_empty() {
            return Err(ComfyUIApiError::Rejected(
                "response carried an empty prompt_id".to_string(),
            ));
        }

        Ok(submitted)
    }

    /// Retrieve execution history for a specific prompt.
    ///
    /// Sends a `GET /history/{prompt_id}` request. The entry is absent
    /// until the server starts tracking the prompt.
    pub async fn get_history(&self, prompt_id: &str) -> Result<HistoryResponse, ComfyUIApiError> {
        let response = self
            .client
            .get(format!("{}/history/{}", self.api_url, prompt_id))
            .send()
            .await?;

        Self::parse_response(response).await
    }

    // ---- private helpers ----

    /// Ensure the response has a success status code. Returns the
    /// response unchanged on success, or a [`ComfyUIApiError::ApiError`]
    /// containing the status and body text on failure.
    async fn ensure_success(
        response: reqwest::Response,
    ) -> Result<reqwest::Response, ComfyUIApiError> {
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<unreadable body>".to_string());
            return Err(ComfyUIApiError::ApiError {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response)
    }

    /// Parse a successful JSON response body into the expected type.
    async fn parse_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ComfyUIApiError> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl RenderService for ComfyUIApi {
    async fn submit(&self, graph: &JobGraph) -> Result<JobHandle, ComfyUIApiError> {
        let response = self.submit_workflow(graph, &self.client_id).await?;
        tracing::debug!(
            prompt_id = %response.prompt_id,
            queue_position = response.number,
            "Workflow queued",
        );
        Ok(JobHandle::new(response.prompt_id))
    }

    async fn history(&self, handle: &JobHandle) -> Result<HistoryResponse, ComfyUIApiError> {
        self.get_history(handle.as_str()).await
    }
}
