//! Typed records returned by the ComfyUI `/history/{prompt_id}` endpoint.
//!
//! The response is a JSON object keyed by prompt ID. An entry only
//! appears once the server has started tracking the prompt, so an empty
//! object is a normal "still pending" answer.

use std::collections::{BTreeMap, HashMap};

use serde::Deserialize;

/// Raw `/history/{prompt_id}` response body.
pub type HistoryResponse = HashMap<String, JobHistory>;

/// Maximum length of a fallback diagnostic built from the raw status.
const MAX_DIAGNOSTIC_LEN: usize = 500;

/// Execution record for one prompt.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct JobHistory {
    #[serde(default)]
    pub status: HistoryStatus,
    /// Produced outputs keyed by node ID.
    #[serde(default)]
    pub outputs: BTreeMap<String, NodeOutput>,
}

/// Status block of a history entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HistoryStatus {
    #[serde(default)]
    pub completed: bool,
    #[serde(default)]
    pub status_str: String,
    /// Event log entries, each shaped `["<event>", {...}]`.
    #[serde(default)]
    pub messages: Vec<serde_json::Value>,
}

/// Coarse classification of a [`HistoryStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Pending,
    Success,
    Error,
}

/// Outputs produced by a single node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NodeOutput {
    #[serde(default)]
    pub images: Vec<OutputFile>,
}

/// A file written by the server into its output directory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputFile {
    pub filename: String,
    /// Subdirectory under the output root; empty for the root itself.
    #[serde(default)]
    pub subfolder: String,
    #[serde(default, rename = "type")]
    pub kind: String,
}

impl HistoryStatus {
    /// An explicit `"error"` wins over the `completed` flag.
    pub fn kind(&self) -> StatusKind {
        match self.status_str.as_str() {
            "error" => StatusKind::Error,
            "success" => StatusKind::Success,
            _ if self.completed => StatusKind::Success,
            _ => StatusKind::Pending,
        }
    }

    /// Human-readable description of a failed execution.
    ///
    /// Prefers the `exception_message` of an `execution_error` event;
    /// otherwise falls back to the serialized status, truncated.
    pub fn diagnostic(&self) -> String {
        let error_event = self.messages.iter().find_map(|msg| {
            let pair = msg.as_array()?;
            if pair.first()?.as_str()? != "execution_error" {
                return None;
            }
            pair.get(1)
        });

        if let Some(data) = error_event {
            let message = data
                .get("exception_message")
                .and_then(|v| v.as_str())
                .unwrap_or("unknown error")
                .trim();
            let node_type = data.get("node_type").and_then(|v| v.as_str());
            let node_id = data.get("node_id").and_then(|v| v.as_str());
            return match (node_type, node_id) {
                (Some(t), Some(id)) => format!("{t} (node {id}): {message}"),
                (None, Some(id)) => format!("node {id}: {message}"),
                _ => message.to_string(),
            };
        }

        let raw = serde_json::json!({
            "status_str": self.status_str,
            "completed": self.completed,
            "messages": self.messages,
        })
        .to_string();
        truncate(&raw, MAX_DIAGNOSTIC_LEN)
    }
}

impl JobHistory {
    /// The first produced file, scanning nodes in numeric ID order.
    ///
    /// Only the first image of the first node that produced any output is
    /// considered; further outputs are ignored.
    pub fn first_output(&self) -> Option<&OutputFile> {
        let mut nodes: Vec<(&String, &NodeOutput)> = self.outputs.iter().collect();
        nodes.sort_by_key(|(id, _)| node_sort_key(id));
        nodes
            .into_iter()
            .find_map(|(_, output)| output.images.first())
    }
}

fn node_sort_key(id: &str) -> (bool, u64, String) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, String::new()),
        Err(_) => (true, 0, id.to_string()),
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        return text.to_string();
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> HistoryResponse {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn empty_response_has_no_entry() {
        assert!(parse("{}").get("abc").is_none());
    }

    #[test]
    fn success_entry_parses_outputs() {
        let resp = parse(
            r#"{"abc":{"status":{"completed":true,"status_str":"success","messages":[]},
                "outputs":{"9":{"images":[{"filename":"logo_00001_.png","subfolder":"","type":"output"}]}}}}"#,
        );
        let entry = &resp["abc"];
        assert_eq!(entry.status.kind(), StatusKind::Success);
        let file = entry.first_output().unwrap();
        assert_eq!(file.filename, "logo_00001_.png");
        assert_eq!(file.kind, "output");
    }

    #[test]
    fn completed_flag_alone_counts_as_success() {
        let status = HistoryStatus {
            completed: true,
            ..Default::default()
        };
        assert_eq!(status.kind(), StatusKind::Success);
    }

    #[test]
    fn error_wins_over_completed() {
        let status = HistoryStatus {
            completed: true,
            status_str: "error".to_string(),
            messages: vec![],
        };
        assert_eq!(status.kind(), StatusKind::Error);
    }

    #[test]
    fn unknown_status_is_pending() {
        let status = HistoryStatus {
            status_str: "running".to_string(),
            ..Default::default()
        };
        assert_eq!(status.kind(), StatusKind::Pending);
    }

    #[test]
    fn diagnostic_prefers_execution_error_message() {
        let resp = parse(
            r#"{"p":{"status":{"completed":false,"status_str":"error","messages":[
                ["execution_start",{"prompt_id":"p"}],
                ["execution_error",{"node_id":"6","node_type":"KSampler","exception_message":"CUDA out of memory\n"}]
            ]}}}"#,
        );
        assert_eq!(
            resp["p"].status.diagnostic(),
            "KSampler (node 6): CUDA out of memory"
        );
    }

    #[test]
    fn diagnostic_falls_back_to_raw_status() {
        let status = HistoryStatus {
            status_str: "error".to_string(),
            ..Default::default()
        };
        let diag = status.diagnostic();
        assert!(diag.contains("\"status_str\":\"error\""));
    }

    #[test]
    fn diagnostic_is_truncated() {
        let status = HistoryStatus {
            status_str: "error".to_string(),
            completed: false,
            messages: vec![serde_json::json!(["other", "x".repeat(2000)])],
        };
        let diag = status.diagnostic();
        assert!(diag.len() <= MAX_DIAGNOSTIC_LEN + 3);
        assert!(diag.ends_with("..."));
    }

    #[test]
    fn first_output_skips_nodes_without_images() {
        let resp = parse(
            r#"{"p":{"status":{"status_str":"success"},
                "outputs":{"3":{"images":[]},"12":{"images":[{"filename":"late.png"}]},"9":{"images":[{"filename":"first.png"},{"filename":"second.png"}]}}}}"#,
        );
        assert_eq!(resp["p"].first_output().unwrap().filename, "first.png");
    }

    #[test]
    fn no_outputs_yields_none() {
        let resp = parse(r#"{"p":{"status":{"status_str":"success"}}}"#);
        assert!(resp["p"].first_output().is_none());
    }

    #[test]
    fn non_image_outputs_ignored() {
        let resp = parse(
            r#"{"p":{"status":{"status_str":"success"},"outputs":{"4":{"text":["hello"]}}}}"#,
        );
        assert!(resp["p"].first_output().is_none());
    }
}
