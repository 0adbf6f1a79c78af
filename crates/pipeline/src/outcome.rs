//! Per-item batch outcomes and the run report.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::materialize::MaterializeMethod;

/// Stage at which an item failed to get queued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueueStage {
    /// The descriptor was rejected before any request was made.
    Build,
    /// The server refused the workflow or could not be reached.
    Submit,
}

/// Terminal result of one batch item.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum BatchOutcome {
    QueueFailed {
        stage: QueueStage,
        reason: String,
    },
    TimedOut {
        prompt_id: String,
        timeout_secs: u64,
    },
    ServiceError {
        prompt_id: String,
        diagnostic: String,
    },
    OutputMissing {
        prompt_id: String,
        filename: Option<String>,
        reason: String,
    },
    MaterializeFailed {
        source: PathBuf,
        reason: String,
    },
    Materialized {
        source: PathBuf,
        paths: Vec<PathBuf>,
        method: MaterializeMethod,
    },
}

impl BatchOutcome {
    pub fn is_materialized(&self) -> bool {
        matches!(self, BatchOutcome::Materialized { .. })
    }

    /// `true` for a materialized item that was copied without resizing.
    pub fn is_degraded(&self) -> bool {
        matches!(
            self,
            BatchOutcome::Materialized {
                method: MaterializeMethod::Copied,
                ..
            }
        )
    }

    /// Short label for the stage the item stopped at.
    pub fn label(&self) -> &'static str {
        match self {
            BatchOutcome::QueueFailed { .. } => "queue-failed",
            BatchOutcome::TimedOut { .. } => "timed-out",
            BatchOutcome::ServiceError { .. } => "service-error",
            BatchOutcome::OutputMissing { .. } => "output-missing",
            BatchOutcome::MaterializeFailed { .. } => "materialize-failed",
            BatchOutcome::Materialized { .. } => "materialized",
        }
    }
}

impl fmt::Display for BatchOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BatchOutcome::QueueFailed { stage, reason } => {
                let stage = match stage {
                    QueueStage::Build => "build",
                    QueueStage::Submit => "submit",
                };
                write!(f, "not queued ({stage}): {reason}")
            }
            BatchOutcome::TimedOut {
                prompt_id,
                timeout_secs,
            } => write!(f, "prompt {prompt_id} did not finish within {timeout_secs}s"),
            BatchOutcome::ServiceError {
                prompt_id,
                diagnostic,
            } => write!(f, "prompt {prompt_id} failed: {diagnostic}"),
            BatchOutcome::OutputMissing {
                prompt_id,
                filename,
                reason,
            } => match filename {
                Some(name) => write!(f, "prompt {prompt_id}: output '{name}' missing ({reason})"),
                None => write!(f, "prompt {prompt_id}: {reason}"),
            },
            BatchOutcome::MaterializeFailed { source, reason } => {
                write!(f, "could not write {}: {reason}", source.display())
            }
            BatchOutcome::Materialized {
                paths,
                method,
                ..
            } => {
                let paths: Vec<String> = paths.iter().map(|p| p.display().to_string()).collect();
                match method {
                    MaterializeMethod::Resized { width, height } => {
                        write!(f, "resized to {width}x{height}: {}", paths.join(", "))
                    }
                    MaterializeMethod::Copied => write!(
                        f,
                        "copied WITHOUT resize, source dimensions kept: {}",
                        paths.join(", ")
                    ),
                }
            }
        }
    }
}

/// One report line: the descriptor name and its outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchItem {
    pub name: String,
    #[serde(flatten)]
    pub outcome: BatchOutcome,
}

/// Outcomes of a batch run, in input order, one per descriptor.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchReport {
    items: Vec<BatchItem>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, outcome: BatchOutcome) {
        self.items.push(BatchItem {
            name: name.into(),
            outcome,
        });
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Outcome of the first item called `name`.
    pub fn get(&self, name: &str) -> Option<&BatchOutcome> {
        self.items
            .iter()
            .find(|item| item.name == name)
            .map(|item| &item.outcome)
    }

    pub fn items(&self) -> &[BatchItem] {
        &self.items
    }

    pub fn materialized_count(&self) -> usize {
        self.items
            .iter()
            .filter(|item| item.outcome.is_materialized())
            .count()
    }

    /// Multi-line human-readable summary.
    pub fn summary(&self) -> String {
        let width = self
            .items
            .iter()
            .map(|item| item.name.len())
            .max()
            .unwrap_or(0);

        let mut out = String::new();
        for item in &self.items {
            out.push_str(&format!(
                "{:<18} {:<width$}  {}\n",
                format!("[{}]", item.outcome.label()),
                item.name,
                item.outcome,
            ));
        }

        let degraded = self
            .items
            .iter()
            .filter(|item| item.outcome.is_degraded())
            .count();
        out.push_str(&format!(
            "{} of {} materialized",
            self.materialized_count(),
            self.len()
        ));
        if degraded > 0 {
            out.push_str(&format!(" ({degraded} without resize)"));
        }
        out
    }
}
