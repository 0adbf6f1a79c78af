//! Sequential batch coordinator.
//!
//! Each descriptor is driven through build, submit, poll, locate and
//! materialize before the next one starts. Every failure is converted
//! into a [`BatchOutcome`] for that item; [`BatchCoordinator::run_batch`]
//! itself never fails and always reports one entry per descriptor.

use std::path::PathBuf;
use std::sync::Arc;

use inkseal_comfyui::poller::{await_completion, PollConfig, PollOutcome};
use inkseal_comfyui::service::RenderService;
use inkseal_core::descriptor::{JobDescriptor, NameRegistry};
use inkseal_core::graph::build_graph;

use crate::locator::locate;
use crate::materialize::{Materializer, ResizeCapability};
use crate::outcome::{BatchOutcome, BatchReport, QueueStage};

/// Default edge length of materialized images.
pub const DEFAULT_TARGET_SIZE: u32 = 600;

/// Everything the coordinator needs to know about paths and timing.
#[derive(Debug, Clone)]
pub struct BatchConfig {
    /// Directory the rendering server writes its outputs into.
    pub output_root: PathBuf,
    /// Directories that each receive a copy of every artifact.
    pub destinations: Vec<PathBuf>,
    /// Prepended to `<name>.png` for destination filenames.
    pub file_prefix: String,
    pub target_width: u32,
    pub target_height: u32,
    pub poll: PollConfig,
    pub resize: ResizeCapability,
}

impl BatchConfig {
    pub fn new(output_root: impl Into<PathBuf>, destinations: Vec<PathBuf>) -> Self {
        Self {
            output_root: output_root.into(),
            destinations,
            file_prefix: String::new(),
            target_width: DEFAULT_TARGET_SIZE,
            target_height: DEFAULT_TARGET_SIZE,
            poll: PollConfig::default(),
            resize: ResizeCapability::detect(),
        }
    }

    /// Destination file paths for the job called `name`.
    pub fn destination_paths(&self, name: &str) -> Vec<PathBuf> {
        let file_name = format!("{}{}.png", self.file_prefix, name);
        self.destinations
            .iter()
            .map(|dir| dir.join(&file_name))
            .collect()
    }
}

/// Drives a list of descriptors through the render service one by one.
pub struct BatchCoordinator {
    service: Arc<dyn RenderService>,
    config: BatchConfig,
    materializer: Materializer,
}

impl BatchCoordinator {
    pub fn new(service: Arc<dyn RenderService>, config: BatchConfig) -> Self {
        let materializer = Materializer::new(config.resize);
        if config.resize == ResizeCapability::Available
            && materializer.capability() == ResizeCapability::Unavailable
        {
            tracing::warn!("Built without resize support, artifacts will be copied as-is");
        }
        Self {
            service,
            config,
            materializer,
        }
    }

    /// Run every descriptor in order and collect one outcome per item.
    pub async fn run_batch(&self, descriptors: &[JobDescriptor]) -> BatchReport {
        tracing::info!(
            count = descriptors.len(),
            timeout_secs = self.config.poll.timeout.as_secs(),
            "Starting batch",
        );

        let mut registry = NameRegistry::new();
        let mut report = BatchReport::new();

        for (index, descriptor) in descriptors.iter().enumerate() {
            tracing::info!(
                job = %descriptor.name,
                seed = descriptor.seed,
                position = index + 1,
                total = descriptors.len(),
                "Processing job",
            );
            let outcome = self.run_item(descriptor, &mut registry).await;
            match &outcome {
                BatchOutcome::Materialized { .. } => {
                    tracing::info!(job = %descriptor.name, result = %outcome, "Job done");
                }
                _ => {
                    tracing::warn!(
                        job = %descriptor.name,
                        stage = outcome.label(),
                        result = %outcome,
                        "Job did not complete",
                    );
                }
            }
            report.push(descriptor.name.clone(), outcome);
        }

        tracing::info!(
            materialized = report.materialized_count(),
            total = report.len(),
            "Batch finished",
        );
        report
    }

    async fn run_item(
        &self,
        descriptor: &JobDescriptor,
        registry: &mut NameRegistry,
    ) -> BatchOutcome {
        let name = descriptor.name.as_str();

        // Only a descriptor that builds reserves its name.
        let graph = match build_graph(descriptor)
            .and_then(|graph| registry.claim(name).map(|()| graph))
        {
            Ok(graph) => graph,
            Err(e) => {
                return BatchOutcome::QueueFailed {
                    stage: QueueStage::Build,
                    reason: e.to_string(),
                }
            }
        };

        let handle = match self.service.submit(&graph).await {
            Ok(handle) => handle,
            Err(e) => {
                return BatchOutcome::QueueFailed {
                    stage: QueueStage::Submit,
                    reason: e.to_string(),
                }
            }
        };
        tracing::info!(job = name, prompt_id = %handle, "Queued");

        let history = match await_completion(self.service.as_ref(), &handle, &self.config.poll).await
        {
            PollOutcome::Completed(history) => history,
            PollOutcome::ServiceError(diagnostic) => {
                return BatchOutcome::ServiceError {
                    prompt_id: handle.to_string(),
                    diagnostic,
                }
            }
            PollOutcome::TimedOut { timeout, .. } => {
                return BatchOutcome::TimedOut {
                    prompt_id: handle.to_string(),
                    timeout_secs: timeout.as_secs(),
                }
            }
        };

        let source = match locate(&self.config.output_root, &history) {
            Ok(path) => path,
            Err(e) => {
                return BatchOutcome::OutputMissing {
                    prompt_id: handle.to_string(),
                    filename: e.filename().map(str::to_string),
                    reason: e.to_string(),
                }
            }
        };
        tracing::debug!(job = name, source = %source.display(), "Output located");

        let destinations = self.config.destination_paths(name);
        let materializer = self.materializer;
        let (width, height) = (self.config.target_width, self.config.target_height);
        let src = source.clone();

        let result = tokio::task::spawn_blocking(move || {
            materializer.materialize(&src, &destinations, width, height)
        })
        .await;

        match result {
            Ok(Ok(done)) => BatchOutcome::Materialized {
                source,
                paths: done.paths,
                method: done.method,
            },
            Ok(Err(e)) => BatchOutcome::MaterializeFailed {
                source,
                reason: e.to_string(),
            },
            Err(e) => BatchOutcome::MaterializeFailed {
                source,
                reason: format!("materialize task failed: {e}"),
            },
        }
    }
}
