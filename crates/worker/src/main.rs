use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inkseal_comfyui::api::ComfyUIApi;
use inkseal_pipeline::batch::BatchCoordinator;
use inkseal_worker::config::WorkerConfig;
use inkseal_worker::{presets, report};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let json_logs = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inkseal_worker=info,inkseal_pipeline=info,inkseal_comfyui=info".into()
            }),
        )
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    let config = WorkerConfig::from_env().context("invalid worker configuration")?;
    let descriptors = presets::resolve(config.batch_file.as_deref())
        .context("failed to load job descriptors")?;

    tracing::info!(
        comfyui_url = %config.comfyui_url,
        output_dir = %config.output_dir.display(),
        destinations = config.destination_dirs.len(),
        jobs = descriptors.len(),
        force_copy = config.force_copy,
        "Worker starting",
    );

    let service = Arc::new(ComfyUIApi::new(config.comfyui_url.clone()));
    let coordinator = BatchCoordinator::new(service, config.batch_config());

    let started_at = Utc::now();
    let batch = coordinator.run_batch(&descriptors).await;
    let finished_at = Utc::now();

    println!("{}", batch.summary());

    if let Some(path) = &config.report_file {
        report::write_report(path, started_at, finished_at, &batch)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        tracing::info!(path = %path.display(), "Report written");
    }

    if !batch.is_empty() && batch.materialized_count() == 0 {
        anyhow::bail!("no job in the batch produced an artifact");
    }
    Ok(())
}
