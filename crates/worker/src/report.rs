//! JSON run report written after a batch.

use std::path::Path;

use chrono::{DateTime, Utc};
use inkseal_pipeline::outcome::BatchReport;

/// Write `report` as pretty JSON to `path`, creating parent directories.
pub fn write_report(
    path: &Path,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    report: &BatchReport,
) -> std::io::Result<()> {
    let body = serde_json::json!({
        "started_at": started_at.to_rfc3339(),
        "finished_at": finished_at.to_rfc3339(),
        "total": report.len(),
        "materialized": report.materialized_count(),
        "items": report.items(),
    });

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let text = serde_json::to_string_pretty(&body).map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use inkseal_pipeline::outcome::{BatchOutcome, QueueStage};

    use super::*;

    #[test]
    fn report_file_lists_every_item() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports/run.json");

        let mut report = BatchReport::new();
        report.push(
            "idiom_logo_v1",
            BatchOutcome::QueueFailed {
                stage: QueueStage::Submit,
                reason: "connection refused".to_string(),
            },
        );
        report.push(
            "idiom_logo_v2",
            BatchOutcome::MaterializeFailed {
                source: PathBuf::from("/out/v2.png"),
                reason: "disk full".to_string(),
            },
        );

        let now = Utc::now();
        write_report(&path, now, now, &report).unwrap();

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["total"], 2);
        assert_eq!(json["materialized"], 0);
        assert_eq!(json["items"][0]["outcome"], "queue_failed");
        assert_eq!(json["items"][0]["stage"], "submit");
        assert_eq!(json["items"][1]["name"], "idiom_logo_v2");
    }
}
