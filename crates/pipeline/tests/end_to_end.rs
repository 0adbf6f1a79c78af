//! Full pipeline against a mock ComfyUI HTTP server.

use std::sync::Arc;
use std::time::Duration;

use httpmock::MockServer;
use inkseal_comfyui::api::ComfyUIApi;
use inkseal_comfyui::poller::PollConfig;
use inkseal_core::descriptor::JobDescriptor;
use inkseal_pipeline::batch::{BatchConfig, BatchCoordinator};
use inkseal_pipeline::materialize::ResizeCapability;
use inkseal_pipeline::outcome::BatchOutcome;

#[tokio::test]
async fn one_success_one_service_error() {
    let server = MockServer::start_async().await;

    server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/prompt")
                .body_includes(r#""filename_prefix":"a""#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"prompt_id":"pa","number":0,"node_errors":{}}"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("POST")
                .path("/prompt")
                .body_includes(r#""filename_prefix":"b""#);
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"prompt_id":"pb","number":1,"node_errors":{}}"#);
        })
        .await;
    let history_a = server
        .mock_async(|when, then| {
            when.method("GET").path("/history/pa");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"pa":{"status":{"completed":true,"status_str":"success","messages":[]},
                    "outputs":{"9":{"images":[{"filename":"a.png","subfolder":"","type":"output"}]}}}}"#);
        })
        .await;
    server
        .mock_async(|when, then| {
            when.method("GET").path("/history/pb");
            then.status(200)
                .header("content-type", "application/json")
                .body(r#"{"pb":{"status":{"completed":false,"status_str":"error","messages":[
                    ["execution_error",{"node_id":"6","node_type":"KSampler","exception_message":"sampler exploded"}]]}}}"#);
        })
        .await;

    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("output");
    std::fs::create_dir_all(&root).unwrap();
    std::fs::write(root.join("a.png"), b"not decoded on the copy path").unwrap();

    let mut config = BatchConfig::new(
        &root,
        vec![dir.path().join("d1"), dir.path().join("d2")],
    );
    config.poll = PollConfig {
        interval: Duration::from_millis(10),
        timeout: Duration::from_secs(10),
    };
    config.resize = ResizeCapability::Unavailable;

    let coordinator = BatchCoordinator::new(Arc::new(ComfyUIApi::new(server.base_url())), config);
    let report = coordinator
        .run_batch(&[
            JobDescriptor::new("a", 1, "clip a", "t5 a"),
            JobDescriptor::new("b", 2, "clip b", "t5 b"),
        ])
        .await;

    assert_eq!(report.len(), 2);
    match report.get("a").unwrap() {
        BatchOutcome::Materialized { paths, .. } => {
            assert_eq!(paths.len(), 2);
            assert!(paths.iter().all(|p| p.is_file()));
        }
        other => panic!("Expected Materialized, got {other:?}"),
    }
    match report.get("b").unwrap() {
        BatchOutcome::ServiceError { diagnostic, .. } => {
            assert!(diagnostic.contains("sampler exploded"));
        }
        other => panic!("Expected ServiceError, got {other:?}"),
    }
    history_a.assert_async().await;
}
