//! Chained fetch + removal, and the HTTP engine against a local service

mod common;

use common::{
    config_for, entries, fixed_time, sample_jpeg, sample_png, CannedResponse, FailingRemover,
    StubRemover, TestServer,
};
use cutout_pipeline::{BackgroundRemover, HttpBackend, Pipeline, PipelineError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

#[tokio::test]
async fn test_run_chains_both_stages() {
    let server = TestServer::start(CannedResponse::ok("image/jpeg", sample_jpeg())).await;
    let dir = TempDir::new().unwrap();
    let stub = StubRemover::returning(sample_png());
    let mut pipeline = Pipeline::new(config_for(dir.path()), Box::new(stub.clone())).unwrap();

    let run = pipeline
        .run(&server.url("/photo.jpg"), fixed_time())
        .await
        .unwrap();

    assert_eq!(run.source_path, PathBuf::from("images/image_20240101_120000.jpg"));
    assert_eq!(
        run.output_path,
        PathBuf::from("processed_images/image_20240101_120000_transparent.png")
    );
    assert_eq!(run.bytes_downloaded, sample_jpeg().len() as u64);
    assert_eq!(run.engine, "stub");
    assert_eq!(stub.call_count(), 1);

    assert_eq!(
        fs::read_to_string(dir.path().join("current_image.txt")).unwrap(),
        "images/image_20240101_120000.jpg"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("processed_image.txt")).unwrap(),
        "processed_images/image_20240101_120000_transparent.png"
    );
}

#[tokio::test]
async fn test_run_with_progress_bar() {
    let body: Vec<u8> = sample_jpeg().repeat(8);
    let server = TestServer::start(CannedResponse::ok("image/jpeg", body.clone())).await;
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(
        config_for(dir.path()),
        Box::new(StubRemover::returning(sample_png())),
    )
    .unwrap()
    .with_progress(true);

    let run = pipeline
        .run(&server.url("/photo.jpg"), fixed_time())
        .await
        .unwrap();

    assert_eq!(run.bytes_downloaded, body.len() as u64);
    assert_eq!(fs::read(dir.path().join(&run.source_path)).unwrap(), body);
    assert!(dir.path().join(&run.output_path).is_file());
}

#[tokio::test]
async fn test_failed_fetch_skips_removal() {
    let server = TestServer::start(CannedResponse::status(500)).await;
    let dir = TempDir::new().unwrap();
    let stub = StubRemover::returning(sample_png());
    let mut pipeline = Pipeline::new(config_for(dir.path()), Box::new(stub.clone())).unwrap();

    let err = pipeline
        .run(&server.url("/photo.jpg"), fixed_time())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::HttpStatus { status: 500, .. }));
    assert_eq!(stub.call_count(), 0);
    assert!(!dir.path().join("processed_image.txt").exists());
}

#[tokio::test]
async fn test_failed_removal_keeps_fetch_result() {
    let server = TestServer::start(CannedResponse::ok("image/jpeg", sample_jpeg())).await;
    let dir = TempDir::new().unwrap();
    let mut pipeline =
        Pipeline::new(config_for(dir.path()), Box::new(FailingRemover::default())).unwrap();

    assert!(pipeline
        .run(&server.url("/photo.jpg"), fixed_time())
        .await
        .is_err());

    assert_eq!(
        fs::read_to_string(dir.path().join("current_image.txt")).unwrap(),
        "images/image_20240101_120000.jpg"
    );
    assert!(!dir.path().join("processed_image.txt").exists());
    assert!(entries(&dir.path().join("processed_images")).is_empty());
}

#[tokio::test]
async fn test_separate_stages_communicate_through_sentinel() {
    let server = TestServer::start(CannedResponse::ok("image/jpeg", sample_jpeg())).await;
    let dir = TempDir::new().unwrap();
    let mut pipeline = Pipeline::new(
        config_for(dir.path()),
        Box::new(StubRemover::returning(sample_png())),
    )
    .unwrap();

    let fetched = pipeline
        .fetch(&server.url("/photo.jpg"), fixed_time())
        .await
        .unwrap();
    let removed = pipeline.remove().await.unwrap();

    assert_eq!(removed.input_path, fetched.path);
}

#[tokio::test]
async fn test_http_backend_uploads_multipart_image() {
    let server = TestServer::start(CannedResponse::ok("image/png", sample_png())).await;
    let mut backend = HttpBackend::new(&server.url("/remove-background")).unwrap();

    let output = backend.remove_background(&sample_jpeg()).await.unwrap();

    assert_eq!(output, sample_png());
    let requests = server.requests();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].head.starts_with("POST /remove-background HTTP/1.1"));
    assert!(requests[0]
        .head
        .to_ascii_lowercase()
        .contains("content-type: multipart/form-data"));

    let body = String::from_utf8_lossy(&requests[0].body);
    assert!(body.contains("name=\"image\""));
    assert!(body.contains("image/jpeg"));
}

#[tokio::test]
async fn test_http_backend_error_status_is_processing_error() {
    let server = TestServer::start(CannedResponse::status(502)).await;
    let mut backend = HttpBackend::new(&server.url("/remove-background")).unwrap();

    let err = backend.remove_background(&sample_jpeg()).await.unwrap_err();

    match err {
        PipelineError::Processing(message) => {
            assert!(message.contains("502"));
            assert!(message.contains("nope"));
        },
        other => panic!("expected Processing, got {other:?}"),
    }
}
