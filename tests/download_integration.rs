//! Integration tests for the download engine against a mock descriptor host.
//!
//! These cover the engine's observable contract: idempotent reruns, bounded
//! retry with the original identifier, and failure collection.

use std::time::Duration;

use harvester_core::download::partial_path;
use harvester_core::{
    DescriptorSource, DownloadEngine, DownloadTask, HttpClient, Identifier, Pacing, RetryPolicy,
    SaveDir,
};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

mod support;
use support::archive::{descriptor_body, descriptor_path, identifiers, mount_descriptors};
use support::socket_guard::start_mock_server_or_skip;

macro_rules! require_mock_server {
    () => {{
        let Some(mock_server) = start_mock_server_or_skip().await else {
            return;
        };
        mock_server
    }};
}

fn engine(server: &MockServer, dir: &TempDir, workers: usize, max_retries: u32) -> DownloadEngine {
    let task = DownloadTask::new(
        HttpClient::with_timeouts(Duration::from_secs(5), Duration::from_secs(5)).unwrap(),
        DescriptorSource::new(&server.uri()).unwrap(),
        SaveDir::new(dir.path()),
    )
    .with_pacing(Pacing::disabled());
    DownloadEngine::new(workers, RetryPolicy::with_max_retries(max_retries), task).unwrap()
}

fn to_identifiers(ids: &[String]) -> Vec<Identifier> {
    ids.iter().map(|id| Identifier::from(id.as_str())).collect()
}

#[tokio::test]
async fn test_download_all_writes_every_descriptor() {
    let server = require_mock_server!();
    let ids = identifiers("78_item", 20);
    mount_descriptors(&server, &ids, 1).await;
    let dir = TempDir::new().unwrap();

    let report = engine(&server, &dir, 8, 3)
        .download_all(&to_identifiers(&ids))
        .await;

    assert_eq!(report.succeeded().len(), 20);
    assert!(report.is_complete());
    for id in &ids {
        let file = dir.path().join(format!("{id}.torrent"));
        assert_eq!(std::fs::read(&file).unwrap(), descriptor_body(id));
        assert!(!partial_path(&file).exists());
    }
}

#[tokio::test]
async fn test_second_run_skips_everything_without_requests() {
    let server = require_mock_server!();
    let ids = identifiers("78_item", 5);
    mount_descriptors(&server, &ids, 1).await;
    let dir = TempDir::new().unwrap();
    let wanted = to_identifiers(&ids);

    let first = engine(&server, &dir, 4, 3).download_all(&wanted).await;
    assert_eq!(first.succeeded().len(), 5);
    server.verify().await;

    server.reset().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let second = engine(&server, &dir, 4, 3).download_all(&wanted).await;
    assert_eq!(second.skipped().len(), 5);
    assert!(second.succeeded().is_empty());
    assert!(second.is_complete());
}

#[tokio::test]
async fn test_retry_budget_exhaustion_yields_one_failure() {
    let server = require_mock_server!();
    // One attempt plus three retries, all against the same identifier.
    Mock::given(method("GET"))
        .and(path(descriptor_path("flaky")))
        .respond_with(ResponseTemplate::new(503))
        .expect(4)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let report = engine(&server, &dir, 2, 3)
        .download_all(&[Identifier::from("flaky")])
        .await;

    assert_eq!(report.failed().len(), 1);
    assert_eq!(report.failed()["flaky"].retries, 3);
    assert_eq!(report.retries(), 3);
    assert!(!dir.path().join("flaky.torrent").exists());
}

#[tokio::test]
async fn test_transient_failure_recovers_on_retry() {
    let server = require_mock_server!();
    Mock::given(method("GET"))
        .and(path(descriptor_path("late")))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(descriptor_path("late")))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(descriptor_body("late")))
        .expect(1)
        .mount(&server)
        .await;
    let dir = TempDir::new().unwrap();

    let report = engine(&server, &dir, 1, 3)
        .download_all(&[Identifier::from("late")])
        .await;

    assert!(report.succeeded().contains("late"));
    assert_eq!(report.retries(), 2);
}

#[tokio::test]
async fn test_mixed_outcomes_are_partitioned() {
    let server = require_mock_server!();
    let good = identifiers("good", 3);
    mount_descriptors(&server, &good, 1).await;
    Mock::given(method("GET"))
        .and(path(descriptor_path("missing")))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path(descriptor_path("down")))
        .respond_with(ResponseTemplate::new(503))
        .expect(2)
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("cached.torrent"), b"already here").unwrap();

    let mut wanted = to_identifiers(&good);
    wanted.extend(["missing", "down", "cached"].map(Identifier::from));

    let report = engine(&server, &dir, 3, 1).download_all(&wanted).await;

    assert_eq!(report.total(), 6);
    assert_eq!(report.succeeded().len(), 3);
    assert!(report.skipped().contains("cached"));
    let failed: Vec<String> = report
        .failed_identifiers()
        .into_iter()
        .map(|id| id.to_string())
        .collect();
    assert_eq!(failed, vec!["down", "missing"]);
    assert_eq!(report.failed()["missing"].retries, 0);
    assert_eq!(report.failed()["down"].retries, 1);
}

#[tokio::test]
async fn test_worker_limit_bounds_parallel_requests() {
    let server = require_mock_server!();
    let ids = identifiers("slow", 4);
    for id in &ids {
        Mock::given(method("GET"))
            .and(path(descriptor_path(id)))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_bytes(descriptor_body(id))
                    .set_delay(Duration::from_millis(200)),
            )
            .mount(&server)
            .await;
    }
    let dir = TempDir::new().unwrap();

    let started = std::time::Instant::now();
    let report = engine(&server, &dir, 2, 0)
        .download_all(&to_identifiers(&ids))
        .await;

    assert_eq!(report.succeeded().len(), 4);
    // Two waves of two requests each.
    assert!(started.elapsed() >= Duration::from_millis(400));
}
