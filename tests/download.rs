mod common;

use std::fs;
use std::time::Duration;

use assert_matches::assert_matches;

use liftmetrics::client::{DatasetClient, HttpDatasetClient};
use liftmetrics::config::{Config, ConfigLoader};
use liftmetrics::deadline::{CancelFlag, Deadline};
use liftmetrics::download::fetch_archive;
use liftmetrics::error::LiftError;

use common::{CannedResponse, serve, serve_stalled};

fn payload() -> Vec<u8> {
    (0..300_000u32).map(|i| (i * 31 % 256) as u8).collect()
}

#[test]
fn small_archive_is_buffered() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let body = payload();
    let (base, server) = serve(vec![CannedResponse {
        status: 200,
        body: body.clone(),
    }]);

    let client = HttpDatasetClient::new().unwrap();
    let info = client
        .download(&format!("{base}/archive.zip"), &dest, &Deadline::none())
        .unwrap();

    assert!(!info.streamed);
    assert_eq!(info.bytes_written, body.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), body);
    server.join().unwrap();
}

#[test]
fn large_archive_is_streamed_byte_for_byte() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let body = payload();
    let (base, server) = serve(vec![CannedResponse {
        status: 200,
        body: body.clone(),
    }]);

    let client = HttpDatasetClient::new()
        .unwrap()
        .with_stream_threshold(1024);
    let info = client
        .download(
            &format!("{base}/archive.zip"),
            &dest,
            &Deadline::after(Duration::from_secs(30)),
        )
        .unwrap();

    assert!(info.streamed);
    assert_eq!(info.content_length, Some(body.len() as u64));
    assert_eq!(info.bytes_written, body.len() as u64);
    assert_eq!(fs::metadata(&dest).unwrap().len(), body.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), body);
    server.join().unwrap();
}

#[test]
fn error_status_writes_nothing() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let (base, server) = serve(vec![CannedResponse {
        status: 404,
        body: b"missing".to_vec(),
    }]);

    let client = HttpDatasetClient::new().unwrap();
    let err = client
        .download(&format!("{base}/archive.zip"), &dest, &Deadline::none())
        .unwrap_err();

    assert_matches!(err, LiftError::HttpStatus { status: 404, .. });
    assert!(!dest.exists());
    server.join().unwrap();
}

#[test]
fn cancelled_download_never_sends() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let cancel = CancelFlag::new();
    cancel.cancel();

    let client = HttpDatasetClient::new().unwrap();
    let err = client
        .download(
            "http://127.0.0.1:9/archive.zip",
            &dest,
            &Deadline::none().with_cancel(cancel),
        )
        .unwrap_err();
    assert_matches!(err, LiftError::Cancelled(_));
}

#[test]
fn fetch_archive_clears_stale_csv_files() {
    let temp = tempfile::tempdir().unwrap();
    let stale = temp.path().join("openipf-2024-01-01-old.csv");
    let unrelated = temp.path().join("notes.txt");
    fs::write(&stale, b"old").unwrap();
    fs::write(&unrelated, b"keep").unwrap();

    let dest = temp.path().join("openipf-latest.zip");
    let client = common::MockClient::new(None, b"zipbytes".to_vec());
    let info = fetch_archive(&client, "http://unused", &dest, &Deadline::none()).unwrap();

    assert_eq!(info.bytes_written, 8);
    assert!(!stale.exists());
    assert!(unrelated.exists());
    assert_eq!(fs::read(&dest).unwrap(), b"zipbytes");
}

#[test]
fn configured_threshold_reaches_the_client() {
    let temp = tempfile::tempdir().unwrap();
    let config = ConfigLoader::resolve_config(Config {
        data_dir: Some(temp.path().to_str().unwrap().to_string()),
        stream_threshold_bytes: Some(1024),
        ..Config::default()
    })
    .unwrap();
    let body = payload();
    let (base, server) = serve(vec![CannedResponse {
        status: 200,
        body: body.clone(),
    }]);

    let client = HttpDatasetClient::from_config(&config).unwrap();
    let info = client
        .download(
            &format!("{base}/archive.zip"),
            config.archive_path().as_std_path(),
            &Deadline::after(Duration::from_secs(30)),
        )
        .unwrap();

    assert!(info.streamed);
    assert_eq!(fs::read(config.archive_path()).unwrap(), body);
    server.join().unwrap();
}

#[test]
fn stalled_stream_is_a_timeout() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let (base, server) = serve_stalled(100_000, vec![7u8; 100], Duration::from_secs(3));

    let client = HttpDatasetClient::new()
        .unwrap()
        .with_stream_threshold(10);
    let err = client
        .download(
            &format!("{base}/archive.zip"),
            &dest,
            &Deadline::after(Duration::from_millis(800)),
        )
        .unwrap_err();

    assert_matches!(err, LiftError::Timeout(_));
    assert!(!dest.exists());
    server.join().unwrap();
}

#[test]
fn stalled_buffered_body_is_a_timeout() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let (base, server) = serve_stalled(100_000, vec![7u8; 100], Duration::from_secs(3));

    let client = HttpDatasetClient::new().unwrap();
    let err = client
        .download(
            &format!("{base}/archive.zip"),
            &dest,
            &Deadline::after(Duration::from_millis(800)),
        )
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(!dest.exists());
    server.join().unwrap();
}

#[test]
fn truncated_stream_leaves_no_archive() {
    let temp = tempfile::tempdir().unwrap();
    let dest = temp.path().join("openipf-latest.zip");
    let (base, server) = serve_stalled(1000, vec![7u8; 10], Duration::ZERO);

    let client = HttpDatasetClient::new()
        .unwrap()
        .with_stream_threshold(10);
    let err = client
        .download(
            &format!("{base}/archive.zip"),
            &dest,
            &Deadline::after(Duration::from_secs(30)),
        )
        .unwrap_err();

    assert_matches!(err, LiftError::Network(_));
    assert!(!dest.exists());
    server.join().unwrap();
}
