//! Tests for the address-list producers

use std::time::Duration;

use switchyard::error::ConfigError;
use switchyard::producer::{emit_batch, filter_addresses, reload_file, run_static, validate_all, watch_file};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

fn owned(addrs: &[&str]) -> Vec<String> {
    addrs.iter().map(|s| s.to_string()).collect()
}

/// Read until a blank line ends a batch.
async fn read_batch<R: AsyncRead + Unpin>(reader: &mut R) -> String {
    let mut out = Vec::new();
    let mut byte = [0u8; 1];
    timeout(Duration::from_secs(5), async {
        while !out.ends_with(b"\n\n") {
            reader.read_exact(&mut byte).await.unwrap();
            out.push(byte[0]);
        }
    })
    .await
    .expect("no batch written");
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn test_emit_batch_ends_with_blank_line() {
    let mut out: Vec<u8> = Vec::new();
    emit_batch(&mut out, &owned(&["10.0.0.1:9000", "10.0.0.2:9000"]))
        .await
        .unwrap();
    assert_eq!(out, b"10.0.0.1:9000\n10.0.0.2:9000\n\n");
}

#[tokio::test]
async fn test_validate_all_stops_on_bad_address() {
    assert!(validate_all(&owned(&["127.0.0.1:80", "[::1]:443"])).await.is_ok());

    let err = validate_all(&owned(&["127.0.0.1:80", "nope"])).await.unwrap_err();
    match err {
        ConfigError::BadAddress { addr, .. } => assert_eq!(addr, "nope"),
        other => panic!("unexpected error {other:?}"),
    }
}

#[tokio::test]
async fn test_filter_drops_comments_blanks_and_invalid_lines() {
    let contents = "# backends\n127.0.0.1:80\n\n   127.0.0.1:81  \nbogus\n#127.0.0.1:82\n";
    let addrs = filter_addresses(contents).await;
    assert_eq!(addrs, ["127.0.0.1:80", "127.0.0.1:81"]);
}

#[tokio::test]
async fn test_reload_file_writes_batch() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backends");
    std::fs::write(&path, "127.0.0.1:80\n127.0.0.1:81\n").unwrap();

    let mut out: Vec<u8> = Vec::new();
    assert!(reload_file(&path, &mut out).await.unwrap());
    assert_eq!(out, b"127.0.0.1:80\n127.0.0.1:81\n\n");
}

#[tokio::test]
async fn test_reload_file_without_valid_lines_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backends");
    std::fs::write(&path, "# nothing yet\nbogus\n").unwrap();

    let mut out: Vec<u8> = Vec::new();
    assert!(!reload_file(&path, &mut out).await.unwrap());
    assert!(out.is_empty());

    let missing = dir.path().join("missing");
    assert!(!reload_file(&missing, &mut out).await.unwrap());
}

#[tokio::test]
async fn test_run_static_repeats_list() {
    let (mut writer, mut reader) = tokio::io::duplex(1024);
    let addrs = owned(&["127.0.0.1:80"]);
    tokio::spawn(async move {
        let _ = run_static(&mut writer, &addrs, Duration::from_millis(20)).await;
    });

    assert_eq!(read_batch(&mut reader).await, "127.0.0.1:80\n\n");
    assert_eq!(read_batch(&mut reader).await, "127.0.0.1:80\n\n");
}

#[tokio::test]
async fn test_watch_file_emits_on_modification() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("backends");
    std::fs::write(&path, "# empty\n").unwrap();

    let (mut writer, mut reader) = tokio::io::duplex(1024);
    let watched = path.clone();
    tokio::spawn(async move {
        let _ = watch_file(&watched, &mut writer, Duration::from_millis(20)).await;
    });
    tokio::time::sleep(Duration::from_millis(200)).await;

    std::fs::write(&path, "127.0.0.1:9000\n127.0.0.1:9001\n").unwrap();
    assert_eq!(read_batch(&mut reader).await, "127.0.0.1:9000\n127.0.0.1:9001\n\n");

    std::fs::write(&path, "127.0.0.1:9002\n").unwrap();
    assert_eq!(read_batch(&mut reader).await, "127.0.0.1:9002\n\n");
}

#[tokio::test]
async fn test_watch_file_waits_for_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("later");

    let (mut writer, mut reader) = tokio::io::duplex(1024);
    let watched = path.clone();
    tokio::spawn(async move {
        let _ = watch_file(&watched, &mut writer, Duration::from_millis(20)).await;
    });

    std::fs::write(&path, "# placeholder\n").unwrap();
    // Re-arming happens on a one second period.
    tokio::time::sleep(Duration::from_millis(1500)).await;

    std::fs::write(&path, "127.0.0.1:7000\n").unwrap();
    assert_eq!(read_batch(&mut reader).await, "127.0.0.1:7000\n\n");
}
