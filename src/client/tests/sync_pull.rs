use crate::client::AdbSession;
use crate::error::AdbLinkError;
use crate::testing::{shared_identity, MockDaemon, MockDaemonConfig};
use std::collections::HashMap;
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);
const CONNECT: Duration = Duration::from_secs(5);
const READ: Duration = Duration::from_secs(8);

async fn session_with(config: MockDaemonConfig) -> (MockDaemon, AdbSession) {
    let mut daemon = MockDaemon::new(config);
    let addr = daemon.start().await.unwrap();
    let identity = shared_identity();
    let session = AdbSession::connect(LOCALHOST, addr.port(), &identity, CONNECT, READ)
        .await
        .unwrap();
    (daemon, session)
}

#[tokio::test]
async fn pull_reassembles_data_packets() {
    let mut files = HashMap::new();
    files.insert("/any".to_string(), b"abcdefgh".to_vec());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        files,
        // DATA "abc" / DATA "def" / DATA "gh" / DONE
        sync_data_chunk: 3,
        ..MockDaemonConfig::default()
    })
    .await;

    let content = session.pull_file("/any").await.unwrap();
    assert_eq!(content, b"abcdefgh");
}

#[tokio::test]
async fn packet_boundaries_straddle_wrte_frames() {
    let mut files = HashMap::new();
    files.insert(
        "/sdcard/window_dump.xml".to_string(),
        b"<?xml version='1.0'?><hierarchy/>".to_vec(),
    );

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        files,
        sync_data_chunk: 5,
        // Frames of 7 bytes never line up with 8-byte packet headers.
        sync_frame_len: Some(7),
        ..MockDaemonConfig::default()
    })
    .await;

    let content = session.pull_file("/sdcard/window_dump.xml").await.unwrap();
    assert_eq!(content, b"<?xml version='1.0'?><hierarchy/>");
}

#[tokio::test]
async fn large_pull_round_trips() {
    let blob: Vec<u8> = (0u32..200_000).map(|i| (i % 251) as u8).collect();
    let mut files = HashMap::new();
    files.insert("/sdcard/blob.bin".to_string(), blob.clone());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        files,
        ..MockDaemonConfig::default()
    })
    .await;

    let content = session.pull_file("/sdcard/blob.bin").await.unwrap();
    assert_eq!(content, blob);
}

#[tokio::test]
async fn fail_packet_surfaces_the_reason() {
    let (_daemon, mut session) = session_with(MockDaemonConfig {
        sync_fail: Some("open failed: Permission denied".to_string()),
        ..MockDaemonConfig::default()
    })
    .await;

    let err = session.pull_file("/protected").await.unwrap_err();
    match err {
        AdbLinkError::SyncFailed { message } => {
            assert!(message.contains("Permission denied"));
        }
        other => panic!("expected SyncFailed, got {other:?}"),
    }
}

#[tokio::test]
async fn missing_file_fails() {
    let (_daemon, mut session) = session_with(MockDaemonConfig::default()).await;

    assert!(matches!(
        session.pull_file("/nonexistent").await,
        Err(AdbLinkError::SyncFailed { .. })
    ));
}

#[tokio::test]
async fn early_close_returns_partial_content() {
    let mut files = HashMap::new();
    files.insert("/truncated".to_string(), b"partial-data".to_vec());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        files,
        early_close_sync: true,
        ..MockDaemonConfig::default()
    })
    .await;

    let content = session.pull_file("/truncated").await.unwrap();
    assert_eq!(content, b"partial-data");
}

#[tokio::test]
async fn empty_close_without_done_is_a_protocol_error() {
    let mut files = HashMap::new();
    files.insert("/empty".to_string(), Vec::new());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        files,
        early_close_sync: true,
        ..MockDaemonConfig::default()
    })
    .await;

    assert!(matches!(
        session.pull_file("/empty").await,
        Err(AdbLinkError::Protocol { .. })
    ));
}
