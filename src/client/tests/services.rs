use crate::client::AdbSession;
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
async fn shell_output_reaches_the_sink() {
    let mut outputs = HashMap::new();
    outputs.insert("getprop ro.build.version.release".to_string(), b"14\n".to_vec());

    let (daemon, mut session) = session_with(MockDaemonConfig {
        shell_outputs: outputs,
        ..MockDaemonConfig::default()
    })
    .await;

    let mut sink = Vec::new();
    session
        .open_shell("getprop ro.build.version.release", &mut sink)
        .await
        .unwrap();
    assert_eq!(sink, b"14\n");

    assert_eq!(
        daemon.opened_services().await,
        vec!["shell:getprop ro.build.version.release".to_string()]
    );
}

#[tokio::test]
async fn exec_returns_raw_bytes() {
    let png_header = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    let mut outputs = HashMap::new();
    outputs.insert("screencap -p".to_string(), png_header.clone());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        shell_outputs: outputs,
        ..MockDaemonConfig::default()
    })
    .await;

    let bytes = session.open_exec("screencap -p").await.unwrap();
    assert_eq!(bytes, png_header);
}

#[tokio::test]
async fn empty_output_still_closes_cleanly() {
    let (_daemon, mut session) = session_with(MockDaemonConfig::default()).await;

    let mut sink = Vec::new();
    session.open_shell("true", &mut sink).await.unwrap();
    assert!(sink.is_empty());
}

#[tokio::test]
async fn foreign_stream_frames_are_answered_and_skipped() {
    let mut outputs = HashMap::new();
    outputs.insert("id".to_string(), b"uid=2000(shell)\n".to_vec());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        shell_outputs: outputs,
        inject_foreign_wrte: true,
        ..MockDaemonConfig::default()
    })
    .await;

    let mut sink = Vec::new();
    session.open_shell("id", &mut sink).await.unwrap();
    // The foreign "noise" payload must not leak into this stream's sink.
    assert_eq!(sink, b"uid=2000(shell)\n");
}

#[tokio::test]
async fn multiple_services_reuse_one_session() {
    let mut outputs = HashMap::new();
    outputs.insert("first".to_string(), b"1".to_vec());
    outputs.insert("second".to_string(), b"2".to_vec());

    let (daemon, mut session) = session_with(MockDaemonConfig {
        shell_outputs: outputs,
        ..MockDaemonConfig::default()
    })
    .await;

    let mut sink = Vec::new();
    session.open_shell("first", &mut sink).await.unwrap();
    session.open_shell("second", &mut sink).await.unwrap();
    assert_eq!(sink, b"12");

    assert_eq!(daemon.opened_services().await.len(), 2);
}

#[tokio::test]
async fn channel_sink_streams_chunks() {
    let mut outputs = HashMap::new();
    outputs.insert("logcat -d".to_string(), b"some log line\n".to_vec());

    let (_daemon, mut session) = session_with(MockDaemonConfig {
        shell_outputs: outputs,
        ..MockDaemonConfig::default()
    })
    .await;

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    let mut sink = tx;
    session.open_shell("logcat -d", &mut sink).await.unwrap();
    drop(sink);

    let mut collected = Vec::new();
    while let Some(chunk) = rx.recv().await {
        collected.extend_from_slice(&chunk);
    }
    assert_eq!(collected, b"some log line\n");
}
