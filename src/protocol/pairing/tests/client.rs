use crate::error::AdbLinkError;
use crate::protocol::pairing::{PairingClient, PairingState};
use crate::testing::{shared_identity, MockPairingDaemon};
use crate::types::AdbLinkConfig;
use std::net::{IpAddr, Ipv4Addr};

const LOCALHOST: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

#[tokio::test]
async fn pairing_provisions_the_public_key() {
    let mut daemon = MockPairingDaemon::new("847291");
    let addr = daemon.start().await.unwrap();

    let identity = shared_identity();
    let mut client = PairingClient::new(identity.clone(), AdbLinkConfig::builder().build());
    assert_eq!(client.state(), PairingState::Ready);

    client
        .pair(LOCALHOST, addr.port(), "847291")
        .await
        .unwrap();
    assert_eq!(client.state(), PairingState::Stopped);

    // The daemon stores the key without the trailing NUL.
    let expected = {
        let mut key = identity.adb_public_key().unwrap();
        key.pop();
        key
    };
    // The record lands asynchronously on the daemon side.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert_eq!(daemon.provisioned_key().await.unwrap(), expected);
}

#[tokio::test]
async fn wrong_code_is_invalid_pairing_code() {
    let mut daemon = MockPairingDaemon::new("000001");
    let addr = daemon.start().await.unwrap();

    let identity = shared_identity();
    let mut client = PairingClient::new(identity, AdbLinkConfig::builder().build());

    let err = client
        .pair(LOCALHOST, addr.port(), "000000")
        .await
        .unwrap_err();
    assert!(matches!(err, AdbLinkError::InvalidPairingCode));
    assert_eq!(client.state(), PairingState::Stopped);

    // No key was installed on the daemon.
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    assert!(daemon.provisioned_key().await.is_none());
}

#[tokio::test]
async fn unreachable_endpoint_is_a_network_error() {
    let identity = shared_identity();
    let mut client = PairingClient::new(identity, AdbLinkConfig::builder().build());

    let err = client.pair(LOCALHOST, 1, "123456").await.unwrap_err();
    assert!(matches!(err, AdbLinkError::Network { .. }));
    assert_eq!(client.state(), PairingState::Stopped);
}
