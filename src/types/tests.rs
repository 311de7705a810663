use super::*;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

#[test]
fn endpoint_socket_addr_v4() {
    let ep = Endpoint::new(
        IpAddr::V4(Ipv4Addr::LOCALHOST),
        40123,
        "adb-1234abcd-AbCdEf",
    );
    assert_eq!(ep.socket_addr(), "127.0.0.1:40123");
}

#[test]
fn endpoint_socket_addr_v6_is_bracketed() {
    let ep = Endpoint::new(IpAddr::V6(Ipv6Addr::LOCALHOST), 40123, "adb-x");
    assert_eq!(ep.socket_addr(), "[::1]:40123");
}

#[test]
fn config_defaults_match_protocol_deadlines() {
    let config = AdbLinkConfig::builder().build();
    assert_eq!(config.connect_timeout.as_secs(), 5);
    assert_eq!(config.read_timeout.as_secs(), 8);
    assert_eq!(config.shell_wait.as_millis(), 300);
    assert!(config.api_port > 0);
}

#[test]
fn builder_rejects_port_zero() {
    let config = AdbLinkConfig::builder().api_port(0).build();
    assert_eq!(config.api_port, AdbLinkConfig::default().api_port);
}

#[test]
fn builder_overrides_apply() {
    let config = AdbLinkConfig::builder()
        .api_port(8099)
        .key_name("bench")
        .build();
    assert_eq!(config.api_port, 8099);
    assert_eq!(config.key_name, "bench");
}
