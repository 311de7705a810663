use std::fmt;
use std::net::IpAddr;

/// Which of the two wireless-debugging services an endpoint belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointKind {
    /// `_adb-tls-pairing._tcp.` — one-shot pairing service
    Pairing,
    /// `_adb-tls-connect._tcp.` — regular connection service
    Connect,
}

/// A resolved wireless-debugging service record.
///
/// Endpoints are ephemeral: the daemon re-advertises on a fresh port after
/// every toggle of wireless debugging, so the last resolved endpoint of each
/// kind is cached by discovery even after the advertisement disappears.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    /// Resolved address (loopback or a local interface address)
    pub host: IpAddr,
    /// Ephemeral service port
    pub port: u16,
    /// mDNS instance name, e.g. `adb-XXXX-YYYY`
    pub service_name: String,
}

impl Endpoint {
    /// Create an endpoint from resolved record fields.
    #[must_use]
    pub fn new(host: IpAddr, port: u16, service_name: impl Into<String>) -> Self {
        Self {
            host,
            port,
            service_name: service_name.into(),
        }
    }

    /// `host:port` form suitable for a socket connect.
    #[must_use]
    pub fn socket_addr(&self) -> String {
        match self.host {
            IpAddr::V4(ip) => format!("{}:{}", ip, self.port),
            IpAddr::V6(ip) => format!("[{}]:{}", ip, self.port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.socket_addr(), self.service_name)
    }
}
