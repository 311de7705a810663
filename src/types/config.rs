use std::time::Duration;

/// Default HTTP API listen port.
pub const DEFAULT_API_PORT: u16 = 17171;

/// Environment variable overriding the API listen port.
const API_PORT_ENV: &str = "ADBLINK_API_PORT";

/// Configuration for ADB client behavior
#[derive(Debug, Clone)]
pub struct AdbLinkConfig {
    /// Timeout for TCP connection attempts (default: 5 seconds)
    pub connect_timeout: Duration,

    /// Hard deadline on every socket read (default: 8 seconds)
    pub read_timeout: Duration,

    /// How long a shell dispatch waits on the in-flight command before
    /// giving up with `Busy` (default: 300 ms)
    pub shell_wait: Duration,

    /// HTTP API listen port (default: 17171)
    pub api_port: u16,

    /// Name label appended to the ADB public key (default: local hostname)
    pub key_name: String,
}

impl Default for AdbLinkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Duration::from_secs(8),
            shell_wait: Duration::from_millis(300),
            api_port: api_port_from_env(),
            key_name: default_key_name(),
        }
    }
}

impl AdbLinkConfig {
    /// Create a new config builder
    #[must_use]
    pub fn builder() -> AdbLinkConfigBuilder {
        AdbLinkConfigBuilder::default()
    }
}

/// Builder for `AdbLinkConfig`
#[derive(Debug, Clone, Default)]
pub struct AdbLinkConfigBuilder {
    config: AdbLinkConfig,
}

impl AdbLinkConfigBuilder {
    /// Set the TCP connect timeout
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    /// Set the per-read deadline
    #[must_use]
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.config.read_timeout = timeout;
        self
    }

    /// Set the shell dispatch wait budget
    #[must_use]
    pub fn shell_wait(mut self, wait: Duration) -> Self {
        self.config.shell_wait = wait;
        self
    }

    /// Set the API listen port (1..=65535)
    #[must_use]
    pub fn api_port(mut self, port: u16) -> Self {
        if port > 0 {
            self.config.api_port = port;
        }
        self
    }

    /// Set the public-key name label
    #[must_use]
    pub fn key_name(mut self, name: impl Into<String>) -> Self {
        self.config.key_name = name.into();
        self
    }

    /// Finish building
    #[must_use]
    pub fn build(self) -> AdbLinkConfig {
        self.config
    }
}

/// Read the API port knob, falling back to the default when the variable is
/// unset, unparsable, or zero.
fn api_port_from_env() -> u16 {
    std::env::var(API_PORT_ENV)
        .ok()
        .and_then(|v| v.parse::<u16>().ok())
        .filter(|&p| p > 0)
        .unwrap_or(DEFAULT_API_PORT)
}

fn default_key_name() -> String {
    hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "adblink".to_string())
}
