//! Core types for the adblink library

mod config;
mod endpoint;

#[cfg(test)]
mod tests;

pub use config::{AdbLinkConfig, AdbLinkConfigBuilder, DEFAULT_API_PORT};
pub use endpoint::{Endpoint, EndpointKind};
