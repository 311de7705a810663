//! # adblink
//!
//! A pure Rust client for the ADB wireless-debugging surface: mDNS
//! discovery, SPAKE2 pairing, and authenticated sessions against the
//! device's own debug daemon over loopback.
//!
//! ## Example
//!
//! ```rust,no_run
//! use adblink::{AdbLinkConfig, SessionManager};
//! use adblink::protocol::crypto::{AdbIdentity, FileWrappingKey, FilePreferences};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), adblink::AdbLinkError> {
//! let config = AdbLinkConfig::default();
//! let key_name = config.key_name.clone();
//! let mut store = FilePreferences::new("adblink/prefs.json")?;
//! let wrapping = FileWrappingKey::new("adblink/wrap.key");
//! let identity = Arc::new(AdbIdentity::load_or_create(&mut store, &wrapping, &key_name)?);
//!
//! let manager = SessionManager::new(identity, config);
//! manager.connect("127.0.0.1".parse().unwrap(), 37099, true).await?;
//! let release = manager.execute_shell("getprop ro.build.version.release").await?;
//! println!("Android {release}");
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Public modules
/// HTTP control surface
pub mod api;
/// Session lifecycle
pub mod connection;
/// mDNS discovery
pub mod discovery;
/// Error types
pub mod error;
/// Wire formats and crypto
pub mod protocol;
/// Core types
pub mod types;

// Internal modules
mod client;
mod net;

/// Mock daemons for tests and examples
pub mod testing;


// Re-exports
pub use client::{AdbSession, StreamSink};
pub use connection::{DispatchOutcome, SessionManager, SessionStatus};
pub use discovery::{DiscoveredEndpoints, Discovery};
pub use error::AdbLinkError;
pub use protocol::pairing::PairingClient;
pub use types::{AdbLinkConfig, Endpoint, EndpointKind};
