//! Mock daemons for testing without a device.
//!
//! These are test doubles for the two halves of adbd's wireless-debugging
//! surface: the regular ADB transport ([`MockDaemon`]) and the one-shot
//! pairing service ([`MockPairingDaemon`]). Both run on loopback with
//! scripted behavior so the client, session manager, and HTTP handlers can
//! be exercised end to end.

mod mock_daemon;
mod mock_pairing;


pub use mock_daemon::{AuthPolicy, MockDaemon, MockDaemonConfig};
pub use mock_pairing::MockPairingDaemon;

use crate::protocol::crypto::AdbIdentity;
use std::sync::{Arc, OnceLock};

/// A process-wide RSA identity for tests. Key generation is expensive, so
/// every test shares one.
pub fn shared_identity() -> Arc<AdbIdentity> {
    static IDENTITY: OnceLock<Arc<AdbIdentity>> = OnceLock::new();
    IDENTITY
        .get_or_init(|| Arc::new(AdbIdentity::generate("mock-host").expect("test identity")))
        .clone()
}
