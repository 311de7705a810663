//! Discovery of the wireless-debugging services.
//!
//! The daemon advertises two ephemeral mDNS services: one while the pairing
//! dialog is open, one whenever wireless debugging is enabled. Both are
//! short-lived, so the last resolved endpoint of each kind stays cached even
//! after its advertisement disappears.

mod browser;
mod interfaces;


pub use browser::{DiscoveryEvent, EndpointBrowser};
pub use interfaces::is_local_address;

use crate::error::AdbLinkError;
use crate::types::{Endpoint, EndpointKind};
use futures::StreamExt;
use tokio::sync::watch;

/// Pairing service type (trailing dot tolerated by resolvers).
pub const PAIRING_SERVICE: &str = "_adb-tls-pairing._tcp.";

/// Connect service type.
pub const CONNECT_SERVICE: &str = "_adb-tls-connect._tcp.";

/// The latest known endpoint of each kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredEndpoints {
    /// Last resolved pairing endpoint
    pub pairing: Option<Endpoint>,
    /// Last resolved connect endpoint
    pub connect: Option<Endpoint>,
}

/// Long-running discovery publishing endpoint state on a watch channel.
///
/// Observers read the watched value; they never mutate discovery state.
pub struct Discovery {
    receiver: watch::Receiver<DiscoveredEndpoints>,
    handle: tokio::task::JoinHandle<()>,
}

impl Discovery {
    /// Start browsing both service types.
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryFailed` when the mDNS daemon cannot be started.
    pub fn start() -> Result<Self, AdbLinkError> {
        let mut stream = EndpointBrowser::new().browse()?;
        let (sender, receiver) = watch::channel(DiscoveredEndpoints::default());

        let handle = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    DiscoveryEvent::Resolved(endpoint, kind) => {
                        tracing::info!("{kind:?} endpoint resolved: {endpoint}");
                        sender.send_modify(|state| match kind {
                            EndpointKind::Pairing => state.pairing = Some(endpoint),
                            EndpointKind::Connect => state.connect = Some(endpoint),
                        });
                    }
                    // Advertisements are intentionally short-lived; keep the
                    // cached endpoint so a transient loss does not block an
                    // action.
                    DiscoveryEvent::Lost(name, kind) => {
                        tracing::debug!("{kind:?} advertisement {name:?} gone");
                    }
                    DiscoveryEvent::Filtered(name) => {
                        tracing::debug!("ignored non-local advertisement {name:?}");
                    }
                }
            }
        });

        Ok(Self { receiver, handle })
    }

    /// A receiver over the cached endpoint state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DiscoveredEndpoints> {
        self.receiver.clone()
    }

    /// The current snapshot.
    #[must_use]
    pub fn current(&self) -> DiscoveredEndpoints {
        self.receiver.borrow().clone()
    }
}

impl Drop for Discovery {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
