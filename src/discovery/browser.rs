use super::interfaces::is_local_address;
use super::{CONNECT_SERVICE, PAIRING_SERVICE};
use crate::error::AdbLinkError;
use crate::types::{Endpoint, EndpointKind};
use futures::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

/// Discovery events
#[derive(Debug, Clone)]
pub enum DiscoveryEvent {
    /// A service resolved to an address on this host
    Resolved(Endpoint, EndpointKind),
    /// An advertisement disappeared
    Lost(String, EndpointKind),
    /// A record resolved to a foreign address and was dropped
    Filtered(String),
}

/// mDNS browser for the two wireless-debugging service types
pub struct EndpointBrowser {
    _private: (),
}

impl EndpointBrowser {
    /// Create a new browser
    #[must_use]
    pub fn new() -> Self {
        Self { _private: () }
    }

    /// Start browsing both service types
    ///
    /// # Errors
    ///
    /// Returns `DiscoveryFailed` if the mDNS daemon cannot be initialized.
    pub fn browse(self) -> Result<impl Stream<Item = DiscoveryEvent>, AdbLinkError> {
        EndpointBrowserStream::new()
    }
}

impl Default for EndpointBrowser {
    fn default() -> Self {
        Self::new()
    }
}

/// Stream implementation over both mdns-sd browse channels
struct EndpointBrowserStream {
    mdns: mdns_sd::ServiceDaemon,
    stream: Box<dyn Stream<Item = (mdns_sd::ServiceEvent, EndpointKind)> + Send + Unpin>,
}

impl EndpointBrowserStream {
    fn new() -> Result<Self, AdbLinkError> {
        let mdns = mdns_sd::ServiceDaemon::new().map_err(|e| AdbLinkError::DiscoveryFailed {
            message: format!("Failed to create mDNS daemon: {e}"),
        })?;

        let pairing = Self::browse_kind(&mdns, EndpointKind::Pairing)?;
        let connect = Self::browse_kind(&mdns, EndpointKind::Connect)?;

        let stream = Box::new(futures::stream::select(pairing, connect));

        Ok(Self { mdns, stream })
    }

    fn browse_kind(
        mdns: &mdns_sd::ServiceDaemon,
        kind: EndpointKind,
    ) -> Result<impl Stream<Item = (mdns_sd::ServiceEvent, EndpointKind)> + Send + Unpin + use<>, AdbLinkError>
    {
        use futures::StreamExt;

        let receiver = mdns
            .browse(&browse_type(kind))
            .map_err(|e| AdbLinkError::DiscoveryFailed {
                message: format!("Failed to browse: {e}"),
            })?;

        Ok(receiver.into_stream().map(move |event| (event, kind)))
    }

    fn process_event(
        event: mdns_sd::ServiceEvent,
        kind: EndpointKind,
    ) -> Option<DiscoveryEvent> {
        match event {
            mdns_sd::ServiceEvent::ServiceResolved(info) => Self::handle_resolved(&info, kind),
            mdns_sd::ServiceEvent::ServiceRemoved(_, fullname) => {
                Some(DiscoveryEvent::Lost(fullname, kind))
            }
            _ => None,
        }
    }

    fn handle_resolved(info: &mdns_sd::ServiceInfo, kind: EndpointKind) -> Option<DiscoveryEvent> {
        let name = info.get_fullname().to_string();

        // Accept only addresses that belong to this host; a neighbour's
        // wireless-debugging advertisement must never be driven.
        let address = info
            .get_addresses()
            .iter()
            .copied()
            .find(|addr| is_local_address(*addr));

        match address {
            Some(addr) => Some(DiscoveryEvent::Resolved(
                Endpoint::new(addr, info.get_port(), name),
                kind,
            )),
            None => Some(DiscoveryEvent::Filtered(name)),
        }
    }
}

impl Stream for EndpointBrowserStream {
    type Item = DiscoveryEvent;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            let (event, kind) = match Pin::new(&mut self.stream).poll_next(cx) {
                Poll::Ready(Some(item)) => item,
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            };

            if let Some(discovery_event) = Self::process_event(event, kind) {
                return Poll::Ready(Some(discovery_event));
            }
        }
    }
}

impl Drop for EndpointBrowserStream {
    fn drop(&mut self) {
        let _ = self.mdns.stop_browse(&browse_type(EndpointKind::Pairing));
        let _ = self.mdns.stop_browse(&browse_type(EndpointKind::Connect));
        let _ = self.mdns.shutdown();
    }
}

/// The fully-qualified type string mdns-sd expects.
fn browse_type(kind: EndpointKind) -> String {
    let service = match kind {
        EndpointKind::Pairing => PAIRING_SERVICE,
        EndpointKind::Connect => CONNECT_SERVICE,
    };
    format!("{service}local.")
}
