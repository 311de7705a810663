use std::net::IpAddr;

/// Whether a resolved address belongs to this host.
///
/// Wireless debugging only makes sense against the daemon on the same
/// device, so anything that is neither loopback nor bound to a local
/// interface is another machine's advertisement and must be dropped.
#[must_use]
pub fn is_local_address(addr: IpAddr) -> bool {
    if addr.is_loopback() {
        return true;
    }

    match local_ip_address::list_afinet_netifas() {
        Ok(interfaces) => interfaces.iter().any(|(_, ip)| *ip == addr),
        Err(e) => {
            tracing::warn!("could not enumerate interfaces: {e}");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{Ipv4Addr, Ipv6Addr};

    #[test]
    fn loopback_is_always_local() {
        assert!(is_local_address(IpAddr::V4(Ipv4Addr::LOCALHOST)));
        assert!(is_local_address(IpAddr::V6(Ipv6Addr::LOCALHOST)));
    }

    #[test]
    fn documentation_range_is_not_local() {
        // TEST-NET-3, guaranteed unassigned on real hosts.
        assert!(!is_local_address(IpAddr::V4(Ipv4Addr::new(203, 0, 113, 7))));
    }

    #[test]
    fn local_interface_addresses_are_local() {
        if let Ok(interfaces) = local_ip_address::list_afinet_netifas() {
            for (_, ip) in interfaces {
                assert!(is_local_address(ip));
            }
        }
    }
}
