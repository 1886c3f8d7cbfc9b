//! Outward-facing local address discovery
//!
//! Connects a transient UDP socket to a well-known public host and
//! reads back the locally bound address. The datagram connect lets the
//! OS pick the preferred outbound interface on a multi-homed endpoint;
//! no packet has to leave the host.

use std::io::ErrorKind;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use socket2::{Domain, Protocol, Socket, Type};

const PUBLIC_IPV4_PROBE: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::new(8, 8, 8, 8)), 53);
const PUBLIC_IPV6_PROBE: SocketAddr = SocketAddr::new(
    IpAddr::V6(Ipv6Addr::new(0x2001, 0x4860, 0x4860, 0, 0, 0, 0, 0x8888)),
    53,
);

/// IP address family to probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFamily {
    V4,
    V6,
}

/// Connect a transient UDP socket to `target` and return the local
/// address the OS selected for it.
pub fn probe_local_addr(target: SocketAddr) -> Option<IpAddr> {
    let domain = if target.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = match Socket::new(domain, Type::DGRAM, Some(Protocol::UDP)) {
        Ok(socket) => socket,
        Err(e) => {
            tracing::error!("probe socket creation failed: {}", e);
            return None;
        }
    };

    if let Err(e) = socket.connect(&target.into()) {
        // No route / no host means the family is simply unreachable
        if !matches!(
            e.kind(),
            ErrorKind::NetworkUnreachable | ErrorKind::HostUnreachable
        ) {
            tracing::info!("probe connect to {} failed: {}", target, e);
        }
        return None;
    }

    socket
        .local_addr()
        .ok()
        .and_then(|addr| addr.as_socket())
        .map(|addr| addr.ip())
}

/// Discover the default local address for one family, or `None` if the
/// family is unreachable.
pub fn resolve_local_address(family: AddressFamily) -> Option<IpAddr> {
    match family {
        AddressFamily::V4 => probe_local_addr(PUBLIC_IPV4_PROBE),
        AddressFamily::V6 => probe_local_addr(PUBLIC_IPV6_PROBE),
    }
}

/// Best local IP as a string: IPv4 first, then IPv6, empty if neither
/// family is reachable. Never fatal.
pub fn discover_local_ip() -> String {
    resolve_local_address(AddressFamily::V4)
        .or_else(|| resolve_local_address(AddressFamily::V6))
        .map(|ip| ip.to_string())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_loopback() {
        // A UDP connect to loopback succeeds without a listener, so
        // this is deterministic even on machines with no route out.
        let target: SocketAddr = "127.0.0.1:53".parse().unwrap();
        let local = probe_local_addr(target).unwrap();
        assert!(local.is_loopback());
    }

    #[test]
    fn test_discover_never_panics() {
        // May legitimately be empty on an isolated host
        let _ = discover_local_ip();
    }
}
