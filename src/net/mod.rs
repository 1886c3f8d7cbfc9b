//! Network subsystem: local-address discovery and the RTP/RTCP socket pair

pub mod resolver;
pub mod transport;

pub use resolver::{discover_local_ip, resolve_local_address, AddressFamily};
pub use transport::{InboundSink, TransportPair};

use std::net::{IpAddr, SocketAddr};

use crate::error::NetworkError;

/// RTP + RTCP addresses for one side of the call.
///
/// The RTCP port is derived once here (RTP port + 1) and never
/// re-derived elsewhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointPair {
    pub rtp: SocketAddr,
    pub rtcp: SocketAddr,
}

impl EndpointPair {
    /// Build the pair from an IP and the RTP port. The RTP port must
    /// leave room for the companion RTCP port.
    pub fn new(ip: IpAddr, rtp_port: u16) -> Result<Self, NetworkError> {
        let rtcp_port = rtp_port
            .checked_add(1)
            .ok_or(NetworkError::InvalidPort(rtp_port))?;
        Ok(Self {
            rtp: SocketAddr::new(ip, rtp_port),
            rtcp: SocketAddr::new(ip, rtcp_port),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rtcp_port_is_rtp_plus_one() {
        let pair = EndpointPair::new("192.168.1.10".parse().unwrap(), 10000).unwrap();
        assert_eq!(pair.rtp.port(), 10000);
        assert_eq!(pair.rtcp.port(), 10001);
        assert_eq!(pair.rtp.ip(), pair.rtcp.ip());
    }

    #[test]
    fn test_max_port_rejected() {
        let result = EndpointPair::new("127.0.0.1".parse().unwrap(), u16::MAX);
        assert!(matches!(result, Err(NetworkError::InvalidPort(65535))));
    }

    proptest! {
        #[test]
        fn prop_rtcp_derivation(port in 0u16..u16::MAX) {
            let pair = EndpointPair::new("10.0.0.1".parse().unwrap(), port).unwrap();
            prop_assert_eq!(pair.rtcp.port(), port + 1);
        }
    }
}
