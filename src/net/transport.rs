//! RTP/RTCP UDP socket pair
//!
//! Two independently bound sockets with background reader tasks. Each
//! received datagram is copied into an owned `Bytes` before being handed
//! to the inbound sink, since the read buffer is reused across reads.
//! Sends are best-effort and never propagate errors to the caller.

use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;

use crate::error::NetworkError;
use crate::net::EndpointPair;

/// Largest datagram the readers accept (MTU minus IP/UDP headers)
const MAX_PACKET_SIZE: usize = 1500;

/// Destination for inbound datagrams, one callback per socket.
///
/// Callbacks run on the reader tasks and must hand the bytes off
/// without blocking.
pub struct InboundSink {
    pub rtp: Box<dyn Fn(Bytes) + Send + Sync>,
    pub rtcp: Box<dyn Fn(Bytes) + Send + Sync>,
}

/// Bound RTP + RTCP sockets with their reader tasks
pub struct TransportPair {
    rtp: Arc<UdpSocket>,
    rtcp: Arc<UdpSocket>,
    readers: Vec<JoinHandle<()>>,
}

impl TransportPair {
    /// Bind both sockets to `local` and start the readers. A failure on
    /// either bind aborts the whole construction; the caller retries the
    /// session start, not individual sockets.
    pub fn bind(local: &EndpointPair, sink: InboundSink) -> Result<Self, NetworkError> {
        let rtp = Arc::new(bind_udp(local.rtp)?);
        let rtcp = Arc::new(bind_udp(local.rtcp)?);

        let readers = vec![
            spawn_reader(rtp.clone(), "rtp", sink.rtp),
            spawn_reader(rtcp.clone(), "rtcp", sink.rtcp),
        ];

        Ok(Self { rtp, rtcp, readers })
    }

    /// Best-effort RTP send; failures are logged only so the audio path
    /// never stalls on a transient error.
    pub fn send_rtp(&self, packet: &[u8], dest: SocketAddr) {
        if let Err(e) = self.rtp.try_send_to(packet, dest) {
            tracing::error!("failed to send RTP packet to {}: {}", dest, e);
        }
    }

    /// Best-effort RTCP send.
    pub fn send_rtcp(&self, packet: &[u8], dest: SocketAddr) {
        if let Err(e) = self.rtcp.try_send_to(packet, dest) {
            tracing::error!("failed to send RTCP packet to {}: {}", dest, e);
        }
    }

    pub fn local_rtp_addr(&self) -> Option<SocketAddr> {
        self.rtp.local_addr().ok()
    }

    pub fn local_rtcp_addr(&self) -> Option<SocketAddr> {
        self.rtcp.local_addr().ok()
    }
}

impl Drop for TransportPair {
    fn drop(&mut self) {
        for reader in &self.readers {
            reader.abort();
        }
    }
}

/// Bind a nonblocking UDP socket with address reuse and convert it for
/// tokio.
fn bind_udp(addr: SocketAddr) -> Result<UdpSocket, NetworkError> {
    let domain = if addr.is_ipv4() {
        Domain::IPV4
    } else {
        Domain::IPV6
    };

    let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .set_nonblocking(true)
        .map_err(|e| NetworkError::BindFailed(e.to_string()))?;
    socket
        .bind(&addr.into())
        .map_err(|e| NetworkError::BindFailed(format!("{}: {}", addr, e)))?;

    UdpSocket::from_std(socket.into()).map_err(|e| NetworkError::BindFailed(e.to_string()))
}

fn spawn_reader(
    socket: Arc<UdpSocket>,
    label: &'static str,
    sink: Box<dyn Fn(Bytes) + Send + Sync>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut buf = [0u8; MAX_PACKET_SIZE];
        loop {
            match socket.recv_from(&mut buf).await {
                Ok((len, _source)) => {
                    // Copy before hand-off: buf is reused on the next read
                    sink(Bytes::copy_from_slice(&buf[..len]));
                }
                Err(e) => {
                    tracing::error!("{} socket read failed: {}", label, e);
                    break;
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::sync::mpsc;

    /// Grab two adjacent free ports by binding to port 0.
    fn free_port_pair() -> u16 {
        for _ in 0..32 {
            let probe = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
            let port = probe.local_addr().unwrap().port();
            if port < u16::MAX - 1 {
                let next = std::net::UdpSocket::bind(("127.0.0.1", port + 1));
                if next.is_ok() {
                    drop(next);
                    drop(probe);
                    return port;
                }
            }
        }
        panic!("no adjacent free port pair found");
    }

    #[tokio::test]
    async fn test_inbound_datagram_reaches_sink() {
        let port = free_port_pair();
        let local = EndpointPair::new("127.0.0.1".parse().unwrap(), port).unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();
        let rtp_tx = tx.clone();
        let sink = InboundSink {
            rtp: Box::new(move |bytes| {
                let _ = rtp_tx.send(("rtp", bytes));
            }),
            rtcp: Box::new(move |bytes| {
                let _ = tx.send(("rtcp", bytes));
            }),
        };

        let pair = TransportPair::bind(&local, sink).unwrap();
        assert_eq!(pair.local_rtp_addr().unwrap(), local.rtp);
        assert_eq!(pair.local_rtcp_addr().unwrap(), local.rtcp);

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"hello-rtp", local.rtp).await.unwrap();
        sender.send_to(b"hello-rtcp", local.rtcp).await.unwrap();

        let mut seen = Vec::new();
        for _ in 0..2 {
            let got = tokio::time::timeout(Duration::from_secs(2), rx.recv())
                .await
                .expect("timed out waiting for datagram")
                .unwrap();
            seen.push(got);
        }
        seen.sort_by_key(|(label, _)| *label);
        assert_eq!(seen[0].0, "rtcp");
        assert_eq!(&seen[0].1[..], b"hello-rtcp");
        assert_eq!(seen[1].0, "rtp");
        assert_eq!(&seen[1].1[..], b"hello-rtp");

        drop(pair);
    }

    #[tokio::test]
    async fn test_outbound_send() {
        let port = free_port_pair();
        let local = EndpointPair::new("127.0.0.1".parse().unwrap(), port).unwrap();
        let sink = InboundSink {
            rtp: Box::new(|_| {}),
            rtcp: Box::new(|_| {}),
        };
        let pair = TransportPair::bind(&local, sink).unwrap();

        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let dest = receiver.local_addr().unwrap();

        pair.send_rtp(b"payload", dest);

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(2), receiver.recv_from(&mut buf))
            .await
            .expect("timed out")
            .unwrap();
        assert_eq!(&buf[..len], b"payload");
    }

    #[tokio::test]
    async fn test_bind_conflict_is_recoverable() {
        let port = free_port_pair();
        let local = EndpointPair::new("127.0.0.1".parse().unwrap(), port).unwrap();

        // Occupy the RTCP slot without SO_REUSEADDR-compatible binding
        let sink = InboundSink {
            rtp: Box::new(|_| {}),
            rtcp: Box::new(|_| {}),
        };
        let first = TransportPair::bind(&local, sink).unwrap();

        // Binding an unusable address must come back as an error, not a panic
        let bad = EndpointPair::new("203.0.113.7".parse().unwrap(), port).unwrap();
        let sink = InboundSink {
            rtp: Box::new(|_| {}),
            rtcp: Box::new(|_| {}),
        };
        assert!(TransportPair::bind(&bad, sink).is_err());

        drop(first);
    }
}
