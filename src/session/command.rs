//! Commands marshalled onto the session context

use std::net::IpAddr;

use bytes::Bytes;

/// One deferred unit of work for the session actor.
///
/// Arguments are captured by value so they outlive the triggering
/// call; packet payloads are owned `Bytes` copied at the socket or
/// engine boundary.
#[derive(Debug, Clone)]
pub enum SessionCommand {
    SetEncoder(String),
    SetDecoders(Vec<String>),
    SetLocalAddress(IpAddr, u16),
    SetRemoteAddress(IpAddr, u16),
    StartSession,
    StopSession,
    StartSend,
    StopSend,
    StartPlayout,
    StopPlayout,
    /// Outbound RTP handed off by the engine's send callback
    SendRtp(Bytes),
    /// Outbound RTCP handed off by the engine's send callback
    SendRtcp(Bytes),
    /// Inbound RTP copied out of a socket read
    InboundRtp(Bytes),
    /// Inbound RTCP copied out of a socket read
    InboundRtcp(Bytes),
    Shutdown,
}
