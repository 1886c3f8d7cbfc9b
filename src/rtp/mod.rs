//! Minimal RTP/RTCP wire plumbing for the built-in engine
//!
//! The session core forwards RTP/RTCP bytes opaquely; only the engine
//! builds and parses headers. Fixed 12-byte headers, no CSRC list, no
//! extensions.

use bytes::{BufMut, Bytes, BytesMut};
use rand::Rng;

use crate::error::NetworkError;

/// RTP header length without CSRC entries
pub const RTP_HEADER_LEN: usize = 12;

/// Parsed fixed RTP header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpHeader {
    pub payload_type: u8,
    pub marker: bool,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Serialize the header followed by `payload` into a single buffer.
    pub fn build_packet(&self, payload: &[u8]) -> Bytes {
        let mut buf = BytesMut::with_capacity(RTP_HEADER_LEN + payload.len());

        // V=2, no padding, no extension, zero CSRCs
        buf.put_u8(0b1000_0000);
        let mut b1 = self.payload_type & 0x7F;
        if self.marker {
            b1 |= 0x80;
        }
        buf.put_u8(b1);
        buf.put_u16(self.sequence);
        buf.put_u32(self.timestamp);
        buf.put_u32(self.ssrc);
        buf.put_slice(payload);

        buf.freeze()
    }

    /// Parse the fixed header, returning it and the payload offset.
    pub fn parse(packet: &[u8]) -> Result<(Self, usize), NetworkError> {
        if packet.len() < RTP_HEADER_LEN {
            return Err(NetworkError::InvalidPacket);
        }
        let version = packet[0] >> 6;
        if version != 2 {
            return Err(NetworkError::InvalidPacket);
        }
        let csrc_count = (packet[0] & 0x0F) as usize;
        let offset = RTP_HEADER_LEN + csrc_count * 4;
        if packet.len() < offset {
            return Err(NetworkError::InvalidPacket);
        }

        let header = Self {
            payload_type: packet[1] & 0x7F,
            marker: packet[1] & 0x80 != 0,
            sequence: u16::from_be_bytes([packet[2], packet[3]]),
            timestamp: u32::from_be_bytes([packet[4], packet[5], packet[6], packet[7]]),
            ssrc: u32::from_be_bytes([packet[8], packet[9], packet[10], packet[11]]),
        };
        Ok((header, offset))
    }
}

/// Outbound RTP packet builder for one stream
///
/// Tracks sequence number and media timestamp; the SSRC is randomized
/// at creation.
pub struct Packetizer {
    payload_type: u8,
    sequence: u16,
    timestamp: u32,
    ssrc: u32,
    first: bool,
}

impl Packetizer {
    pub fn new(payload_type: u8) -> Self {
        let mut rng = rand::thread_rng();
        Self {
            payload_type,
            sequence: rng.gen(),
            timestamp: rng.gen(),
            ssrc: rng.gen(),
            first: true,
        }
    }

    /// Wrap one encoded frame; `samples` advances the media clock.
    pub fn packetize(&mut self, payload: &[u8], samples: u32) -> Bytes {
        let header = RtpHeader {
            payload_type: self.payload_type,
            // Marker set on the first packet of the stream
            marker: self.first,
            sequence: self.sequence,
            timestamp: self.timestamp,
            ssrc: self.ssrc,
        };
        self.first = false;
        self.sequence = self.sequence.wrapping_add(1);
        self.timestamp = self.timestamp.wrapping_add(samples);
        header.build_packet(payload)
    }

    pub fn ssrc(&self) -> u32 {
        self.ssrc
    }

    /// Minimal RTCP sender report for this stream (no report blocks).
    pub fn sender_report(&self, packets_sent: u32, bytes_sent: u32) -> Bytes {
        let mut buf = BytesMut::with_capacity(28);
        buf.put_u8(0b1000_0000); // V=2, no padding, RC=0
        buf.put_u8(200); // PT=SR
        buf.put_u16(6); // length in words minus one
        buf.put_u32(self.ssrc);
        buf.put_u64(ntp_now());
        buf.put_u32(self.timestamp);
        buf.put_u32(packets_sent);
        buf.put_u32(bytes_sent);
        buf.freeze()
    }
}

/// Current time as a 64-bit NTP timestamp.
fn ntp_now() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};

    // Seconds between the NTP epoch (1900) and the Unix epoch (1970)
    const NTP_UNIX_OFFSET: u64 = 2_208_988_800;

    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    let seconds = now.as_secs() + NTP_UNIX_OFFSET;
    let fraction = ((now.subsec_nanos() as u64) << 32) / 1_000_000_000;
    (seconds << 32) | fraction
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_round_trip() {
        let header = RtpHeader {
            payload_type: 96,
            marker: true,
            sequence: 4711,
            timestamp: 123_456_789,
            ssrc: 0xDEAD_BEEF,
        };
        let payload = [1u8, 2, 3, 4];
        let packet = header.build_packet(&payload);

        let (parsed, offset) = RtpHeader::parse(&packet).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(&packet[offset..], &payload);
    }

    #[test]
    fn test_truncated_packet_rejected() {
        assert!(RtpHeader::parse(&[]).is_err());
        assert!(RtpHeader::parse(&[0x80; 11]).is_err());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut packet = [0u8; 12];
        packet[0] = 0x40; // version 1
        assert!(RtpHeader::parse(&packet).is_err());
    }

    #[test]
    fn test_packetizer_advances() {
        let mut packetizer = Packetizer::new(0);
        let p1 = packetizer.packetize(&[0u8; 160], 160);
        let p2 = packetizer.packetize(&[0u8; 160], 160);

        let (h1, _) = RtpHeader::parse(&p1).unwrap();
        let (h2, _) = RtpHeader::parse(&p2).unwrap();

        assert!(h1.marker);
        assert!(!h2.marker);
        assert_eq!(h2.sequence, h1.sequence.wrapping_add(1));
        assert_eq!(h2.timestamp, h1.timestamp.wrapping_add(160));
        assert_eq!(h1.ssrc, h2.ssrc);
    }

    #[test]
    fn test_sender_report_shape() {
        let packetizer = Packetizer::new(96);
        let sr = packetizer.sender_report(10, 1600);
        assert_eq!(sr.len(), 28);
        assert_eq!(sr[1], 200);
        assert_eq!(&sr[4..8], &packetizer.ssrc().to_be_bytes());
    }
}
