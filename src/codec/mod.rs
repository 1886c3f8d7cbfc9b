//! Codec descriptors and audio codecs
//!
//! The descriptor table mirrors the RTP payload-type conventions:
//! PCMU, PCMA and G722 carry static payload types, while opus, ISAC
//! and ILBC use numbers from the dynamic range.

pub mod g711;
pub mod opus;

pub use g711::{alaw_compress, alaw_expand, ulaw_compress, ulaw_expand};
pub use opus::{OpusDecoder, OpusEncoder};

/// Static payload type for PCMU (G.711 µ-law)
pub const PT_PCMU: u8 = 0;
/// Static payload type for PCMA (G.711 A-law)
pub const PT_PCMA: u8 = 8;
/// Static payload type for G722
pub const PT_G722: u8 = 9;
/// Dynamic payload type assigned to opus
pub const PT_OPUS: u8 = 96;
/// Dynamic payload type assigned to ISAC
pub const PT_ISAC: u8 = 97;
/// Dynamic payload type assigned to ILBC
pub const PT_ILBC: u8 = 98;

/// Read-only description of a codec: wire name plus its RTP format.
///
/// Immutable after engine initialization; the engine's advertised
/// encoder list is a slice of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecDescriptor {
    /// Codec name as it appears on the wire ("PCMU", "opus", ...)
    pub name: &'static str,
    /// RTP payload type
    pub payload_type: u8,
    /// RTP clock rate in Hz
    pub clock_rate: u32,
    /// Channel count per RTP convention
    pub channels: u16,
}

impl CodecDescriptor {
    pub const fn new(name: &'static str, payload_type: u8, clock_rate: u32, channels: u16) -> Self {
        Self {
            name,
            payload_type,
            clock_rate,
            channels,
        }
    }
}

/// Payload type for a built-in codec name, if known.
pub fn payload_type_for(codec_name: &str) -> Option<u8> {
    match codec_name {
        "PCMU" => Some(PT_PCMU),
        "PCMA" => Some(PT_PCMA),
        "G722" => Some(PT_G722),
        "opus" => Some(PT_OPUS),
        "ISAC" => Some(PT_ISAC),
        "ILBC" => Some(PT_ILBC),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_payload_types() {
        assert_eq!(payload_type_for("PCMU"), Some(0));
        assert_eq!(payload_type_for("PCMA"), Some(8));
        assert_eq!(payload_type_for("G722"), Some(9));
    }

    #[test]
    fn test_dynamic_payload_types() {
        assert_eq!(payload_type_for("opus"), Some(96));
        assert_eq!(payload_type_for("ISAC"), Some(97));
        assert_eq!(payload_type_for("ILBC"), Some(98));
    }

    #[test]
    fn test_unknown_codec() {
        assert_eq!(payload_type_for("AMR-WB"), None);
        assert_eq!(payload_type_for(""), None);
        // Lookup is case sensitive, exact match only
        assert_eq!(payload_type_for("pcmu"), None);
    }
}
