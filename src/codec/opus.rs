//! Opus encoder/decoder wrappers
//!
//! Thin wrappers over the `opus` crate configured for mono voice at
//! 48 kHz. Buffers are reused across frames to avoid per-frame
//! allocations on the send path.

use bytes::Bytes;
use opus::{Application, Channels, Decoder, Encoder};

use crate::error::CodecError;

/// Maximum encoded Opus frame (spec caps frames at 1275 bytes)
const MAX_ENCODED_BYTES: usize = 4000;

/// Opus encoder for one outbound stream
pub struct OpusEncoder {
    encoder: Encoder,
    sample_rate: u32,
    /// Samples per frame, per channel
    frame_size: usize,
    encode_buffer: Vec<u8>,
}

impl OpusEncoder {
    /// Create a mono voice encoder producing frames of `frame_size`
    /// samples at `sample_rate`.
    pub fn voice(sample_rate: u32, frame_size: usize) -> Result<Self, CodecError> {
        let mut encoder = Encoder::new(sample_rate, Channels::Mono, Application::Voip)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;
        encoder
            .set_bitrate(opus::Bitrate::Bits(32_000))
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;
        encoder
            .set_inband_fec(false)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        Ok(Self {
            encoder,
            sample_rate,
            frame_size,
            encode_buffer: vec![0u8; MAX_ENCODED_BYTES],
        })
    }

    /// Encode one frame of interleaved f32 samples.
    pub fn encode(&mut self, samples: &[f32]) -> Result<Bytes, CodecError> {
        if samples.len() != self.frame_size {
            return Err(CodecError::InvalidFrameSize(samples.len()));
        }

        let size = self
            .encoder
            .encode_float(samples, &mut self.encode_buffer)
            .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

        Ok(Bytes::copy_from_slice(&self.encode_buffer[..size]))
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn frame_size(&self) -> usize {
        self.frame_size
    }
}

/// Opus decoder for one inbound stream
pub struct OpusDecoder {
    decoder: Decoder,
    /// Scratch buffer sized for the largest Opus frame (120 ms at 48 kHz)
    decode_buffer: Vec<f32>,
}

impl OpusDecoder {
    pub fn voice(sample_rate: u32) -> Result<Self, CodecError> {
        let decoder = Decoder::new(sample_rate, Channels::Mono)
            .map_err(|e| CodecError::DecoderInit(e.to_string()))?;
        Ok(Self {
            decoder,
            decode_buffer: vec![0f32; 5760],
        })
    }

    /// Decode one packet to f32 samples.
    pub fn decode(&mut self, packet: &[u8]) -> Result<Vec<f32>, CodecError> {
        let decoded = self
            .decoder
            .decode_float(packet, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;
        Ok(self.decode_buffer[..decoded].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_decode() {
        let mut encoder = OpusEncoder::voice(48000, 960).unwrap();
        let mut decoder = OpusDecoder::voice(48000).unwrap();
        assert_eq!(encoder.sample_rate(), 48000);
        assert_eq!(encoder.frame_size(), 960);

        let samples = vec![0.0f32; 960];
        let encoded = encoder.encode(&samples).unwrap();
        assert!(!encoded.is_empty());

        let decoded = decoder.decode(&encoded).unwrap();
        assert_eq!(decoded.len(), 960);
    }

    #[test]
    fn test_wrong_frame_size_rejected() {
        let mut encoder = OpusEncoder::voice(48000, 960).unwrap();
        let samples = vec![0.0f32; 100];
        assert!(matches!(
            encoder.encode(&samples),
            Err(CodecError::InvalidFrameSize(100))
        ));
    }
}
