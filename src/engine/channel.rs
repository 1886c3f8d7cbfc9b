//! Per-channel encode/decode state for the built-in engine

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::audio::buffer::{create_shared_buffer, AudioFrame, JitterBuffer, SharedRingBuffer};
use crate::audio::capture::AudioCapture;
use crate::audio::playout::AudioPlayout;
use crate::codec::{self, CodecDescriptor, OpusDecoder, OpusEncoder};
use crate::engine::{EngineResult, EngineTransport};
use crate::error::{CodecError, EngineError};
use crate::rtp::{Packetizer, RtpHeader};

/// 20 ms frame at the 48 kHz engine rate
const FRAME_SAMPLES_48K: usize = 960;
/// 20 ms frame at the 8 kHz G.711 rate
const FRAME_SAMPLES_8K: usize = 160;
/// 48 kHz / 8 kHz
const G711_RATIO: usize = 6;
/// Jitter buffer: 64 slots, start playout after 2 frames (40 ms)
const JITTER_CAPACITY: usize = 64;
const JITTER_MIN_DELAY: usize = 2;
/// RTCP sender-report interval
const RTCP_INTERVAL: Duration = Duration::from_secs(5);

/// One engine channel: codec assignments plus the running pipelines.
pub(crate) struct Channel {
    transport: Arc<dyn EngineTransport>,
    send_codec: Option<CodecDescriptor>,
    receive_codecs: BTreeMap<u8, CodecDescriptor>,
    decoders: HashMap<u8, RecvDecoder>,
    jitter: Arc<Mutex<JitterBuffer>>,
    send: Option<SendPipeline>,
    playout: Option<AudioPlayout>,
}

impl Channel {
    pub(crate) fn new(transport: Arc<dyn EngineTransport>) -> Self {
        Self {
            transport,
            send_codec: None,
            receive_codecs: BTreeMap::new(),
            decoders: HashMap::new(),
            jitter: Arc::new(Mutex::new(JitterBuffer::new(
                JITTER_CAPACITY,
                JITTER_MIN_DELAY,
            ))),
            send: None,
            playout: None,
        }
    }

    pub(crate) fn set_send_codec(&mut self, codec: CodecDescriptor) {
        self.send_codec = Some(codec);
    }

    pub(crate) fn set_receive_codecs(&mut self, codecs: &BTreeMap<u8, CodecDescriptor>) {
        self.receive_codecs = codecs.clone();
        // Stale decoder instances go with the old set
        self.decoders.retain(|pt, _| codecs.contains_key(pt));
    }

    pub(crate) fn start_send(&mut self) -> EngineResult<()> {
        if self.send.is_some() {
            return Ok(());
        }
        let codec = self.send_codec.clone().ok_or(EngineError::NoSendCodec)?;
        let pipeline = SendPipeline::start(codec, self.transport.clone())?;
        self.send = Some(pipeline);
        Ok(())
    }

    pub(crate) fn stop_send(&mut self) {
        if let Some(mut pipeline) = self.send.take() {
            pipeline.stop();
        }
    }

    pub(crate) fn start_playout(&mut self) -> EngineResult<()> {
        if self.playout.is_some() {
            return Ok(());
        }
        let mut playout = AudioPlayout::new(self.jitter.clone());
        playout
            .start()
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;
        self.playout = Some(playout);
        Ok(())
    }

    pub(crate) fn stop_playout(&mut self) {
        if let Some(mut playout) = self.playout.take() {
            playout.stop();
        }
    }

    /// Decode one inbound RTP packet into the jitter buffer.
    ///
    /// Malformed packets and unknown payload types come off the wire,
    /// not from the caller, so they are logged and dropped rather than
    /// reported as errors.
    pub(crate) fn receive_rtp(&mut self, packet: &[u8]) {
        let (header, payload_offset) = match RtpHeader::parse(packet) {
            Ok(parsed) => parsed,
            Err(_) => {
                tracing::warn!("dropping malformed RTP packet ({} bytes)", packet.len());
                return;
            }
        };

        let Some(descriptor) = self.receive_codecs.get(&header.payload_type).cloned() else {
            tracing::trace!(
                "dropping RTP packet with unmapped payload type {}",
                header.payload_type
            );
            return;
        };

        let decoder = match self.decoders.entry(header.payload_type) {
            std::collections::hash_map::Entry::Occupied(entry) => entry.into_mut(),
            std::collections::hash_map::Entry::Vacant(entry) => {
                match RecvDecoder::for_codec(&descriptor) {
                    Ok(decoder) => entry.insert(decoder),
                    Err(e) => {
                        tracing::warn!("cannot decode {}: {}", descriptor.name, e);
                        return;
                    }
                }
            }
        };

        match decoder.decode(&packet[payload_offset..]) {
            Ok(samples) => {
                self.jitter
                    .lock()
                    .insert(AudioFrame::new(samples, header.sequence));
            }
            Err(e) => {
                tracing::warn!("decode failed for payload type {}: {}", header.payload_type, e);
            }
        }
    }

    pub(crate) fn receive_rtcp(&mut self, packet: &[u8]) {
        // Control traffic is accepted opaquely; nothing acts on it yet
        tracing::trace!("received RTCP packet, {} bytes", packet.len());
    }

    pub(crate) fn shutdown(&mut self) {
        self.stop_send();
        self.stop_playout();
    }

    #[cfg(test)]
    pub(crate) fn jitter_level(&self) -> usize {
        self.jitter.lock().level()
    }
}

/// Capture thread + encode worker for one outbound stream
struct SendPipeline {
    running: Arc<AtomicBool>,
    capture: AudioCapture,
    worker: Option<JoinHandle<()>>,
}

impl SendPipeline {
    fn start(
        codec: CodecDescriptor,
        transport: Arc<dyn EngineTransport>,
    ) -> EngineResult<Self> {
        let ring = create_shared_buffer(64);
        let mut capture = AudioCapture::new(ring.clone());
        capture
            .start()
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;

        let mut frame_codec = FrameCodec::for_codec(&codec)?;
        let packetizer = Packetizer::new(codec.payload_type);
        let running = Arc::new(AtomicBool::new(true));
        let worker_running = running.clone();

        let worker = thread::Builder::new()
            .name("voice-encode".to_string())
            .spawn(move || {
                encode_loop(worker_running, ring, &mut frame_codec, packetizer, transport);
            })
            .map_err(|e| EngineError::DeviceUnavailable(e.to_string()))?;

        Ok(Self {
            running,
            capture,
            worker: Some(worker),
        })
    }

    fn stop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        while let Some(e) = self.capture.check_errors() {
            tracing::warn!("capture error during session: {}", e);
        }
        self.capture.stop();
        if let Some(worker) = self.worker.take() {
            let _ = worker.join();
        }
    }
}

impl Drop for SendPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn encode_loop(
    running: Arc<AtomicBool>,
    ring: SharedRingBuffer,
    codec: &mut FrameCodec,
    mut packetizer: Packetizer,
    transport: Arc<dyn EngineTransport>,
) {
    let mut sample_buffer: Vec<f32> = Vec::with_capacity(FRAME_SAMPLES_48K * 2);
    let mut packets_sent: u32 = 0;
    let mut bytes_sent: u32 = 0;
    let mut last_report = Instant::now();

    while running.load(Ordering::Relaxed) {
        while let Some(frame) = ring.try_pop() {
            sample_buffer.extend_from_slice(&frame.samples);
        }

        while sample_buffer.len() >= FRAME_SAMPLES_48K {
            let frame: Vec<f32> = sample_buffer.drain(..FRAME_SAMPLES_48K).collect();
            match codec.encode(&frame) {
                Ok((payload, clock_samples)) => {
                    let packet = packetizer.packetize(&payload, clock_samples);
                    if !transport.send_rtp(&packet) {
                        tracing::debug!("transport refused outbound RTP packet");
                    }
                    packets_sent = packets_sent.wrapping_add(1);
                    bytes_sent = bytes_sent.wrapping_add(payload.len() as u32);
                }
                Err(e) => {
                    tracing::warn!("encoding failed: {}", e);
                }
            }
        }

        if last_report.elapsed() >= RTCP_INTERVAL {
            let report = packetizer.sender_report(packets_sent, bytes_sent);
            if !transport.send_rtcp(&report) {
                tracing::debug!("transport refused outbound RTCP packet");
            }
            last_report = Instant::now();
        }

        thread::sleep(Duration::from_millis(2));
    }
}

/// Frame encoder for the outbound codec
enum FrameCodec {
    Opus(OpusEncoder),
    G711 { compress: fn(i16) -> u8 },
}

impl FrameCodec {
    fn for_codec(codec: &CodecDescriptor) -> Result<Self, EngineError> {
        match codec.name {
            "opus" => Ok(Self::Opus(OpusEncoder::voice(48_000, FRAME_SAMPLES_48K)?)),
            "PCMU" => Ok(Self::G711 {
                compress: codec::ulaw_compress,
            }),
            "PCMA" => Ok(Self::G711 {
                compress: codec::alaw_compress,
            }),
            other => Err(EngineError::Codec(CodecError::UnknownCodec(
                other.to_string(),
            ))),
        }
    }

    /// Encode one 48 kHz frame; returns the payload and the RTP clock
    /// advance in the codec's own clock rate.
    fn encode(&mut self, frame: &[f32]) -> Result<(Vec<u8>, u32), CodecError> {
        match self {
            Self::Opus(encoder) => {
                let bytes = encoder.encode(frame)?;
                Ok((bytes.to_vec(), FRAME_SAMPLES_48K as u32))
            }
            Self::G711 { compress } => {
                let narrow = downsample(frame, G711_RATIO);
                let mut payload = Vec::with_capacity(FRAME_SAMPLES_8K);
                codec::g711::compress_f32(&narrow, *compress, &mut payload);
                Ok((payload, FRAME_SAMPLES_8K as u32))
            }
        }
    }
}

/// Frame decoder for one inbound payload type
enum RecvDecoder {
    Opus(OpusDecoder),
    G711 { expand: fn(u8) -> i16 },
}

impl RecvDecoder {
    fn for_codec(codec: &CodecDescriptor) -> Result<Self, CodecError> {
        match codec.name {
            "opus" => Ok(Self::Opus(OpusDecoder::voice(48_000)?)),
            "PCMU" => Ok(Self::G711 {
                expand: codec::ulaw_expand,
            }),
            "PCMA" => Ok(Self::G711 {
                expand: codec::alaw_expand,
            }),
            other => Err(CodecError::UnknownCodec(other.to_string())),
        }
    }

    /// Decode a payload to 48 kHz samples.
    fn decode(&mut self, payload: &[u8]) -> Result<Vec<f32>, CodecError> {
        match self {
            Self::Opus(decoder) => decoder.decode(payload),
            Self::G711 { expand } => {
                let mut narrow = Vec::with_capacity(payload.len());
                codec::g711::expand_f32(payload, *expand, &mut narrow);
                Ok(upsample(&narrow, G711_RATIO))
            }
        }
    }
}

/// Integer-factor decimation by block average.
fn downsample(samples: &[f32], factor: usize) -> Vec<f32> {
    samples
        .chunks(factor)
        .map(|chunk| chunk.iter().sum::<f32>() / chunk.len() as f32)
        .collect()
}

/// Integer-factor expansion by linear interpolation between samples.
fn upsample(samples: &[f32], factor: usize) -> Vec<f32> {
    let mut out = Vec::with_capacity(samples.len() * factor);
    for (i, &current) in samples.iter().enumerate() {
        let next = samples.get(i + 1).copied().unwrap_or(current);
        for step in 0..factor {
            let t = step as f32 / factor as f32;
            out.push(current + (next - current) * t);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{PT_OPUS, PT_PCMU};
    use std::sync::atomic::AtomicUsize;

    struct NullTransport {
        rtp_count: AtomicUsize,
    }

    impl NullTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                rtp_count: AtomicUsize::new(0),
            })
        }
    }

    impl EngineTransport for NullTransport {
        fn send_rtp(&self, _packet: &[u8]) -> bool {
            self.rtp_count.fetch_add(1, Ordering::Relaxed);
            true
        }
        fn send_rtcp(&self, _packet: &[u8]) -> bool {
            true
        }
    }

    fn opus_descriptor() -> CodecDescriptor {
        CodecDescriptor::new("opus", PT_OPUS, 48_000, 2)
    }

    fn pcmu_descriptor() -> CodecDescriptor {
        CodecDescriptor::new("PCMU", PT_PCMU, 8_000, 1)
    }

    #[test]
    fn test_resample_round_lengths() {
        let narrow = downsample(&vec![0.5f32; 960], 6);
        assert_eq!(narrow.len(), 160);
        let wide = upsample(&narrow, 6);
        assert_eq!(wide.len(), 960);
        assert!((wide[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_receive_opus_packet_fills_jitter() {
        let mut channel = Channel::new(NullTransport::new());
        let mut codecs = BTreeMap::new();
        codecs.insert(PT_OPUS, opus_descriptor());
        channel.set_receive_codecs(&codecs);

        let mut encoder = OpusEncoder::voice(48_000, FRAME_SAMPLES_48K).unwrap();
        let payload = encoder.encode(&vec![0.0f32; FRAME_SAMPLES_48K]).unwrap();
        let mut packetizer = Packetizer::new(PT_OPUS);
        let packet = packetizer.packetize(&payload, FRAME_SAMPLES_48K as u32);

        channel.receive_rtp(&packet);
        assert_eq!(channel.jitter_level(), 1);
    }

    #[test]
    fn test_receive_unmapped_payload_type_dropped() {
        let mut channel = Channel::new(NullTransport::new());
        let mut codecs = BTreeMap::new();
        codecs.insert(PT_PCMU, pcmu_descriptor());
        channel.set_receive_codecs(&codecs);

        let mut packetizer = Packetizer::new(PT_OPUS);
        let packet = packetizer.packetize(&[0u8; 4], 960);

        channel.receive_rtp(&packet);
        assert_eq!(channel.jitter_level(), 0);
    }

    #[test]
    fn test_receive_pcmu_packet() {
        let mut channel = Channel::new(NullTransport::new());
        let mut codecs = BTreeMap::new();
        codecs.insert(PT_PCMU, pcmu_descriptor());
        channel.set_receive_codecs(&codecs);

        let mut packetizer = Packetizer::new(PT_PCMU);
        let payload = vec![0xFFu8; FRAME_SAMPLES_8K];
        let packet = packetizer.packetize(&payload, FRAME_SAMPLES_8K as u32);

        channel.receive_rtp(&packet);
        assert_eq!(channel.jitter_level(), 1);
    }

    #[test]
    fn test_malformed_packet_ignored() {
        let mut channel = Channel::new(NullTransport::new());
        channel.receive_rtp(&[0u8; 3]);
        assert_eq!(channel.jitter_level(), 0);
    }

    #[test]
    fn test_start_send_requires_codec() {
        let mut channel = Channel::new(NullTransport::new());
        assert!(matches!(
            channel.start_send(),
            Err(EngineError::NoSendCodec)
        ));
    }
}
