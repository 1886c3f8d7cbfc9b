//! Voice engine boundary
//!
//! The session core drives any engine through [`VoiceEngine`]; the
//! engine pushes outbound packets back through [`EngineTransport`].
//! [`BuiltinEngine`] is the bundled implementation (Opus + G.711 over
//! cpal devices).

mod builtin;
mod channel;

pub use builtin::BuiltinEngine;

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::codec::CodecDescriptor;
use crate::error::EngineError;

/// Opaque engine-side handle for one active audio session
pub type ChannelId = u32;

pub type EngineResult<T> = Result<T, EngineError>;

/// Outbound packet sink registered at channel creation.
///
/// Implementations must copy the bytes and return immediately; the
/// engine's send path never waits on the network.
pub trait EngineTransport: Send + Sync {
    fn send_rtp(&self, packet: &[u8]) -> bool;
    fn send_rtcp(&self, packet: &[u8]) -> bool;
}

/// Everything the session state machine needs from a voice engine.
///
/// Channel creation is non-failing by contract: a returned id is valid
/// until released. Errors from operations on a valid channel are
/// engine-internal inconsistencies; the session layer treats the
/// codec-set and release operations among them as unrecoverable.
pub trait VoiceEngine: Send {
    /// Advertised encoder descriptors, fixed after construction.
    fn supported_codecs(&self) -> &[CodecDescriptor];

    fn create_channel(&mut self, transport: Arc<dyn EngineTransport>) -> ChannelId;

    fn release_channel(&mut self, channel: ChannelId) -> EngineResult<()>;

    /// Install the outbound codec for the channel.
    fn set_send_codec(
        &mut self,
        channel: ChannelId,
        payload_type: u8,
        codec: &CodecDescriptor,
    ) -> EngineResult<()>;

    /// Replace the channel's receive codec set atomically.
    fn set_receive_codecs(
        &mut self,
        channel: ChannelId,
        codecs: &BTreeMap<u8, CodecDescriptor>,
    ) -> EngineResult<()>;

    fn start_send(&mut self, channel: ChannelId) -> EngineResult<()>;
    fn stop_send(&mut self, channel: ChannelId) -> EngineResult<()>;
    fn start_playout(&mut self, channel: ChannelId) -> EngineResult<()>;
    fn stop_playout(&mut self, channel: ChannelId) -> EngineResult<()>;

    /// Feed one inbound RTP packet to the channel.
    fn receive_rtp(&mut self, channel: ChannelId, packet: &[u8]) -> EngineResult<()>;

    /// Feed one inbound RTCP packet to the channel.
    fn receive_rtcp(&mut self, channel: ChannelId, packet: &[u8]) -> EngineResult<()>;
}
