//! Built-in voice engine: Opus and G.711 over the default cpal devices

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::codec::{CodecDescriptor, PT_OPUS, PT_PCMA, PT_PCMU};
use crate::engine::channel::Channel;
use crate::engine::{ChannelId, EngineResult, EngineTransport, VoiceEngine};
use crate::error::EngineError;

/// Bundled [`VoiceEngine`] implementation.
///
/// Advertises opus, PCMU and PCMA. Send and playout run against the
/// host's default audio devices; a machine without devices still
/// supports codec assignment and packet ingestion, only the start
/// operations fail (recoverably).
pub struct BuiltinEngine {
    codecs: Vec<CodecDescriptor>,
    channels: HashMap<ChannelId, Channel>,
    next_channel: ChannelId,
}

impl BuiltinEngine {
    pub fn new() -> Self {
        Self {
            codecs: vec![
                CodecDescriptor::new("opus", PT_OPUS, 48_000, 2),
                CodecDescriptor::new("PCMU", PT_PCMU, 8_000, 1),
                CodecDescriptor::new("PCMA", PT_PCMA, 8_000, 1),
            ],
            channels: HashMap::new(),
            next_channel: 0,
        }
    }

    fn channel_mut(&mut self, channel: ChannelId) -> EngineResult<&mut Channel> {
        self.channels
            .get_mut(&channel)
            .ok_or(EngineError::ChannelNotFound(channel))
    }
}

impl Default for BuiltinEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl VoiceEngine for BuiltinEngine {
    fn supported_codecs(&self) -> &[CodecDescriptor] {
        &self.codecs
    }

    fn create_channel(&mut self, transport: Arc<dyn EngineTransport>) -> ChannelId {
        let id = self.next_channel;
        self.next_channel = self.next_channel.wrapping_add(1);
        self.channels.insert(id, Channel::new(transport));
        tracing::debug!("created engine channel {}", id);
        id
    }

    fn release_channel(&mut self, channel: ChannelId) -> EngineResult<()> {
        let mut released = self
            .channels
            .remove(&channel)
            .ok_or(EngineError::ChannelNotFound(channel))?;
        released.shutdown();
        tracing::debug!("released engine channel {}", channel);
        Ok(())
    }

    fn set_send_codec(
        &mut self,
        channel: ChannelId,
        payload_type: u8,
        codec: &CodecDescriptor,
    ) -> EngineResult<()> {
        let mut codec = codec.clone();
        codec.payload_type = payload_type;
        self.channel_mut(channel)?.set_send_codec(codec);
        Ok(())
    }

    fn set_receive_codecs(
        &mut self,
        channel: ChannelId,
        codecs: &BTreeMap<u8, CodecDescriptor>,
    ) -> EngineResult<()> {
        self.channel_mut(channel)?.set_receive_codecs(codecs);
        Ok(())
    }

    fn start_send(&mut self, channel: ChannelId) -> EngineResult<()> {
        self.channel_mut(channel)?.start_send()
    }

    fn stop_send(&mut self, channel: ChannelId) -> EngineResult<()> {
        self.channel_mut(channel)?.stop_send();
        Ok(())
    }

    fn start_playout(&mut self, channel: ChannelId) -> EngineResult<()> {
        self.channel_mut(channel)?.start_playout()
    }

    fn stop_playout(&mut self, channel: ChannelId) -> EngineResult<()> {
        self.channel_mut(channel)?.stop_playout();
        Ok(())
    }

    fn receive_rtp(&mut self, channel: ChannelId, packet: &[u8]) -> EngineResult<()> {
        self.channel_mut(channel)?.receive_rtp(packet);
        Ok(())
    }

    fn receive_rtcp(&mut self, channel: ChannelId, packet: &[u8]) -> EngineResult<()> {
        self.channel_mut(channel)?.receive_rtcp(packet);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    struct CountingTransport {
        rtp: AtomicUsize,
    }

    impl EngineTransport for CountingTransport {
        fn send_rtp(&self, _packet: &[u8]) -> bool {
            self.rtp.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
            true
        }
        fn send_rtcp(&self, _packet: &[u8]) -> bool {
            true
        }
    }

    fn transport() -> Arc<CountingTransport> {
        Arc::new(CountingTransport {
            rtp: AtomicUsize::new(0),
        })
    }

    #[test]
    fn test_advertised_codecs() {
        let engine = BuiltinEngine::new();
        let names: Vec<_> = engine.supported_codecs().iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["opus", "PCMU", "PCMA"]);
    }

    #[test]
    fn test_channel_lifecycle() {
        let mut engine = BuiltinEngine::new();
        let id = engine.create_channel(transport());
        assert!(engine.release_channel(id).is_ok());
        assert!(matches!(
            engine.release_channel(id),
            Err(EngineError::ChannelNotFound(_))
        ));
    }

    #[test]
    fn test_channel_ids_unique() {
        let mut engine = BuiltinEngine::new();
        let a = engine.create_channel(transport());
        let b = engine.create_channel(transport());
        assert_ne!(a, b);
    }

    #[test]
    fn test_operations_on_unknown_channel() {
        let mut engine = BuiltinEngine::new();
        assert!(engine.start_send(42).is_err());
        assert!(engine.receive_rtp(42, &[]).is_err());
        assert!(engine
            .set_receive_codecs(42, &BTreeMap::new())
            .is_err());
    }

    #[test]
    fn test_codec_assignment() {
        let mut engine = BuiltinEngine::new();
        let id = engine.create_channel(transport());

        let opus = engine.supported_codecs()[0].clone();
        assert!(engine.set_send_codec(id, opus.payload_type, &opus).is_ok());

        let mut set = BTreeMap::new();
        set.insert(opus.payload_type, opus);
        assert!(engine.set_receive_codecs(id, &set).is_ok());
    }
}
