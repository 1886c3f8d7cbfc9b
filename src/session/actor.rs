//! Session state machine
//!
//! Runs on a single tokio task. Every engine call and socket mutation
//! happens here, in command-queue order, so no field needs a lock.
//! Engine errors against a live channel are contract violations and
//! abort the process; everything else is reported as a boolean outcome
//! or logged and skipped.

use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::{Arc, Weak};

use bytes::Bytes;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};

use crate::engine::{ChannelId, EngineTransport, VoiceEngine};
use crate::net::{EndpointPair, InboundSink, TransportPair};
use crate::session::{SessionCommand, SessionObserver};

/// Adapter handing the engine's outbound packets to the session
/// context. The bytes are copied here so they outlive the callback.
struct CommandTransport {
    tx: UnboundedSender<SessionCommand>,
}

impl EngineTransport for CommandTransport {
    fn send_rtp(&self, packet: &[u8]) -> bool {
        self.tx
            .send(SessionCommand::SendRtp(Bytes::copy_from_slice(packet)))
            .is_ok()
    }

    fn send_rtcp(&self, packet: &[u8]) -> bool {
        self.tx
            .send(SessionCommand::SendRtcp(Bytes::copy_from_slice(packet)))
            .is_ok()
    }
}

/// Owner of all mutable session state.
pub(crate) struct SessionActor {
    engine: Box<dyn VoiceEngine>,
    observer: Weak<dyn SessionObserver>,
    /// Loopback sender for engine callbacks and socket readers
    tx: UnboundedSender<SessionCommand>,
    /// Present iff a session is active
    channel: Option<ChannelId>,
    /// Present iff the channel is present and both sockets bound
    transport: Option<TransportPair>,
    local: Option<EndpointPair>,
    remote: Option<EndpointPair>,
}

impl SessionActor {
    pub(crate) fn new(
        engine: Box<dyn VoiceEngine>,
        observer: Weak<dyn SessionObserver>,
        tx: UnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            engine,
            observer,
            tx,
            channel: None,
            transport: None,
            local: None,
            remote: None,
        }
    }

    pub(crate) async fn run(mut self, mut rx: UnboundedReceiver<SessionCommand>) {
        while let Some(command) = rx.recv().await {
            match command {
                SessionCommand::SetEncoder(name) => self.set_encoder(&name),
                SessionCommand::SetDecoders(names) => self.set_decoders(&names),
                SessionCommand::SetLocalAddress(ip, port) => {
                    if let Some(pair) = make_endpoints(ip, port, "local") {
                        self.local = Some(pair);
                    }
                }
                SessionCommand::SetRemoteAddress(ip, port) => {
                    if let Some(pair) = make_endpoints(ip, port, "remote") {
                        self.remote = Some(pair);
                    }
                }
                SessionCommand::StartSession => self.start_session(),
                SessionCommand::StopSession => self.stop_session(),
                SessionCommand::StartSend => self.start_send(),
                SessionCommand::StopSend => self.stop_send(),
                SessionCommand::StartPlayout => self.start_playout(),
                SessionCommand::StopPlayout => self.stop_playout(),
                SessionCommand::SendRtp(packet) => self.send_rtp(packet),
                SessionCommand::SendRtcp(packet) => self.send_rtcp(packet),
                SessionCommand::InboundRtp(packet) => self.inbound_rtp(packet),
                SessionCommand::InboundRtcp(packet) => self.inbound_rtcp(packet),
                SessionCommand::Shutdown => {
                    if let Some(channel) = self.channel.take() {
                        let _ = self.engine.stop_send(channel);
                        let _ = self.engine.stop_playout(channel);
                        let _ = self.engine.release_channel(channel);
                    }
                    self.transport = None;
                    break;
                }
            }
        }
    }

    fn notify(&self, deliver: impl FnOnce(&dyn SessionObserver)) {
        // Observer may be gone; completions are then dropped silently
        if let Some(observer) = self.observer.upgrade() {
            deliver(observer.as_ref());
        }
    }

    fn set_encoder(&mut self, name: &str) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            return;
        };
        let Some(codec) = self
            .engine
            .supported_codecs()
            .iter()
            .find(|codec| codec.name == name)
            .cloned()
        else {
            tracing::error!("encoder {} is not supported", name);
            return;
        };
        if let Err(e) = self
            .engine
            .set_send_codec(channel, codec.payload_type, &codec)
        {
            panic!("engine rejected send codec on live channel {channel}: {e}");
        }
    }

    fn set_decoders(&mut self, names: &[String]) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            return;
        };
        let decoder_set: BTreeMap<u8, _> = self
            .engine
            .supported_codecs()
            .iter()
            .filter(|codec| names.iter().any(|n| n == codec.name))
            .map(|codec| (codec.payload_type, codec.clone()))
            .collect();

        if let Err(e) = self.engine.set_receive_codecs(channel, &decoder_set) {
            panic!("engine rejected receive codecs on live channel {channel}: {e}");
        }
    }

    fn start_session(&mut self) {
        if self.channel.is_some() {
            tracing::error!("session already active");
            self.notify(|o| o.on_start_session_completed(false));
            return;
        }

        // Channel creation is non-failing by engine contract
        let callback: Arc<dyn EngineTransport> = Arc::new(CommandTransport {
            tx: self.tx.clone(),
        });
        let channel = self.engine.create_channel(callback);
        self.channel = Some(channel);

        let Some(local) = self.local else {
            tracing::error!("local address has not been configured");
            self.abort_start(channel);
            return;
        };

        let rtp_tx = self.tx.clone();
        let rtcp_tx = self.tx.clone();
        let sink = InboundSink {
            rtp: Box::new(move |packet| {
                let _ = rtp_tx.send(SessionCommand::InboundRtp(packet));
            }),
            rtcp: Box::new(move |packet| {
                let _ = rtcp_tx.send(SessionCommand::InboundRtcp(packet));
            }),
        };

        match TransportPair::bind(&local, sink) {
            Ok(pair) => {
                self.transport = Some(pair);
                self.notify(|o| o.on_start_session_completed(true));
            }
            Err(e) => {
                tracing::error!("socket creation failed: {}", e);
                self.abort_start(channel);
            }
        }
    }

    /// Roll a failed start back to Idle: no dangling channel, no half
    /// bound socket pair.
    fn abort_start(&mut self, channel: ChannelId) {
        self.transport = None;
        if let Err(e) = self.engine.release_channel(channel) {
            panic!("engine failed to release channel {channel}: {e}");
        }
        self.channel = None;
        self.notify(|o| o.on_start_session_completed(false));
    }

    fn stop_session(&mut self) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            self.notify(|o| o.on_stop_session_completed(false));
            return;
        };

        // Teardown is not atomic: a failed stop leaves the sockets
        // open and the channel allocated for a retry
        if self.engine.stop_send(channel).is_err() || self.engine.stop_playout(channel).is_err() {
            self.notify(|o| o.on_stop_session_completed(false));
            return;
        }

        self.transport = None;
        if let Err(e) = self.engine.release_channel(channel) {
            panic!("engine failed to release channel {channel}: {e}");
        }
        self.channel = None;
        self.notify(|o| o.on_stop_session_completed(true));
    }

    fn start_send(&mut self) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            self.notify(|o| o.on_start_send_completed(false));
            return;
        };
        let started = match self.engine.start_send(channel) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("start send failed: {}", e);
                false
            }
        };
        self.notify(|o| o.on_start_send_completed(started));
    }

    fn stop_send(&mut self) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            self.notify(|o| o.on_stop_send_completed(false));
            return;
        };
        let stopped = match self.engine.stop_send(channel) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("stop send failed: {}", e);
                false
            }
        };
        self.notify(|o| o.on_stop_send_completed(stopped));
    }

    fn start_playout(&mut self) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            self.notify(|o| o.on_start_playout_completed(false));
            return;
        };
        let started = match self.engine.start_playout(channel) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("start playout failed: {}", e);
                false
            }
        };
        self.notify(|o| o.on_start_playout_completed(started));
    }

    fn stop_playout(&mut self) {
        let Some(channel) = self.channel else {
            tracing::error!("channel has not been created");
            self.notify(|o| o.on_stop_playout_completed(false));
            return;
        };
        let stopped = match self.engine.stop_playout(channel) {
            Ok(()) => true,
            Err(e) => {
                tracing::error!("stop playout failed: {}", e);
                false
            }
        };
        self.notify(|o| o.on_stop_playout_completed(stopped));
    }

    fn send_rtp(&mut self, packet: Bytes) {
        match (&self.transport, self.remote) {
            (Some(transport), Some(remote)) => transport.send_rtp(&packet, remote.rtp),
            // A packet queued behind StopSession finds the state
            // cleared and no-ops
            _ => tracing::debug!("no active transport, dropping outbound RTP packet"),
        }
    }

    fn send_rtcp(&mut self, packet: Bytes) {
        match (&self.transport, self.remote) {
            (Some(transport), Some(remote)) => transport.send_rtcp(&packet, remote.rtcp),
            _ => tracing::debug!("no active transport, dropping outbound RTCP packet"),
        }
    }

    fn inbound_rtp(&mut self, packet: Bytes) {
        let Some(channel) = self.channel else {
            tracing::debug!("channel has not been created, dropping inbound RTP packet");
            return;
        };
        if let Err(e) = self.engine.receive_rtp(channel, &packet) {
            panic!("engine rejected inbound RTP on live channel {channel}: {e}");
        }
    }

    fn inbound_rtcp(&mut self, packet: Bytes) {
        let Some(channel) = self.channel else {
            tracing::debug!("channel has not been created, dropping inbound RTCP packet");
            return;
        };
        if let Err(e) = self.engine.receive_rtcp(channel, &packet) {
            panic!("engine rejected inbound RTCP on live channel {channel}: {e}");
        }
    }
}

fn make_endpoints(ip: IpAddr, rtp_port: u16, side: &str) -> Option<EndpointPair> {
    match EndpointPair::new(ip, rtp_port) {
        Ok(pair) => Some(pair),
        Err(e) => {
            tracing::warn!("ignoring invalid {} address: {}", side, e);
            None
        }
    }
}
