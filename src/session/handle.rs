//! Cross-context dispatch handle
//!
//! The handle is the only way in: every mutating operation becomes a
//! [`SessionCommand`] on the actor's FIFO queue and returns to the
//! caller immediately. Queue order is the happens-before order for all
//! session state.

use std::net::IpAddr;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::codec::CodecDescriptor;
use crate::session::SessionCommand;

/// Cloneable, thread-safe entry point to the session actor.
#[derive(Clone)]
pub struct SessionHandle {
    tx: UnboundedSender<SessionCommand>,
    codecs: Arc<Vec<CodecDescriptor>>,
}

impl SessionHandle {
    pub(crate) fn new(tx: UnboundedSender<SessionCommand>, codecs: Vec<CodecDescriptor>) -> Self {
        Self {
            tx,
            codecs: Arc::new(codecs),
        }
    }

    pub(crate) fn post(&self, command: SessionCommand) {
        // A closed queue means the session is shutting down; callers
        // are fire-and-forget so there is nothing to report
        if self.tx.send(command).is_err() {
            tracing::debug!("session context gone, command dropped");
        }
    }

    /// Engine codec list snapshotted at bootstrap.
    pub fn supported_codecs(&self) -> &[CodecDescriptor] {
        &self.codecs
    }

    pub fn set_encoder(&self, encoder: &str) {
        self.post(SessionCommand::SetEncoder(encoder.to_string()));
    }

    pub fn set_decoders(&self, decoders: &[String]) {
        self.post(SessionCommand::SetDecoders(decoders.to_vec()));
    }

    pub fn set_local_address(&self, ip: IpAddr, rtp_port: u16) {
        self.post(SessionCommand::SetLocalAddress(ip, rtp_port));
    }

    pub fn set_remote_address(&self, ip: IpAddr, rtp_port: u16) {
        self.post(SessionCommand::SetRemoteAddress(ip, rtp_port));
    }

    pub fn start_session(&self) {
        self.post(SessionCommand::StartSession);
    }

    pub fn stop_session(&self) {
        self.post(SessionCommand::StopSession);
    }

    pub fn start_send(&self) {
        self.post(SessionCommand::StartSend);
    }

    pub fn stop_send(&self) {
        self.post(SessionCommand::StopSend);
    }

    pub fn start_playout(&self) {
        self.post(SessionCommand::StartPlayout);
    }

    pub fn stop_playout(&self) {
        self.post(SessionCommand::StopPlayout);
    }
}
