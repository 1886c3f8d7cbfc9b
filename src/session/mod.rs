//! Session engine
//!
//! All mutable session state (engine handle, channel id, socket pair,
//! addresses) is owned by a single actor task, the session context.
//! Public operations are fire-and-forget commands marshalled onto the
//! actor's FIFO queue from any thread; outcomes come back through the
//! weakly-held [`SessionObserver`].

mod actor;
mod command;
mod handle;
mod observer;

pub use command::SessionCommand;
pub use handle::SessionHandle;
pub use observer::SessionObserver;

use std::sync::Weak;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::engine::VoiceEngine;

use actor::SessionActor;

/// Owner of the session actor task.
///
/// Created once at process start. Dropping it (or calling
/// [`Session::shutdown`]) tears the actor down; clones of the handle
/// keep working but their commands go nowhere.
pub struct Session {
    handle: SessionHandle,
    task: Option<JoinHandle<()>>,
}

impl Session {
    /// Bootstrap the session context. Synchronous by design: the engine
    /// is constructed before the client becomes usable, and its codec
    /// list is snapshotted here for lock-free queries.
    pub fn spawn(engine: Box<dyn VoiceEngine>, observer: Weak<dyn SessionObserver>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let codecs = engine.supported_codecs().to_vec();
        let handle = SessionHandle::new(tx.clone(), codecs);

        let actor = SessionActor::new(engine, observer, tx);
        let task = tokio::spawn(actor.run(rx));

        Self {
            handle,
            task: Some(task),
        }
    }

    pub fn handle(&self) -> SessionHandle {
        self.handle.clone()
    }

    /// Stop the actor and wait for it to drain.
    pub async fn shutdown(mut self) {
        self.handle.post(SessionCommand::Shutdown);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if self.task.is_some() {
            self.handle.post(SessionCommand::Shutdown);
        }
    }
}
