//! Completion reporting

/// Observer of lifecycle operation outcomes.
///
/// The session holds only a `Weak` reference; once the observer is
/// dropped, notifications are silently discarded. Callbacks run on the
/// session context, not the thread that issued the request — observers
/// needing UI-thread delivery must re-dispatch themselves.
pub trait SessionObserver: Send + Sync {
    fn on_start_session_completed(&self, success: bool);
    fn on_stop_session_completed(&self, success: bool);
    fn on_start_send_completed(&self, success: bool);
    fn on_stop_send_completed(&self, success: bool);
    fn on_start_playout_completed(&self, success: bool);
    fn on_stop_playout_completed(&self, success: bool);
}
