//! Notification display boundary.
//!
//! The engine only decides *when* to alert; rendering belongs to the
//! client (browser notification, toast). When display permission is
//! denied the client degrades to toast-only — from this side that is
//! simply a different `Notifier` behind the same trait.

/// User-visible alert sink. `tag` deduplicates repeat alerts for the
/// same dose on the display side.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, body: &str, tag: &str);
}

/// Default sink for the server process: structured log lines, which the
/// frontend surfaces as toasts via its event stream.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, body: &str, tag: &str) {
        tracing::info!(%title, %body, %tag, "notification");
    }
}
