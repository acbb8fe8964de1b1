use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// Transient, auto-dismissing user notifications.
///
/// The host decides how notices are shown; failures routed here never carry
/// control flow.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Default sink that forwards notices to the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, kind: NoticeKind, message: &str) {
        match kind {
            NoticeKind::Error => warn!("{}", message),
            NoticeKind::Success => info!("{}", message),
        }
    }
}
