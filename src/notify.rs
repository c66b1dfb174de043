//! Notification sink -- fire-and-forget alerts for high-severity anomalies
//! and proposed mitigations. Delivery mechanics live behind the trait;
//! the default sink writes structured log lines.

use std::sync::Arc;

pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

pub type SharedSink = Arc<dyn NotificationSink>;

/// Default sink: emits a warning-level tracing event per notification.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(%title, %message, "notification");
    }
}

pub mod testing {
    use super::*;
    use std::sync::Mutex;

    /// Captures notifications for assertions.
    #[derive(Default)]
    pub struct CapturingSink {
        pub sent: Mutex<Vec<(String, String)>>,
    }

    impl NotificationSink for CapturingSink {
        fn notify(&self, title: &str, message: &str) {
            self.sent.lock().unwrap().push((title.to_string(), message.to_string()));
        }
    }
}
