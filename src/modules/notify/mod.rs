// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use std::{fmt, sync::Arc};

use tracing::{error, info, warn};

use crate::modules::actions::Undo;

/// "Retry now" affordance attached to the connectivity warning.
#[derive(Clone)]
pub struct RetryNow(Arc<dyn Fn() + Send + Sync>);

impl RetryNow {
    pub fn new(f: impl Fn() + Send + Sync + 'static) -> Self {
        Self(Arc::new(f))
    }

    pub fn trigger(&self) {
        (self.0)()
    }
}

impl fmt::Debug for RetryNow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("RetryNow")
    }
}

/// User-facing notification surface. Implementations render nothing inside
/// the core; they only relay outcomes to whatever front-end is attached.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str, undo: Option<Undo>);

    fn warn(&self, message: &str, retry: RetryNow);

    /// Dismisses the connectivity warning raised by [`Notifier::warn`].
    fn close_warning(&self);

    fn error(&self, message: &str);

    fn new_mail(&self, title: &str, body: &str);
}

/// Relays every notification to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn success(&self, message: &str, undo: Option<Undo>) {
        match undo {
            Some(undo) => info!("{} (undo available: {:?})", message, undo),
            None => info!("{}", message),
        }
    }

    fn warn(&self, message: &str, _retry: RetryNow) {
        warn!("{}", message);
    }

    fn close_warning(&self) {
        info!("Connection to the mail server restored");
    }

    fn error(&self, message: &str) {
        error!("{}", message);
    }

    fn new_mail(&self, title: &str, body: &str) {
        info!("{}: {}", title, body);
    }
}

#[cfg(test)]
pub mod testing {
    use parking_lot::Mutex;

    use super::*;

    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Notice {
        Success(String, Option<Undo>),
        Warn(String),
        CloseWarning,
        Error(String),
        NewMail(String, String),
    }

    /// Keeps every notice, plus the last retry affordance offered.
    #[derive(Default)]
    pub struct RecordingNotifier {
        pub notices: Mutex<Vec<Notice>>,
        pub retry: Mutex<Option<RetryNow>>,
    }

    impl RecordingNotifier {
        pub fn notices(&self) -> Vec<Notice> {
            self.notices.lock().clone()
        }

        pub fn count(&self, pred: impl Fn(&Notice) -> bool) -> usize {
            self.notices.lock().iter().filter(|n| pred(n)).count()
        }
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, message: &str, undo: Option<Undo>) {
            self.notices
                .lock()
                .push(Notice::Success(message.to_string(), undo));
        }

        fn warn(&self, message: &str, retry: RetryNow) {
            self.notices.lock().push(Notice::Warn(message.to_string()));
            *self.retry.lock() = Some(retry);
        }

        fn close_warning(&self) {
            self.notices.lock().push(Notice::CloseWarning);
        }

        fn error(&self, message: &str) {
            self.notices.lock().push(Notice::Error(message.to_string()));
        }

        fn new_mail(&self, title: &str, body: &str) {
            self.notices
                .lock()
                .push(Notice::NewMail(title.to_string(), body.to_string()));
        }
    }
}
