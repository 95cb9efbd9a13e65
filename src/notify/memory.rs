use async_trait::async_trait;
use std::sync::{Mutex, MutexGuard};

use super::{Notifier, NotifyError};

#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
struct Inner {
    attempts: Vec<SentMessage>,
    failure: Option<String>,
}

/// Records every send attempt; can be switched to fail for tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    inner: Mutex<Inner>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(reason: &str) -> Self {
        let notifier = Self::default();
        notifier.lock().failure = Some(reason.to_string());
        notifier
    }

    /// All attempts, including failed ones.
    pub fn attempts(&self) -> Vec<SentMessage> {
        self.lock().attempts.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), NotifyError> {
        let mut inner = self.lock();
        inner.attempts.push(SentMessage {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        match &inner.failure {
            Some(reason) => Err(NotifyError::Transport(reason.clone())),
            None => Ok(()),
        }
    }
}
