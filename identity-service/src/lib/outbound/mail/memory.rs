use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::errors::MailError;
use crate::domain::ports::MailTransport;

/// One message recorded by the collector.
#[derive(Debug, Clone)]
pub struct CapturedMail {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

impl CapturedMail {
    /// Extract the one-time code from the rendered body.
    pub fn code(&self) -> Option<String> {
        self.body
            .split(|c: char| !c.is_ascii_digit())
            .find(|segment| segment.len() >= 4)
            .map(str::to_string)
    }
}

/// Capturing mail transport for tests.
///
/// Records every accepted message; can be flipped into a failure mode to
/// exercise the rollback path of code issuance.
pub struct MailCollector {
    sent: Mutex<Vec<CapturedMail>>,
    fail: AtomicBool,
}

impl MailCollector {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// Make subsequent sends fail (or succeed again).
    pub fn fail_sends(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    /// Snapshot of every message accepted so far.
    pub fn sent(&self) -> Vec<CapturedMail> {
        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Most recent message accepted for a recipient.
    pub fn last_to(&self, recipient: &str) -> Option<CapturedMail> {
        self.sent()
            .into_iter()
            .rev()
            .find(|mail| mail.recipient == recipient)
    }
}

impl Default for MailCollector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MailTransport for MailCollector {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Transport("collector set to fail".to_string()));
        }

        self.sent
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(CapturedMail {
                recipient: recipient.to_string(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
        Ok(())
    }
}
