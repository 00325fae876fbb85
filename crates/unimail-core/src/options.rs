//! Per-operation options.

use std::time::Duration;

use tracing::warn;

use crate::model::ParsedMessage;
use crate::Result;

/// Default number of messages for a fetch.
pub const DEFAULT_FETCH_COUNT: u32 = 10;

/// Default mailbox.
pub const DEFAULT_MAILBOX: &str = "INBOX";

/// What to do when one message of a batch cannot be retrieved or parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartialResultPolicy {
    /// Abort the whole batch with the first error.
    FailFast,
    /// Log the failure, drop that message and keep going.
    SkipAndContinue,
}

impl PartialResultPolicy {
    /// Collects per-message results under this policy.
    pub(crate) fn collect(
        self,
        results: impl IntoIterator<Item = (u32, Result<ParsedMessage>)>,
    ) -> Result<Vec<ParsedMessage>> {
        let mut messages = Vec::new();
        for (seq, result) in results {
            match result {
                Ok(message) => messages.push(message),
                Err(e) if self == Self::FailFast => return Err(e),
                Err(e) => warn!(seq, error = %e, "skipping message"),
            }
        }
        Ok(messages)
    }
}

/// Options for fetching the most recent messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOptions {
    /// How many of the newest messages to return.
    pub count: u32,
    /// Mailbox to read; ignored by POP3.
    pub mailbox: String,
    /// Failure policy; `None` uses the adapter's default.
    pub policy: Option<PartialResultPolicy>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            count: DEFAULT_FETCH_COUNT,
            mailbox: DEFAULT_MAILBOX.to_string(),
            policy: None,
        }
    }
}

impl FetchOptions {
    /// Creates default options: 10 messages from `INBOX`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the message count.
    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Sets the mailbox.
    #[must_use]
    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Overrides the failure policy.
    #[must_use]
    pub const fn with_policy(mut self, policy: PartialResultPolicy) -> Self {
        self.policy = Some(policy);
        self
    }
}

/// Options for waiting on new mail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorOptions {
    /// Stop once this many new messages have arrived.
    pub count: u32,
    /// Mailbox to watch.
    pub mailbox: String,
    /// Give up after this long and return what arrived.
    pub timeout: Duration,
    /// Interval between message-count checks.
    pub poll_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            count: 1,
            mailbox: DEFAULT_MAILBOX.to_string(),
            timeout: Duration::from_secs(5 * 60),
            poll_interval: Duration::from_secs(3),
        }
    }
}

impl MonitorOptions {
    /// Creates default options: one message on `INBOX`, five-minute timeout,
    /// three-second polling.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of messages to wait for.
    #[must_use]
    pub const fn with_count(mut self, count: u32) -> Self {
        self.count = count;
        self
    }

    /// Sets the mailbox.
    #[must_use]
    pub fn with_mailbox(mut self, mailbox: impl Into<String>) -> Self {
        self.mailbox = mailbox.into();
        self
    }

    /// Sets the overall timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the polling interval.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Equivalent fetch options, for protocols where monitoring is a
    /// single fetch.
    #[must_use]
    pub fn as_fetch(&self) -> FetchOptions {
        FetchOptions::new()
            .with_count(self.count)
            .with_mailbox(self.mailbox.clone())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::Error;
    use chrono::DateTime;

    fn results() -> Vec<(u32, Result<ParsedMessage>)> {
        vec![
            (1, Ok(ParsedMessage::new(DateTime::UNIX_EPOCH))),
            (
                2,
                Err(Error::Parse {
                    seq: 2,
                    reason: "empty".into(),
                }),
            ),
            (3, Ok(ParsedMessage::new(DateTime::UNIX_EPOCH))),
        ]
    }

    #[test]
    fn test_defaults() {
        let fetch = FetchOptions::default();
        assert_eq!(fetch.count, 10);
        assert_eq!(fetch.mailbox, "INBOX");
        assert!(fetch.policy.is_none());

        let monitor = MonitorOptions::default();
        assert_eq!(monitor.count, 1);
        assert_eq!(monitor.timeout, Duration::from_secs(300));
        assert_eq!(monitor.poll_interval, Duration::from_secs(3));
    }

    #[test]
    fn test_builders() {
        let fetch = FetchOptions::new()
            .with_count(3)
            .with_mailbox("Archive")
            .with_policy(PartialResultPolicy::FailFast);
        assert_eq!(fetch.count, 3);
        assert_eq!(fetch.mailbox, "Archive");
        assert_eq!(fetch.policy, Some(PartialResultPolicy::FailFast));

        let monitor = MonitorOptions::new().with_count(4).with_mailbox("Work");
        assert_eq!(monitor.as_fetch().count, 4);
        assert_eq!(monitor.as_fetch().mailbox, "Work");
    }

    #[test]
    fn test_fail_fast_stops_at_first_error() {
        let err = PartialResultPolicy::FailFast.collect(results()).unwrap_err();
        assert!(matches!(err, Error::Parse { seq: 2, .. }));
    }

    #[test]
    fn test_skip_and_continue_drops_failures() {
        let messages = PartialResultPolicy::SkipAndContinue
            .collect(results())
            .unwrap();
        assert_eq!(messages.len(), 2);
    }
}
