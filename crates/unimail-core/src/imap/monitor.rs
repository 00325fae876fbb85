//! New-mail monitoring on an IMAP session.
//!
//! The session is moved into one spawned worker which owns it and the
//! accumulated messages for the whole run. The caller keeps only a
//! cancellation channel and the join handle; when the worker finishes it
//! hands the session back, idle stopped, together with what it collected.
//! Every session command races the cancellation signal, so a stalled
//! connection cannot hold the run past its timeout.

use std::future::Future;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{Instant, MissedTickBehavior, interval_at, timeout};
use tracing::{debug, info, warn};
use unimail_imap::SequenceRange;

use super::convert::parse_fetched;
use crate::model::ParsedMessage;
use crate::options::PartialResultPolicy;
use crate::session::ImapSession;
use crate::{Error, Result};

/// Parameters of one monitoring run.
#[derive(Debug, Clone)]
pub(crate) struct Plan {
    pub mailbox: String,
    /// Message count when the run started.
    pub baseline: u32,
    /// Stop once this many messages have been collected.
    pub target: usize,
    pub poll_interval: Duration,
    pub timeout: Duration,
}

/// Runs the worker until it reaches the target, IDLE cannot be re-entered,
/// or the timeout fires.
///
/// The session must already be idling on the watched mailbox. Returns the
/// session and the collected messages; a timeout is not an error. The
/// session is `None` when the timeout interrupted a command in flight, since
/// the connection is then in an unknown state.
///
/// # Errors
///
/// Returns [`Error::Monitor`] if the worker task panicked or was aborted;
/// the session is lost in that case.
pub(crate) async fn run<S: ImapSession>(
    session: S,
    plan: Plan,
) -> Result<(Option<S>, Vec<ParsedMessage>)> {
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let limit = plan.timeout;
    let mut handle = tokio::spawn(worker(session, plan, cancel_rx));

    let joined = match timeout(limit, &mut handle).await {
        Ok(joined) => joined,
        Err(_) => {
            debug!("monitor timeout reached, stopping worker");
            // The worker may already be gone; its result is still in the handle.
            let _ = cancel_tx.send(true);
            handle.await
        }
    };

    joined.map_err(|e| Error::Monitor(e.to_string()))
}

async fn worker<S: ImapSession>(
    mut session: S,
    plan: Plan,
    mut cancel: watch::Receiver<bool>,
) -> (Option<S>, Vec<ParsedMessage>) {
    let mut known = plan.baseline;
    let mut messages = Vec::new();
    let mut ticker = interval_at(Instant::now() + plan.poll_interval, plan.poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.changed() => break,
            _ = ticker.tick() => {}
        }

        // STATUS is not allowed while idling on the same connection.
        let Some(stopped) = until_cancelled(&mut cancel, session.idle_stop()).await else {
            return abandon(messages);
        };
        if let Err(e) = stopped {
            warn!(error = %e, "leaving idle for poll failed");
        }

        let Some(polled) = until_cancelled(&mut cancel, session.message_count(&plan.mailbox)).await
        else {
            return abandon(messages);
        };
        match polled {
            Ok(count) if count > known => {
                if let Some(range) = SequenceRange::new(known + 1, count) {
                    debug!(range = %range, "new messages");
                    let Some(fetched) = until_cancelled(&mut cancel, session.fetch(range)).await
                    else {
                        return abandon(messages);
                    };
                    collect_range(range, fetched, &mut messages);
                }
                known = count;
            }
            Ok(count) => known = count,
            Err(e) => warn!(error = %e, "message count poll failed"),
        }

        if messages.len() >= plan.target {
            info!(count = messages.len(), "monitor target reached");
            break;
        }

        let Some(idled) = until_cancelled(&mut cancel, session.idle_start()).await else {
            return abandon(messages);
        };
        if let Err(e) = idled {
            warn!(error = %e, "re-entering idle failed, ending monitor early");
            break;
        }
    }

    match timeout(plan.poll_interval, session.idle_stop()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => debug!(error = %e, "leaving idle after monitor"),
        Err(_) => return abandon(messages),
    }
    (Some(session), messages)
}

/// Awaits one session command unless the run is cancelled first.
async fn until_cancelled<T>(
    cancel: &mut watch::Receiver<bool>,
    command: impl Future<Output = T>,
) -> Option<T> {
    tokio::select! {
        biased;
        _ = cancel.changed() => None,
        out = command => Some(out),
    }
}

fn abandon<S>(messages: Vec<ParsedMessage>) -> (Option<S>, Vec<ParsedMessage>) {
    warn!(
        collected = messages.len(),
        "monitor stopped with a command in flight, dropping session"
    );
    (None, messages)
}

fn collect_range(
    range: SequenceRange,
    fetched: unimail_imap::Result<Vec<unimail_imap::FetchedMessage>>,
    messages: &mut Vec<ParsedMessage>,
) {
    match fetched {
        Ok(fetched) => {
            let parsed = fetched.into_iter().map(|f| (f.seq, parse_fetched(f)));
            if let Ok(new) = PartialResultPolicy::SkipAndContinue.collect(parsed) {
                messages.extend(new);
            }
        }
        Err(e) => warn!(range = %range, error = %e, "fetching new messages failed"),
    }
}
