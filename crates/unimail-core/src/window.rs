//! Fetch-window arithmetic.

use unimail_imap::SequenceRange;

/// Returns the sequence range holding the newest `count` of `total`
/// messages: `max(1, total - count + 1) ..= total`.
///
/// Returns `None` when the mailbox is empty or `count` is zero.
#[must_use]
pub fn fetch_window(total: u32, count: u32) -> Option<SequenceRange> {
    if total == 0 || count == 0 {
        return None;
    }
    let start = total.saturating_sub(count).saturating_add(1);
    SequenceRange::new(start, total)
}
