//! Replies collected for the local node's own outstanding request.

use crate::{PeerId, Timestamp};

/// The replies heard so far for the current outstanding request.
///
/// Cleared on every grant and on release/withdrawal. Replies that arrive when
/// no request is outstanding are recorded anyway; the admission check compares
/// reply timestamps against the current request's timestamp, so stale entries
/// can never satisfy it.
#[derive(Debug, Default)]
pub struct ReplySet(Vec<(Timestamp, PeerId)>);

impl ReplySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, timestamp: Timestamp, from: PeerId) {
        self.0.push((timestamp, from));
    }

    pub fn count(&self) -> usize {
        self.0.len()
    }

    /// True iff every recorded reply timestamp is strictly greater than `t`.
    pub fn all_newer_than(&self, t: Timestamp) -> bool {
        self.0.iter().all(|(timestamp, _)| *timestamp > t)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    /// Snapshot in arrival order, for the `view replies` command.
    pub fn snapshot(&self) -> Vec<(Timestamp, PeerId)> {
        self.0.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_in_arrival_order() {
        let mut replies = ReplySet::new();
        replies.record(4, 2);
        replies.record(3, 3);
        assert_eq!(replies.count(), 2);
        assert_eq!(replies.snapshot(), vec![(4, 2), (3, 3)]);
    }

    #[test]
    fn all_newer_than_is_strict() {
        let mut replies = ReplySet::new();
        replies.record(4, 2);
        replies.record(6, 3);
        assert!(replies.all_newer_than(3));
        assert!(!replies.all_newer_than(4));
    }

    #[test]
    fn empty_set_is_vacuously_newer() {
        let replies = ReplySet::new();
        assert!(replies.all_newer_than(100));
        assert_eq!(replies.count(), 0);
    }

    #[test]
    fn clear_empties_the_set() {
        let mut replies = ReplySet::new();
        replies.record(1, 2);
        replies.clear();
        assert_eq!(replies.count(), 0);
    }
}
