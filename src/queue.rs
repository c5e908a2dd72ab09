//! Pending critical-section requests, ordered across all peers.

use crate::{error::ProtocolError, PeerId, Timestamp};
use std::collections::{BTreeSet, HashMap};

/// A critical-section request known to this node.
///
/// Requests are totally ordered by `(timestamp, peer)`; the peer id breaks
/// timestamp ties, so every node ranks the same set of requests identically
/// without communicating. The derived `Ord` relies on the field order here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Request {
    pub timestamp: Timestamp,
    pub peer: PeerId,
}

/// Set of all outstanding requests, local and remote, at most one per peer.
#[derive(Debug, Default)]
pub struct RequestQueue {
    ordered: BTreeSet<Request>,
    by_peer: HashMap<PeerId, Timestamp>,
}

impl RequestQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a request. A peer may only have one outstanding request at a time.
    pub fn insert(&mut self, request: Request) -> Result<(), ProtocolError> {
        if self.by_peer.contains_key(&request.peer) {
            return Err(ProtocolError::AlreadyActive);
        }
        self.by_peer.insert(request.peer, request.timestamp);
        self.ordered.insert(request);
        Ok(())
    }

    /// Removes a peer's request, if it has one.
    pub fn remove(&mut self, peer: PeerId) -> Result<(), ProtocolError> {
        match self.by_peer.remove(&peer) {
            Some(timestamp) => {
                self.ordered.remove(&Request { timestamp, peer });
                Ok(())
            }
            None => Err(ProtocolError::UnknownPeer(peer)),
        }
    }

    /// The globally oldest request, if any.
    pub fn oldest(&self) -> Option<Request> {
        self.ordered.first().copied()
    }

    pub fn contains(&self, peer: PeerId) -> bool {
        self.by_peer.contains_key(&peer)
    }

    /// Snapshot of the queue in order, for the `view requests` command.
    pub fn snapshot(&self) -> Vec<Request> {
        self.ordered.iter().copied().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oldest_is_the_smallest_timestamp() {
        let mut queue = RequestQueue::new();
        queue.insert(Request { timestamp: 7, peer: 2 }).unwrap();
        queue.insert(Request { timestamp: 3, peer: 3 }).unwrap();
        assert_eq!(queue.oldest(), Some(Request { timestamp: 3, peer: 3 }));
    }

    #[test]
    fn equal_timestamps_break_ties_on_the_lower_peer() {
        let mut queue = RequestQueue::new();
        queue.insert(Request { timestamp: 5, peer: 3 }).unwrap();
        queue.insert(Request { timestamp: 5, peer: 1 }).unwrap();
        assert_eq!(queue.oldest(), Some(Request { timestamp: 5, peer: 1 }));
    }

    #[test]
    fn a_peer_may_only_have_one_request() {
        let mut queue = RequestQueue::new();
        queue.insert(Request { timestamp: 1, peer: 2 }).unwrap();
        assert_eq!(
            queue.insert(Request { timestamp: 4, peer: 2 }),
            Err(ProtocolError::AlreadyActive)
        );
        assert_eq!(queue.oldest(), Some(Request { timestamp: 1, peer: 2 }));
    }

    #[test]
    fn removing_an_absent_peer_is_reported() {
        let mut queue = RequestQueue::new();
        assert_eq!(queue.remove(2), Err(ProtocolError::UnknownPeer(2)));
    }

    #[test]
    fn remove_clears_both_indexes() {
        let mut queue = RequestQueue::new();
        queue.insert(Request { timestamp: 2, peer: 1 }).unwrap();
        queue.remove(1).unwrap();
        assert!(!queue.contains(1));
        assert_eq!(queue.oldest(), None);
        queue.insert(Request { timestamp: 9, peer: 1 }).unwrap();
        assert_eq!(queue.oldest(), Some(Request { timestamp: 9, peer: 1 }));
    }
}
