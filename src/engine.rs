//! The mutual-exclusion engine.
//!
//! One instance per process owns the clock, the pending-request queue, the
//! reply set and the coordinator's holder record. Every peer receive task and
//! the command loop funnel into it behind a single lock; its methods are
//! synchronous and all sends are fire-and-forget channel pushes, so no method
//! ever blocks while the lock is held.

use crate::{
    clock::LamportClock,
    error::ProtocolError,
    log,
    message::Message,
    queue::{Request, RequestQueue},
    replies::ReplySet,
    PeerId, Timestamp, COORDINATOR, PEER_COUNT,
};
use color_print::cformat;
use std::collections::HashMap;
use tokio::sync::{mpsc::UnboundedSender, oneshot};

/// Where this node stands with respect to its own critical-section ambition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionState {
    Idle,
    Requesting,
    Holding,
}

/// Answer to [`Engine::query_holder`].
///
/// The coordinator answers from its own record; everyone else gets a receiver
/// that resolves once the coordinator's `status` message arrives.
pub enum HolderQuery {
    Local(Option<PeerId>),
    Remote(oneshot::Receiver<Option<PeerId>>),
}

/// Function that renders the holder answer the way the coordinator words it.
pub fn holder_notice(holder: Option<PeerId>) -> String {
    match holder {
        Some(peer) => cformat!("<magenta>Critical section is held by system <bold>{peer}</bold>.</magenta>"),
        None => cformat!("<green>Critical section is not held by anyone.</green>"),
    }
}

pub struct Engine {
    id: PeerId,
    clock: LamportClock,
    requests: RequestQueue,
    replies: ReplySet,
    /// Timestamp of this node's own outstanding request; `None` is the
    /// +infinity sentinel that can never win the ordering comparison.
    own_request: Option<Timestamp>,
    state: SectionState,
    /// Holder of record. Only meaningful at the coordinator.
    holder: Option<PeerId>,
    links: HashMap<PeerId, UnboundedSender<Message>>,
    status_waiter: Option<oneshot::Sender<Option<PeerId>>>,
}

impl Engine {
    pub fn new(id: PeerId) -> Self {
        Self {
            id,
            clock: LamportClock::new(),
            requests: RequestQueue::new(),
            replies: ReplySet::new(),
            own_request: None,
            state: SectionState::Idle,
            holder: None,
            links: HashMap::new(),
            status_waiter: None,
        }
    }

    /// Registers the outbound channel for one peer link.
    pub fn register_link(&mut self, peer: PeerId, link: UnboundedSender<Message>) {
        self.links.insert(peer, link);
    }

    pub fn state(&self) -> SectionState {
        self.state
    }

    pub fn pending_requests(&self) -> Vec<Request> {
        self.requests.snapshot()
    }

    pub fn recorded_replies(&self) -> Vec<(Timestamp, PeerId)> {
        self.replies.snapshot()
    }

    /// Advances the clock for an internal event; no message, no state change.
    pub fn local_event(&mut self) -> Timestamp {
        self.clock.tick()
    }

    /// Asks for the critical section: broadcast a timestamped request and
    /// start collecting replies.
    pub fn request_access(&mut self) -> Result<Timestamp, ProtocolError> {
        if self.own_request.is_some() {
            return Err(ProtocolError::AlreadyActive);
        }
        let timestamp = self.clock.tick();
        self.requests.insert(Request { timestamp, peer: self.id })?;
        self.own_request = Some(timestamp);
        self.state = SectionState::Requesting;
        self.replies.clear();
        self.broadcast(Message::Request(timestamp));
        self.try_enter();
        Ok(timestamp)
    }

    /// Releases the critical section, or withdraws the outstanding request if
    /// it was never granted. Returns the release timestamp and whether the
    /// section was actually held.
    pub fn release_access(&mut self) -> Result<(Timestamp, bool), ProtocolError> {
        if self.own_request.is_none() {
            return Err(ProtocolError::NotActive);
        }
        let timestamp = self.clock.tick();
        self.broadcast(Message::Release(timestamp));
        self.requests.remove(self.id)?;
        self.own_request = None;
        let was_holding = self.state == SectionState::Holding;
        if self.id == COORDINATOR && self.holder == Some(self.id) {
            self.holder = None;
        }
        self.state = SectionState::Idle;
        self.replies.clear();
        Ok((timestamp, was_holding))
    }

    /// Asks who currently holds the critical section.
    pub fn query_holder(&mut self) -> HolderQuery {
        if self.id == COORDINATOR {
            return HolderQuery::Local(self.holder);
        }
        let (sender, receiver) = oneshot::channel();
        self.status_waiter = Some(sender);
        self.send_to(COORDINATOR, Message::Check);
        HolderQuery::Remote(receiver)
    }

    /// Applies one complete inbound message from `from`.
    pub fn handle_message(&mut self, from: PeerId, message: Message) {
        match message {
            Message::Request(timestamp) => {
                let now = self.clock.observe(timestamp);
                log::info(&cformat!(
                    "<cyan>Critical section access request from system <bold>{from}</bold>.</cyan>"
                ));
                if let Err(e) = self.requests.insert(Request { timestamp, peer: from }) {
                    log::error(&format!("{e}"));
                }
                // a node always replies immediately, even while requesting or
                // holding; ordering makes that safe
                self.send_to(from, Message::Reply(now));
                self.try_enter();
                self.report_clock();
            }
            Message::Reply(timestamp) => {
                self.clock.observe(timestamp);
                log::info(&cformat!(
                    "<magenta>Critical section access reply from system <bold>{from}</bold>.</magenta>"
                ));
                self.replies.record(timestamp, from);
                self.try_enter();
                self.report_clock();
            }
            Message::Release(timestamp) => {
                self.clock.observe(timestamp);
                let was_oldest = self.requests.oldest().map(|r| r.peer) == Some(from);
                match self.requests.remove(from) {
                    Ok(()) if was_oldest => log::info(&cformat!(
                        "<green>Critical section access release from system <bold>{from}</bold>.</green>"
                    )),
                    Ok(()) => log::info(&cformat!(
                        "<green>Critical section request withdrawn from system <bold>{from}</bold>.</green>"
                    )),
                    // benign race: the entry was already gone
                    Err(e) => log::debug(&format!("{e}")),
                }
                if self.id == COORDINATOR && self.holder == Some(from) {
                    self.holder = None;
                }
                self.try_enter();
                self.report_clock();
            }
            Message::Enter => {
                if self.id == COORDINATOR {
                    self.holder = Some(from);
                }
                log::info(&cformat!(
                    "<magenta>System <bold>{from}</bold> entered the critical section.</magenta>"
                ));
            }
            Message::Check => {
                if self.id == COORDINATOR {
                    self.send_to(from, Message::Status(self.holder));
                }
            }
            Message::Status(holder) => match self.status_waiter.take() {
                Some(waiter) => {
                    let _ = waiter.send(holder);
                }
                None => log::info(&holder_notice(holder)),
            },
        }
    }

    /// The admission check: enter the critical section iff our own request is
    /// the globally oldest, every other peer has replied, and every reply's
    /// clock was already past our request timestamp.
    fn try_enter(&mut self) {
        if self.state != SectionState::Requesting {
            return;
        }
        let Some(own_timestamp) = self.own_request else {
            return;
        };
        if self.requests.oldest().map(|r| r.peer) != Some(self.id) {
            return;
        }
        if self.replies.count() < PEER_COUNT - 1 {
            return;
        }
        if !self.replies.all_newer_than(own_timestamp) {
            return;
        }
        self.replies.clear();
        self.state = SectionState::Holding;
        self.broadcast(Message::Enter);
        if self.id == COORDINATOR {
            self.holder = Some(self.id);
        }
        log::info(&cformat!(
            "<green>System <bold>{}</bold> (you) entered the critical section.</green>",
            self.id
        ));
    }

    fn send_to(&self, peer: PeerId, message: Message) {
        match self.links.get(&peer) {
            Some(link) => {
                if link.send(message).is_err() {
                    log::error(&cformat!("Lost the link to system <bold>{peer}</bold>."));
                }
            }
            None => log::error(&cformat!("No link registered for system <bold>{peer}</bold>.")),
        }
    }

    fn broadcast(&self, message: Message) {
        for (peer, link) in &self.links {
            if link.send(message.clone()).is_err() {
                log::error(&cformat!("Lost the link to system <bold>{peer}</bold>."));
            }
        }
    }

    fn report_clock(&self) {
        log::info(&cformat!(
            "<yellow>Your current local timestamp is <bold>{}</bold>.</yellow>",
            self.clock.now()
        ));
    }
}
