//! Protocol error types.

use crate::PeerId;
use thiserror::Error;

/// Errors reported by the mutual-exclusion engine.
///
/// All of these are local and recoverable: they are surfaced to the caller
/// (the command loop logs them) and leave the engine state unchanged.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ProtocolError {
    /// A critical section request is already outstanding or held.
    #[error("a critical section request is already active")]
    AlreadyActive,

    /// No critical section request is outstanding or held.
    #[error("no critical section request is active")]
    NotActive,

    /// A message that could not be decoded; it is dropped without a state change.
    #[error("malformed message {0:?} dropped")]
    MalformedMessage(String),

    /// A release or withdrawal referenced a peer with no pending request.
    #[error("no pending request for system {0}")]
    UnknownPeer(PeerId),
}
