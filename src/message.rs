//! Module that contains all the different message types sent between peers.

use crate::{PeerId, Timestamp};
use serde::{Deserialize, Serialize};
use std::error::Error;

/// Struct that a freshly connected peer sends to identify itself on the new link.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Join(pub PeerId);

/// Enum that represents the protocol messages exchanged over established links.
///
/// One message per line on the wire, JSON encoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Message {
    /// Broadcast when a peer asks for the critical section.
    Request(Timestamp),
    /// Unicast answer to a `Request`, carrying the replier's clock.
    Reply(Timestamp),
    /// Broadcast when a peer releases the critical section or withdraws its request.
    Release(Timestamp),
    /// Broadcast notification that the sender entered the critical section.
    Enter,
    /// Unicast question to the coordinator about the current holder.
    Check,
    /// Unicast answer to a `Check`, naming the current holder if any.
    Status(Option<PeerId>),
}

impl Join {
    /// Function that returns the join handshake as a JSON formatted `String`.
    pub fn to_json_string(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses the join handshake from a JSON formatted `String`.
    pub fn from_json_string(token: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::from_str::<Self>(token)?)
    }
}

impl Message {
    /// Function that returns the message as a JSON formatted `String`.
    pub fn to_json_string(&self) -> Result<String, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::to_string(self)?)
    }

    /// Function that parses a message from a JSON formatted `String`.
    pub fn from_json_string(token: &str) -> Result<Self, Box<dyn Error + Send + Sync>> {
        Ok(serde_json::from_str::<Self>(token)?)
    }
}
