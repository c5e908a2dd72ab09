pub mod clock;
pub mod commands;
pub mod engine;
pub mod error;
pub mod log;
pub mod message;
pub mod peer;
pub mod queue;
pub mod replies;

/// Identity of a peer process, between `1` and [`PEER_COUNT`].
pub type PeerId = u32;

/// Lamport clock value.
pub type Timestamp = u64;

/// Number of peers in the mesh.
pub const PEER_COUNT: usize = 3;

/// The peer that keeps the authoritative holder record and answers `check` queries.
pub const COORDINATOR: PeerId = 1;
