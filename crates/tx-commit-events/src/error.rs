//! Error types for the commit event engine

use crate::domain::scope::EventScope;
use shared_types::{PeerId, TypeError};
use thiserror::Error;

/// Setup and lifecycle errors surfaced to the submitting client.
///
/// Individual peer failures never appear here: they are folded into the
/// tally as `Unavailable` and only show up in the final outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitEventError {
    /// Scope resolved to no peers, or no event source could be connected
    #[error("No peers available for {scope} scope on channel {channel}")]
    NoPeersAvailable { scope: EventScope, channel: String },

    /// Options or identifiers failed validation
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// Strategy preset name did not match any known preset
    #[error("Unknown event strategy: {name}")]
    UnknownStrategy { name: String },

    /// `start()` was called twice
    #[error("Event handler already started")]
    AlreadyStarted,

    /// Outcome requested before `start()`
    #[error("Event handler not started")]
    NotStarted,

    /// Handler was cancelled before reaching an outcome
    #[error("Event handler cancelled before an outcome was reached")]
    HandlerCancelled,
}

impl From<TypeError> for CommitEventError {
    fn from(err: TypeError) -> Self {
        CommitEventError::InvalidConfig {
            reason: err.to_string(),
        }
    }
}

/// Failure to connect an event source for one peer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Connection to peer {peer} failed: {reason}")]
pub struct ConnectionError {
    pub peer: PeerId,
    pub reason: String,
}

/// Failure of an already-connected event source, delivered to listeners.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventSourceError {
    /// The peer closed the stream
    #[error("Event source for peer {peer} disconnected")]
    Disconnected { peer: PeerId },

    /// The stream failed with a transport or protocol error
    #[error("Event source for peer {peer} failed: {reason}")]
    Failed { peer: PeerId, reason: String },
}

impl EventSourceError {
    pub fn peer(&self) -> &PeerId {
        match self {
            EventSourceError::Disconnected { peer } | EventSourceError::Failed { peer, .. } => peer,
        }
    }
}

/// Result type for commit event operations
pub type CommitResult<T> = Result<T, CommitEventError>;
