//! # Error Types
//!
//! Errors raised while constructing shared types.

use thiserror::Error;

/// Errors from identity and channel construction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeError {
    /// Identifier was empty or blank.
    #[error("Empty {kind} identifier")]
    EmptyIdentifier { kind: &'static str },

    /// The same peer was listed twice in one channel.
    #[error("Duplicate peer in channel {channel}: {peer}")]
    DuplicatePeer { channel: String, peer: String },
}
