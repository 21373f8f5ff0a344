//! Per-peer and aggregate transaction outcomes

use serde::{Deserialize, Serialize};
use shared_types::{PeerId, TransactionId, ValidationCode};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// What one peer reported for the transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TransactionOutcome {
    /// Committed with a `VALID` code
    Valid,
    /// Committed with any other validation code
    Invalid,
    /// Never connected, disconnected or errored
    Unavailable,
    /// No report yet
    #[default]
    Unknown,
}

impl TransactionOutcome {
    /// Whether this outcome is final for the peer.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TransactionOutcome::Unknown)
    }
}

impl From<&ValidationCode> for TransactionOutcome {
    fn from(code: &ValidationCode) -> Self {
        if code.is_valid() {
            TransactionOutcome::Valid
        } else {
            TransactionOutcome::Invalid
        }
    }
}

impl fmt::Display for TransactionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransactionOutcome::Valid => "valid",
            TransactionOutcome::Invalid => "invalid",
            TransactionOutcome::Unavailable => "unavailable",
            TransactionOutcome::Unknown => "unknown",
        };
        f.write_str(s)
    }
}

/// Terminal status of one handler.
///
/// `TimedOut` means no conclusive answer arrived in time; `Failed` means the
/// strategy decided the transaction did not reach the required confirmation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CommitStatus {
    Succeeded,
    Failed,
    TimedOut,
}

impl CommitStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CommitStatus::Succeeded)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CommitStatus::Succeeded => "succeeded",
            CommitStatus::Failed => "failed",
            CommitStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for CommitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final report delivered to the caller of `wait_for_outcome`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitOutcome {
    pub transaction_id: TransactionId,
    pub status: CommitStatus,
    /// One entry per peer in the resolved scope
    pub peer_outcomes: BTreeMap<PeerId, TransactionOutcome>,
    /// Raw validation codes for the peers that reported one
    pub peer_codes: BTreeMap<PeerId, ValidationCode>,
    /// Time from `start()` to finalization
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl CommitOutcome {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Peers whose outcome matches `outcome`.
    pub fn peers_with(&self, outcome: TransactionOutcome) -> Vec<&PeerId> {
        self.peer_outcomes
            .iter()
            .filter(|(_, o)| **o == outcome)
            .map(|(peer, _)| peer)
            .collect()
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        Ok(Duration::from_millis(u64::deserialize(d)?))
    }
}
