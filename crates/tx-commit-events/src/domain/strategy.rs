//! Quorum strategies over per-peer outcomes
//!
//! A strategy is a pure policy object. It is fed one outcome per peer and
//! answers `Pending`, `Succeeded` or `Failed`.
//!
//! ```text
//! AllOf:  Succeeded  <=  every peer Valid
//!         Failed     <=  any peer Invalid or Unavailable (all-Valid unreachable)
//!
//! AnyOf:  Succeeded  <=  first peer Valid
//!         Failed     <=  every peer Invalid or Unavailable, none Valid
//! ```
//!
//! INVARIANT: decisions are monotonic. Once `Succeeded` or `Failed`, further
//! input is ignored.
//! INVARIANT: each peer contributes at most one terminal outcome.

use crate::domain::outcome::TransactionOutcome;
use crate::domain::scope::PeerSet;
use serde::{Deserialize, Serialize};
use shared_types::PeerId;
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Quorum rule applied to the peer set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StrategyKind {
    /// Every peer must report `Valid`
    AllOf,
    /// One `Valid` report is enough
    AnyOf,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StrategyKind::AllOf => f.write_str("all-of"),
            StrategyKind::AnyOf => f.write_str("any-of"),
        }
    }
}

/// Strategy verdict.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Decision {
    #[default]
    Pending,
    Succeeded,
    Failed,
}

impl Decision {
    pub fn is_final(&self) -> bool {
        !matches!(self, Decision::Pending)
    }
}

/// Per-peer tally with running counts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StrategyState {
    outcomes: BTreeMap<PeerId, TransactionOutcome>,
    valid: usize,
    invalid: usize,
    unavailable: usize,
}

impl StrategyState {
    fn new(peers: &PeerSet) -> Self {
        Self {
            outcomes: peers
                .iter()
                .map(|peer| (peer.clone(), TransactionOutcome::Unknown))
                .collect(),
            valid: 0,
            invalid: 0,
            unavailable: 0,
        }
    }

    /// Record a terminal outcome. Returns false when the input was ignored.
    fn record(&mut self, peer: &PeerId, outcome: TransactionOutcome) -> bool {
        if !outcome.is_terminal() {
            return false;
        }
        let Some(slot) = self.outcomes.get_mut(peer) else {
            return false;
        };
        if slot.is_terminal() {
            return false;
        }

        *slot = outcome;
        match outcome {
            TransactionOutcome::Valid => self.valid += 1,
            TransactionOutcome::Invalid => self.invalid += 1,
            TransactionOutcome::Unavailable => self.unavailable += 1,
            TransactionOutcome::Unknown => {}
        }
        true
    }

    pub fn peer_count(&self) -> usize {
        self.outcomes.len()
    }

    pub fn valid(&self) -> usize {
        self.valid
    }

    pub fn invalid(&self) -> usize {
        self.invalid
    }

    pub fn unavailable(&self) -> usize {
        self.unavailable
    }

    /// Peers still `Unknown`.
    pub fn pending(&self) -> usize {
        self.peer_count() - self.valid - self.invalid - self.unavailable
    }

    pub fn outcomes(&self) -> &BTreeMap<PeerId, TransactionOutcome> {
        &self.outcomes
    }
}

/// A quorum strategy bound to one frozen peer set.
#[derive(Clone, Debug)]
pub struct CommitStrategy {
    kind: StrategyKind,
    state: StrategyState,
    decision: Decision,
}

impl CommitStrategy {
    /// Create a strategy over `peers`. `PeerSet` is never empty, so N >= 1.
    pub fn new(kind: StrategyKind, peers: &PeerSet) -> Self {
        Self {
            kind,
            state: StrategyState::new(peers),
            decision: Decision::Pending,
        }
    }

    pub fn kind(&self) -> StrategyKind {
        self.kind
    }

    pub fn decision(&self) -> Decision {
        self.decision
    }

    pub fn state(&self) -> &StrategyState {
        &self.state
    }

    pub fn outcomes(&self) -> &BTreeMap<PeerId, TransactionOutcome> {
        self.state.outcomes()
    }

    /// Record the outcome a peer reported and re-evaluate.
    ///
    /// Ignored for peers outside the set, peers that already reported, and
    /// once a decision has been reached.
    pub fn event_received(&mut self, peer: &PeerId, outcome: TransactionOutcome) -> Decision {
        if self.decision.is_final() {
            return self.decision;
        }
        if !self.state.record(peer, outcome) {
            debug!(peer = %peer, %outcome, "Ignoring repeated or foreign peer outcome");
            return self.decision;
        }
        self.decision = self.evaluate();
        self.decision
    }

    /// Mark the peer `Unavailable` for the rest of this transaction.
    pub fn error_received(&mut self, peer: &PeerId) -> Decision {
        self.event_received(peer, TransactionOutcome::Unavailable)
    }

    fn evaluate(&self) -> Decision {
        let s = &self.state;
        let n = s.peer_count();
        match self.kind {
            StrategyKind::AllOf => {
                if s.invalid > 0 || s.unavailable > 0 {
                    Decision::Failed
                } else if s.valid == n {
                    Decision::Succeeded
                } else {
                    Decision::Pending
                }
            }
            StrategyKind::AnyOf => {
                if s.valid > 0 {
                    Decision::Succeeded
                } else if s.invalid + s.unavailable == n {
                    Decision::Failed
                } else {
                    Decision::Pending
                }
            }
        }
    }
}
