//! Event scope and the frozen peer set
//!
//! The peer set is resolved once, when a handler is built, and never
//! recomputed while the transaction is being evaluated.

use crate::error::{CommitEventError, CommitResult};
use crate::ports::outbound::ScopeResolver;
use serde::{Deserialize, Serialize};
use shared_types::{ChannelName, MspId, PeerId};
use std::collections::BTreeSet;
use std::fmt;

/// Which peers are eligible to confirm a transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventScope {
    /// Only peers of the submitting client's organization
    PerOrganization,
    /// Every event-emitting peer on the channel
    WholeNetwork,
}

impl fmt::Display for EventScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventScope::PerOrganization => f.write_str("organization"),
            EventScope::WholeNetwork => f.write_str("network"),
        }
    }
}

/// Ordered, deduplicated, non-empty set of peers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PeerSet {
    channel: ChannelName,
    scope: EventScope,
    peers: Vec<PeerId>,
}

impl PeerSet {
    /// Resolve `scope` against the channel.
    ///
    /// An empty result is `NoPeersAvailable`, never an empty set.
    pub fn resolve(
        scope: EventScope,
        resolver: &dyn ScopeResolver,
        msp_id: &MspId,
    ) -> CommitResult<Self> {
        let peers = match scope {
            EventScope::PerOrganization => resolver.get_peers_for_organization(msp_id),
            EventScope::WholeNetwork => resolver.get_all_peers(),
        };
        let channel = resolver.channel_name().clone();
        Self::from_peers(channel.clone(), scope, peers).ok_or_else(|| {
            CommitEventError::NoPeersAvailable {
                scope,
                channel: channel.to_string(),
            }
        })
    }

    /// Build a set from arbitrary peers. `None` when `peers` is empty.
    pub fn from_peers(
        channel: ChannelName,
        scope: EventScope,
        peers: impl IntoIterator<Item = PeerId>,
    ) -> Option<Self> {
        let peers: Vec<PeerId> = peers.into_iter().collect::<BTreeSet<_>>().into_iter().collect();
        if peers.is_empty() {
            return None;
        }
        Some(Self {
            channel,
            scope,
            peers,
        })
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn scope(&self) -> EventScope {
        self.scope
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    /// Never true for a resolved set.
    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn contains(&self, peer: &PeerId) -> bool {
        self.peers.binary_search(peer).is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerId> {
        self.peers.iter()
    }

    pub fn as_slice(&self) -> &[PeerId] {
        &self.peers
    }
}
