//! # Channel Membership
//!
//! A channel lists the peers that host its ledger. Each peer belongs to one
//! organization and advertises the roles it serves. Only peers with the
//! `event_source` role emit commit events.

use crate::entities::{ChannelName, MspId, PeerId};
use crate::errors::TypeError;
use serde::{Deserialize, Serialize};

/// Roles a peer serves on a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerRoles {
    pub endorsing_peer: bool,
    pub ledger_query: bool,
    pub event_source: bool,
}

impl Default for PeerRoles {
    fn default() -> Self {
        Self {
            endorsing_peer: true,
            ledger_query: true,
            event_source: true,
        }
    }
}

impl PeerRoles {
    /// A peer that endorses and answers queries but emits no events.
    pub fn without_events() -> Self {
        Self {
            event_source: false,
            ..Self::default()
        }
    }
}

/// A peer as listed in the channel configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeerInfo {
    pub id: PeerId,
    pub msp_id: MspId,
    #[serde(default)]
    pub roles: PeerRoles,
}

impl PeerInfo {
    pub fn new(id: PeerId, msp_id: MspId) -> Self {
        Self {
            id,
            msp_id,
            roles: PeerRoles::default(),
        }
    }

    pub fn with_roles(mut self, roles: PeerRoles) -> Self {
        self.roles = roles;
        self
    }
}

/// Peers hosting one channel, in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    name: ChannelName,
    peers: Vec<PeerInfo>,
}

impl ChannelConfig {
    /// Create an empty channel.
    pub fn new(name: ChannelName) -> Self {
        Self {
            name,
            peers: Vec::new(),
        }
    }

    /// Add a peer. Peer ids must be unique within the channel.
    pub fn add_peer(&mut self, peer: PeerInfo) -> Result<(), TypeError> {
        if self.peers.iter().any(|p| p.id == peer.id) {
            return Err(TypeError::DuplicatePeer {
                channel: self.name.to_string(),
                peer: peer.id.to_string(),
            });
        }
        self.peers.push(peer);
        Ok(())
    }

    /// Builder form of [`ChannelConfig::add_peer`].
    pub fn with_peer(mut self, peer: PeerInfo) -> Result<Self, TypeError> {
        self.add_peer(peer)?;
        Ok(self)
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    /// Every peer on the channel, regardless of role.
    pub fn peers(&self) -> &[PeerInfo] {
        &self.peers
    }

    /// Peers that emit commit events.
    pub fn event_source_peers(&self) -> impl Iterator<Item = &PeerInfo> {
        self.peers.iter().filter(|p| p.roles.event_source)
    }

    /// Event-emitting peers owned by one organization.
    pub fn event_source_peers_for_org<'a>(
        &'a self,
        msp_id: &'a MspId,
    ) -> impl Iterator<Item = &'a PeerInfo> + 'a {
        self.event_source_peers().filter(move |p| &p.msp_id == msp_id)
    }
}
