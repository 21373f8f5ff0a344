//! Channel Scope Resolver Adapter
//!
//! Implements `ScopeResolver` over a static `ChannelConfig`. Only peers with
//! the event-source role are returned.

use crate::ports::outbound::ScopeResolver;
use shared_types::{ChannelConfig, ChannelName, MspId, PeerId};

pub struct ChannelScopeResolver {
    channel: ChannelConfig,
}

impl ChannelScopeResolver {
    pub fn new(channel: ChannelConfig) -> Self {
        Self { channel }
    }

    pub fn channel(&self) -> &ChannelConfig {
        &self.channel
    }
}

impl ScopeResolver for ChannelScopeResolver {
    fn channel_name(&self) -> &ChannelName {
        self.channel.name()
    }

    fn get_peers_for_organization(&self, msp_id: &MspId) -> Vec<PeerId> {
        self.channel
            .event_source_peers_for_org(msp_id)
            .map(|p| p.id.clone())
            .collect()
    }

    fn get_all_peers(&self) -> Vec<PeerId> {
        self.channel
            .event_source_peers()
            .map(|p| p.id.clone())
            .collect()
    }
}
