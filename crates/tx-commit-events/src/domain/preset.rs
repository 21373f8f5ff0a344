//! Named event strategy presets
//!
//! Each preset is a fixed (scope, strategy kind) pair. The set is closed:
//! selecting by name goes through `FromStr`, and every consumer matches
//! exhaustively on the enum.

use crate::domain::scope::EventScope;
use crate::domain::strategy::StrategyKind;
use crate::error::CommitEventError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventStrategy {
    /// Every peer of the client's organization must commit the transaction
    #[default]
    #[serde(rename = "MSPID_SCOPE_ALLFORTX")]
    MspidScopeAllForTx,
    /// Any peer of the client's organization committing is enough
    #[serde(rename = "MSPID_SCOPE_ANYFORTX")]
    MspidScopeAnyForTx,
    /// Every event-emitting peer on the channel must commit
    #[serde(rename = "NETWORK_SCOPE_ALLFORTX")]
    NetworkScopeAllForTx,
    /// Any event-emitting peer on the channel committing is enough
    #[serde(rename = "NETWORK_SCOPE_ANYFORTX")]
    NetworkScopeAnyForTx,
}

impl EventStrategy {
    pub const ALL: [EventStrategy; 4] = [
        EventStrategy::MspidScopeAllForTx,
        EventStrategy::MspidScopeAnyForTx,
        EventStrategy::NetworkScopeAllForTx,
        EventStrategy::NetworkScopeAnyForTx,
    ];

    pub fn scope(&self) -> EventScope {
        match self {
            EventStrategy::MspidScopeAllForTx | EventStrategy::MspidScopeAnyForTx => {
                EventScope::PerOrganization
            }
            EventStrategy::NetworkScopeAllForTx | EventStrategy::NetworkScopeAnyForTx => {
                EventScope::WholeNetwork
            }
        }
    }

    pub fn kind(&self) -> StrategyKind {
        match self {
            EventStrategy::MspidScopeAllForTx | EventStrategy::NetworkScopeAllForTx => {
                StrategyKind::AllOf
            }
            EventStrategy::MspidScopeAnyForTx | EventStrategy::NetworkScopeAnyForTx => {
                StrategyKind::AnyOf
            }
        }
    }

    /// Preset for an explicit (scope, kind) pair.
    pub fn from_parts(scope: EventScope, kind: StrategyKind) -> Self {
        match (scope, kind) {
            (EventScope::PerOrganization, StrategyKind::AllOf) => EventStrategy::MspidScopeAllForTx,
            (EventScope::PerOrganization, StrategyKind::AnyOf) => EventStrategy::MspidScopeAnyForTx,
            (EventScope::WholeNetwork, StrategyKind::AllOf) => EventStrategy::NetworkScopeAllForTx,
            (EventScope::WholeNetwork, StrategyKind::AnyOf) => EventStrategy::NetworkScopeAnyForTx,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EventStrategy::MspidScopeAllForTx => "MSPID_SCOPE_ALLFORTX",
            EventStrategy::MspidScopeAnyForTx => "MSPID_SCOPE_ANYFORTX",
            EventStrategy::NetworkScopeAllForTx => "NETWORK_SCOPE_ALLFORTX",
            EventStrategy::NetworkScopeAnyForTx => "NETWORK_SCOPE_ANYFORTX",
        }
    }
}

impl fmt::Display for EventStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EventStrategy {
    type Err = CommitEventError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventStrategy::ALL
            .into_iter()
            .find(|preset| preset.name() == s)
            .ok_or_else(|| CommitEventError::UnknownStrategy {
                name: s.to_string(),
            })
    }
}
