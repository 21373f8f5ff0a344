//! Ports module for commit event aggregation

pub mod inbound;
pub mod outbound;

pub use inbound::CommitEventApi;
pub use outbound::{
    ConnectionState, EventHubConnections, EventHubFactory, ListenerHandle, PeerEventSource,
    ScopeResolver, TxCommitEvent, TxListener, TxNotification,
};
