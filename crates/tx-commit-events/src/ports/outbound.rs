//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Connection establishment and peer topology live outside this crate. The
//! engine only sees:
//! - a `ScopeResolver` answering which peers may confirm a transaction
//! - an `EventHubFactory` handing out one `PeerEventSource` per reachable peer

use crate::domain::PeerSet;
use crate::error::{ConnectionError, EventSourceError};
use async_trait::async_trait;
use shared_types::{ChannelName, MspId, PeerId, TransactionId, ValidationCode};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Peer topology of one channel.
pub trait ScopeResolver: Send + Sync {
    /// Channel the peers belong to
    fn channel_name(&self) -> &ChannelName;

    /// Event-emitting peers owned by `msp_id`
    fn get_peers_for_organization(&self, msp_id: &MspId) -> Vec<PeerId>;

    /// Every event-emitting peer on the channel
    fn get_all_peers(&self) -> Vec<PeerId>;
}

/// A peer's report that a transaction was committed in a block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxCommitEvent {
    pub transaction_id: TransactionId,
    pub validation_code: ValidationCode,
    pub block_number: u64,
}

/// What an event source delivers to a transaction listener.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxNotification {
    Committed(TxCommitEvent),
    SourceError(EventSourceError),
}

/// Callback invoked by an event source. May be called from any thread.
pub type TxListener = Arc<dyn Fn(TxNotification) + Send + Sync>;

/// Registration token returned by `register_transaction_listener`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerHandle(Uuid);

impl ListenerHandle {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ListenerHandle {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ListenerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a peer connection.
///
/// ```text
/// Connecting ──→ Connected ──→ Disconnected
///                    │
///                    └───────→ Failed
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Connecting,
    Connected,
    Disconnected,
    Failed,
}

impl ConnectionState {
    /// Whether the source can still deliver events.
    pub fn is_usable(&self) -> bool {
        matches!(self, ConnectionState::Connecting | ConnectionState::Connected)
    }
}

/// One live event connection to one peer.
pub trait PeerEventSource: Send + Sync {
    fn peer_id(&self) -> &PeerId;

    fn connection_state(&self) -> ConnectionState;

    /// Deliver commit events for `transaction_id` (and source errors) to
    /// `listener` until unregistered.
    fn register_transaction_listener(
        &self,
        transaction_id: &TransactionId,
        listener: TxListener,
    ) -> ListenerHandle;

    /// Remove a listener. Returns false if it was not registered.
    fn unregister(&self, handle: ListenerHandle) -> bool;
}

/// Result of connecting event sources for a peer set.
///
/// Partial failure is normal: reachable peers are in `connected`, the rest
/// in `errors`.
#[derive(Default)]
pub struct EventHubConnections {
    pub connected: Vec<Arc<dyn PeerEventSource>>,
    pub errors: BTreeMap<PeerId, ConnectionError>,
}

impl fmt::Debug for EventHubConnections {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventHubConnections")
            .field(
                "connected",
                &self.connected.iter().map(|s| s.peer_id()).collect::<Vec<_>>(),
            )
            .field("errors", &self.errors)
            .finish()
    }
}

/// Connects event sources to peers.
#[async_trait]
pub trait EventHubFactory: Send + Sync {
    /// Attempt one connection per peer. A failing peer never aborts the
    /// others.
    async fn get_event_hubs(&self, peers: &PeerSet) -> EventHubConnections;
}
