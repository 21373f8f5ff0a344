//! In-Memory Event Hub Adapter
//!
//! `InMemoryEventHub` is a `PeerEventSource` driven by the caller: commit
//! events and connection failures are injected directly. The factory keeps
//! one hub per peer and reuses it across transactions.
//!
//! Used by the simulator and by tests; a networked implementation plugs in
//! behind the same ports.

use crate::domain::PeerSet;
use crate::error::{ConnectionError, EventSourceError};
use crate::ports::outbound::{
    ConnectionState, EventHubConnections, EventHubFactory, ListenerHandle, PeerEventSource,
    TxCommitEvent, TxListener, TxNotification,
};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{PeerId, TransactionId, ValidationCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

struct Registration {
    transaction_id: TransactionId,
    listener: TxListener,
}

/// Event source for one peer, fed by the caller.
pub struct InMemoryEventHub {
    peer_id: PeerId,
    state: RwLock<ConnectionState>,
    listeners: RwLock<HashMap<ListenerHandle, Registration>>,
}

impl InMemoryEventHub {
    /// A hub that is already connected.
    pub fn new(peer_id: PeerId) -> Self {
        Self::with_state(peer_id, ConnectionState::Connected)
    }

    pub fn with_state(peer_id: PeerId, state: ConnectionState) -> Self {
        Self {
            peer_id,
            state: RwLock::new(state),
            listeners: RwLock::new(HashMap::new()),
        }
    }

    /// Finish a pending connection.
    pub fn set_connected(&self) {
        *self.state.write() = ConnectionState::Connected;
    }

    /// Deliver a commit event to every listener registered for its
    /// transaction. Returns how many listeners were notified.
    pub fn emit(&self, event: TxCommitEvent) -> usize {
        let targets: Vec<TxListener> = self
            .listeners
            .read()
            .values()
            .filter(|r| r.transaction_id == event.transaction_id)
            .map(|r| r.listener.clone())
            .collect();

        for listener in &targets {
            listener(TxNotification::Committed(event.clone()));
        }
        targets.len()
    }

    /// Shorthand for [`InMemoryEventHub::emit`].
    pub fn commit(
        &self,
        transaction_id: &TransactionId,
        validation_code: ValidationCode,
        block_number: u64,
    ) -> usize {
        self.emit(TxCommitEvent {
            transaction_id: transaction_id.clone(),
            validation_code,
            block_number,
        })
    }

    /// Close the stream and notify every listener.
    pub fn disconnect(&self) {
        *self.state.write() = ConnectionState::Disconnected;
        self.broadcast_error(EventSourceError::Disconnected {
            peer: self.peer_id.clone(),
        });
    }

    /// Fail the stream and notify every listener.
    pub fn fail(&self, reason: impl Into<String>) {
        *self.state.write() = ConnectionState::Failed;
        self.broadcast_error(EventSourceError::Failed {
            peer: self.peer_id.clone(),
            reason: reason.into(),
        });
    }

    /// Bring the stream back. Listeners already told about the failure are
    /// not notified again.
    pub fn reconnect(&self) {
        *self.state.write() = ConnectionState::Connected;
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.read().len()
    }

    fn broadcast_error(&self, err: EventSourceError) {
        let targets: Vec<TxListener> = self
            .listeners
            .read()
            .values()
            .map(|r| r.listener.clone())
            .collect();
        debug!(peer = %self.peer_id, listeners = targets.len(), error = %err, "Event hub down");
        for listener in targets {
            listener(TxNotification::SourceError(err.clone()));
        }
    }

    fn current_error(&self) -> Option<EventSourceError> {
        match *self.state.read() {
            ConnectionState::Disconnected => Some(EventSourceError::Disconnected {
                peer: self.peer_id.clone(),
            }),
            ConnectionState::Failed => Some(EventSourceError::Failed {
                peer: self.peer_id.clone(),
                reason: "event hub failed".to_string(),
            }),
            ConnectionState::Connecting | ConnectionState::Connected => None,
        }
    }
}

impl PeerEventSource for InMemoryEventHub {
    fn peer_id(&self) -> &PeerId {
        &self.peer_id
    }

    fn connection_state(&self) -> ConnectionState {
        *self.state.read()
    }

    fn register_transaction_listener(
        &self,
        transaction_id: &TransactionId,
        listener: TxListener,
    ) -> ListenerHandle {
        let handle = ListenerHandle::new();
        self.listeners.write().insert(
            handle,
            Registration {
                transaction_id: transaction_id.clone(),
                listener: listener.clone(),
            },
        );

        // A source that went down before registration still owes the
        // listener an error.
        if let Some(err) = self.current_error() {
            listener(TxNotification::SourceError(err));
        }
        handle
    }

    fn unregister(&self, handle: ListenerHandle) -> bool {
        self.listeners.write().remove(&handle).is_some()
    }
}

/// Hands out one `InMemoryEventHub` per peer, reused across transactions.
#[derive(Default)]
pub struct InMemoryEventHubFactory {
    hubs: RwLock<HashMap<PeerId, Arc<InMemoryEventHub>>>,
    unreachable: RwLock<HashMap<PeerId, String>>,
}

impl InMemoryEventHubFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hub for `peer_id`, created on first use.
    pub fn hub(&self, peer_id: &PeerId) -> Arc<InMemoryEventHub> {
        if let Some(hub) = self.hubs.read().get(peer_id) {
            return hub.clone();
        }
        self.hubs
            .write()
            .entry(peer_id.clone())
            .or_insert_with(|| Arc::new(InMemoryEventHub::new(peer_id.clone())))
            .clone()
    }

    /// Make connection attempts to `peer_id` fail with `reason`.
    pub fn set_unreachable(&self, peer_id: &PeerId, reason: impl Into<String>) {
        self.unreachable
            .write()
            .insert(peer_id.clone(), reason.into());
    }

    pub fn set_reachable(&self, peer_id: &PeerId) {
        self.unreachable.write().remove(peer_id);
    }
}

#[async_trait]
impl EventHubFactory for InMemoryEventHubFactory {
    async fn get_event_hubs(&self, peers: &PeerSet) -> EventHubConnections {
        let mut connections = EventHubConnections::default();
        for peer in peers.iter() {
            if let Some(reason) = self.unreachable.read().get(peer) {
                connections.errors.insert(
                    peer.clone(),
                    ConnectionError {
                        peer: peer.clone(),
                        reason: reason.clone(),
                    },
                );
                continue;
            }
            connections.connected.push(self.hub(peer));
        }
        connections
    }
}
