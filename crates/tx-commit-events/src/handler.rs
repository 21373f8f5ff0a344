//! Transaction Event Handler - one per submitted transaction
//!
//! ## Lifecycle
//!
//! ```text
//! [Created] ──start()──→ [Started] ──strategy decision──→ [Succeeded | Failed]
//!     │                      │
//!     │                      ├──────commit timeout──────→ [TimedOut]
//!     │                      │
//!     └──────cancel()────────┴──────cancel()/drop────────→ [Cancelled]
//! ```
//!
//! ## Concurrency
//!
//! Event sources call listeners from their own threads. Listeners only
//! forward into a channel; a single tally task owns the strategy, the timer
//! and the finalize transition, so the tally is never mutated concurrently
//! and the handler finalizes exactly once.
//!
//! Once finalized, listeners drop further input and every remaining
//! registration is removed before the outcome is delivered.

use crate::config::{EventHandlerConfig, EventHandlerOptions};
use crate::domain::{
    CommitOutcome, CommitStatus, CommitStrategy, Decision, EventScope, PeerSet, StrategyKind,
    TransactionOutcome,
};
use crate::error::{CommitEventError, CommitResult};
use crate::metrics;
use crate::ports::outbound::{
    EventHubFactory, ListenerHandle, PeerEventSource, TxListener, TxNotification,
};
use parking_lot::Mutex;
use shared_types::{PeerId, TransactionId, ValidationCode};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Observable state of a handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandlerState {
    Created,
    Started,
    Succeeded,
    Failed,
    TimedOut,
    Cancelled,
}

impl HandlerState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, HandlerState::Created | HandlerState::Started)
    }
}

impl From<CommitStatus> for HandlerState {
    fn from(status: CommitStatus) -> Self {
        match status {
            CommitStatus::Succeeded => HandlerState::Succeeded,
            CommitStatus::Failed => HandlerState::Failed,
            CommitStatus::TimedOut => HandlerState::TimedOut,
        }
    }
}

/// Waits for a transaction to be committed by the peers in its scope.
pub struct TransactionEventHandler {
    config: EventHandlerConfig,
    peers: PeerSet,
    event_hub_factory: Arc<dyn EventHubFactory>,
    state: Arc<Mutex<HandlerState>>,
    outcome_rx: Option<oneshot::Receiver<CommitOutcome>>,
    cancel_tx: Option<oneshot::Sender<()>>,
    outcome: Option<CommitOutcome>,
}

impl TransactionEventHandler {
    /// Bind a transaction to a frozen peer set and a fresh strategy.
    pub fn new(
        config: EventHandlerConfig,
        peers: PeerSet,
        event_hub_factory: Arc<dyn EventHubFactory>,
    ) -> Self {
        debug!(
            tx_id = %config.transaction_id,
            strategy = %config.strategy,
            peers = peers.len(),
            "Created commit event handler"
        );
        Self {
            config,
            peers,
            event_hub_factory,
            state: Arc::new(Mutex::new(HandlerState::Created)),
            outcome_rx: None,
            cancel_tx: None,
            outcome: None,
        }
    }

    pub fn transaction_id(&self) -> &TransactionId {
        &self.config.transaction_id
    }

    pub fn options(&self) -> &EventHandlerOptions {
        &self.config.options
    }

    pub fn config(&self) -> &EventHandlerConfig {
        &self.config
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.config.strategy.kind()
    }

    pub fn scope(&self) -> EventScope {
        self.peers.scope()
    }

    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    pub fn state(&self) -> HandlerState {
        *self.state.lock()
    }

    /// Connect event sources, register listeners and arm the commit timer.
    ///
    /// Peers the factory could not connect start out `Unavailable`. Fails
    /// with `NoPeersAvailable`, registering nothing, when no source is usable.
    pub async fn start(&mut self) -> CommitResult<()> {
        match self.state() {
            HandlerState::Created => {}
            HandlerState::Cancelled => return Err(CommitEventError::HandlerCancelled),
            _ => return Err(CommitEventError::AlreadyStarted),
        }

        let started_at = Instant::now();
        let transaction_id = self.config.transaction_id.clone();
        let connections = self.event_hub_factory.get_event_hubs(&self.peers).await;

        let mut strategy = CommitStrategy::new(self.config.strategy.kind(), &self.peers);
        for (peer, err) in &connections.errors {
            warn!(tx_id = %transaction_id, peer = %peer, error = %err, "Event source unavailable");
            metrics::record_connection_error();
            strategy.error_received(peer);
        }

        let mut sources: BTreeMap<PeerId, Arc<dyn PeerEventSource>> = BTreeMap::new();
        for source in connections.connected {
            let peer = source.peer_id().clone();
            if !self.peers.contains(&peer) {
                debug!(tx_id = %transaction_id, peer = %peer, "Ignoring event source outside scope");
                continue;
            }
            // One source per peer; a peer the factory also reported as failed stays failed.
            if connections.errors.contains_key(&peer) || sources.contains_key(&peer) {
                debug!(tx_id = %transaction_id, peer = %peer, "Ignoring duplicate event source");
                continue;
            }
            if !source.connection_state().is_usable() {
                warn!(tx_id = %transaction_id, peer = %peer, "Event source already disconnected");
                strategy.error_received(&peer);
                continue;
            }
            sources.insert(peer, source);
        }

        if sources.is_empty() {
            warn!(tx_id = %transaction_id, "No event sources connected");
            return Err(CommitEventError::NoPeersAvailable {
                scope: self.peers.scope(),
                channel: self.peers.channel().to_string(),
            });
        }

        let (outcome_tx, outcome_rx) = oneshot::channel();
        let (cancel_tx, cancel_rx) = oneshot::channel();
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        let finalized = Arc::new(AtomicBool::new(false));

        let mut tally = EventTally {
            transaction_id: transaction_id.clone(),
            strategy,
            registrations: BTreeMap::new(),
            peer_codes: BTreeMap::new(),
            finalized: finalized.clone(),
            state: self.state.clone(),
            outcome_tx: Some(outcome_tx),
            started_at,
        };

        *self.state.lock() = HandlerState::Started;
        self.outcome_rx = Some(outcome_rx);
        self.cancel_tx = Some(cancel_tx);
        metrics::record_handler_started();

        // Connection failures alone may already decide the transaction.
        if let Some(status) = decision_status(tally.strategy.decision()) {
            tally.finalize(status);
            return Ok(());
        }

        for (peer, source) in sources {
            let listener = forwarding_listener(peer.clone(), signal_tx.clone(), finalized.clone());
            let handle = source.register_transaction_listener(&transaction_id, listener);
            tally.registrations.insert(peer, (source, handle));
        }

        info!(
            tx_id = %transaction_id,
            strategy = %self.config.strategy,
            listeners = tally.registrations.len(),
            timeout_ms = self.config.options.commit_timeout_ms(),
            "Listening for commit events"
        );

        let deadline = started_at + self.config.options.commit_timeout();
        tokio::spawn(tally.run(signal_tx, signal_rx, cancel_rx, deadline));
        Ok(())
    }

    /// Wait until the handler finalizes.
    ///
    /// Returns exactly one of `Succeeded`, `Failed` or `TimedOut` with the
    /// per-peer breakdown. Repeated calls return the same outcome.
    pub async fn wait_for_outcome(&mut self) -> CommitResult<CommitOutcome> {
        if let Some(outcome) = &self.outcome {
            return Ok(outcome.clone());
        }
        let state = self.state();
        let rx = self.outcome_rx.as_mut().ok_or_else(|| match state {
            HandlerState::Cancelled => CommitEventError::HandlerCancelled,
            _ => CommitEventError::NotStarted,
        })?;
        let outcome = rx.await.map_err(|_| CommitEventError::HandlerCancelled)?;

        self.outcome_rx = None;
        self.outcome = Some(outcome.clone());
        Ok(outcome)
    }

    /// Abandon the transaction: remove listeners and disarm the timer
    /// without producing an outcome. No-op once finalized.
    pub fn cancel(&mut self) {
        match self.cancel_tx.take() {
            Some(cancel_tx) => {
                let _ = cancel_tx.send(());
            }
            None => {
                let mut state = self.state.lock();
                if *state == HandlerState::Created {
                    *state = HandlerState::Cancelled;
                }
            }
        }
    }
}

impl std::fmt::Debug for TransactionEventHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionEventHandler")
            .field("config", &self.config)
            .field("peers", &self.peers)
            .field("state", &self.state())
            .finish()
    }
}

fn decision_status(decision: Decision) -> Option<CommitStatus> {
    match decision {
        Decision::Pending => None,
        Decision::Succeeded => Some(CommitStatus::Succeeded),
        Decision::Failed => Some(CommitStatus::Failed),
    }
}

/// Notification tagged with the peer whose listener received it.
struct PeerSignal {
    peer: PeerId,
    notification: TxNotification,
}

fn forwarding_listener(
    peer: PeerId,
    signals: mpsc::UnboundedSender<PeerSignal>,
    finalized: Arc<AtomicBool>,
) -> TxListener {
    Arc::new(move |notification| {
        if finalized.load(Ordering::Acquire) {
            return;
        }
        let _ = signals.send(PeerSignal {
            peer: peer.clone(),
            notification,
        });
    })
}

/// Sole owner of the strategy and the finalize transition.
struct EventTally {
    transaction_id: TransactionId,
    strategy: CommitStrategy,
    registrations: BTreeMap<PeerId, (Arc<dyn PeerEventSource>, ListenerHandle)>,
    peer_codes: BTreeMap<PeerId, ValidationCode>,
    finalized: Arc<AtomicBool>,
    state: Arc<Mutex<HandlerState>>,
    outcome_tx: Option<oneshot::Sender<CommitOutcome>>,
    started_at: Instant,
}

impl EventTally {
    async fn run(
        mut self,
        // Held so `recv` never yields `None` while listeners come and go.
        _keepalive: mpsc::UnboundedSender<PeerSignal>,
        mut signals: mpsc::UnboundedReceiver<PeerSignal>,
        mut cancel_rx: oneshot::Receiver<()>,
        deadline: Instant,
    ) {
        let mut timer = Box::pin(tokio::time::sleep_until(deadline));

        let status = loop {
            tokio::select! {
                biased;

                _ = &mut cancel_rx => {
                    drop(timer);
                    self.cancel();
                    return;
                }

                Some(signal) = signals.recv() => {
                    if let Some(status) = self.apply(signal) {
                        break status;
                    }
                }

                _ = &mut timer => break CommitStatus::TimedOut,
            }
        };

        drop(timer);
        self.finalize(status);
    }

    /// Feed one notification into the strategy.
    fn apply(&mut self, signal: PeerSignal) -> Option<CommitStatus> {
        let PeerSignal { peer, notification } = signal;
        let already_reported = self
            .strategy
            .outcomes()
            .get(&peer)
            .map_or(true, |o| o.is_terminal());

        let decision = match notification {
            TxNotification::Committed(event) => {
                if event.transaction_id != self.transaction_id {
                    debug!(
                        tx_id = %self.transaction_id,
                        peer = %peer,
                        other_tx = %event.transaction_id,
                        "Ignoring commit event for another transaction"
                    );
                    return None;
                }
                debug!(
                    tx_id = %self.transaction_id,
                    peer = %peer,
                    code = %event.validation_code,
                    block = event.block_number,
                    "Commit event received"
                );
                if !already_reported {
                    self.peer_codes
                        .insert(peer.clone(), event.validation_code.clone().normalized());
                }
                self.strategy
                    .event_received(&peer, TransactionOutcome::from(&event.validation_code))
            }
            TxNotification::SourceError(err) => {
                warn!(tx_id = %self.transaction_id, peer = %peer, error = %err, "Event source error");
                self.strategy.error_received(&peer)
            }
        };

        // A peer that reported has nothing more to say about this transaction.
        if !already_reported {
            self.unregister(&peer);
        }
        decision_status(decision)
    }

    fn unregister(&mut self, peer: &PeerId) {
        if let Some((source, handle)) = self.registrations.remove(peer) {
            source.unregister(handle);
        }
    }

    /// Close the listener gate and remove every remaining registration.
    fn teardown(&mut self) {
        self.finalized.store(true, Ordering::Release);
        let remaining = std::mem::take(&mut self.registrations);
        for (peer, (source, handle)) in remaining {
            if !source.unregister(handle) {
                debug!(tx_id = %self.transaction_id, peer = %peer, "Listener already removed");
            }
        }
    }

    fn cancel(&mut self) {
        self.teardown();
        self.outcome_tx = None;
        *self.state.lock() = HandlerState::Cancelled;
        info!(tx_id = %self.transaction_id, "Commit event handler cancelled");
    }

    /// Exactly-once transition into a terminal state.
    fn finalize(&mut self, status: CommitStatus) {
        let Some(outcome_tx) = self.outcome_tx.take() else {
            return;
        };
        self.teardown();

        let elapsed = self.started_at.elapsed();
        let outcome = CommitOutcome {
            transaction_id: self.transaction_id.clone(),
            status,
            peer_outcomes: self.strategy.outcomes().clone(),
            peer_codes: std::mem::take(&mut self.peer_codes),
            elapsed,
        };

        *self.state.lock() = HandlerState::from(status);

        metrics::record_outcome(status.as_str());
        for peer_outcome in outcome.peer_outcomes.values() {
            metrics::record_peer_outcome(&peer_outcome.to_string());
        }

        let tally = self.strategy.state();
        if status.is_success() {
            info!(
                tx_id = %self.transaction_id,
                %status,
                valid = tally.valid(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Transaction commit confirmed"
            );
        } else {
            warn!(
                tx_id = %self.transaction_id,
                %status,
                valid = tally.valid(),
                invalid = tally.invalid(),
                unavailable = tally.unavailable(),
                pending = tally.pending(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Transaction commit not confirmed"
            );
        }

        let _ = outcome_tx.send(outcome);
    }
}
