//! # tx-commit-events
//!
//! Transaction commit event aggregation: decides whether a submitted
//! transaction has been committed by enough peers before success is
//! reported to the submitting client.
//!
//! ## Overview
//!
//! This crate provides:
//! - **Scope resolution**: the peers of the client's organization, or every
//!   event-emitting peer on the channel, frozen per transaction
//! - **Quorum strategies**: require-all (`AllOf`) or require-any (`AnyOf`)
//! - **Event handler**: subscribes to every peer, races a commit timeout and
//!   finalizes exactly once
//!
//! ## Architecture
//!
//! ```text
//! client ──create_handler(tx, preset, options)──→ CommitEventService
//!                                                    │
//!                      ScopeResolver ←── resolve ────┤
//!                                                    ↓
//!                                         TransactionEventHandler
//!                                                    │ start()
//!                   EventHubFactory ←── connect ─────┤
//!                                                    │
//!   PeerEventSource ×N ──events/errors──→ tally task (CommitStrategy + timer)
//!                                                    │
//!                                                    └──→ CommitOutcome
//! ```
//!
//! ## Presets
//!
//! | Name | Scope | Strategy |
//! |------|-------|----------|
//! | `MSPID_SCOPE_ALLFORTX` | organization | all-of |
//! | `MSPID_SCOPE_ANYFORTX` | organization | any-of |
//! | `NETWORK_SCOPE_ALLFORTX` | network | all-of |
//! | `NETWORK_SCOPE_ANYFORTX` | network | any-of |
//!
//! ## Example
//!
//! ```rust,ignore
//! use tx_commit_events::{CommitEventApi, CommitEventService, EventStrategy};
//!
//! let mut handler = service.create_handler(tx_id, EventStrategy::NetworkScopeAllForTx, options)?;
//! handler.start().await?;
//! let outcome = handler.wait_for_outcome().await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod ports;
pub mod service;

pub use config::{
    CommitEventServiceConfig, EventHandlerConfig, EventHandlerOptions, DEFAULT_COMMIT_TIMEOUT_MS,
};
pub use domain::{
    CommitOutcome, CommitStatus, CommitStrategy, Decision, EventScope, EventStrategy, PeerSet,
    StrategyKind, TransactionOutcome,
};
pub use error::{CommitEventError, CommitResult, ConnectionError, EventSourceError};
pub use handler::{HandlerState, TransactionEventHandler};
pub use ports::inbound::CommitEventApi;
pub use ports::outbound::{
    ConnectionState, EventHubConnections, EventHubFactory, ListenerHandle, PeerEventSource,
    ScopeResolver, TxCommitEvent, TxListener, TxNotification,
};
pub use service::CommitEventService;
