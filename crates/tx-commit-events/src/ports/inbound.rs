//! Driving Ports (API - Inbound)

use crate::config::EventHandlerOptions;
use crate::domain::{CommitOutcome, EventStrategy};
use crate::error::CommitResult;
use crate::handler::TransactionEventHandler;
use async_trait::async_trait;
use shared_types::TransactionId;

/// Primary commit event API.
///
/// One handler per submitted transaction. Handlers are never reused.
#[async_trait]
pub trait CommitEventApi: Send + Sync {
    /// Build a handler for `transaction_id` using a preset.
    ///
    /// Resolves the peer set once; fails with `NoPeersAvailable` when the
    /// scope is empty and with `InvalidConfig` on bad options.
    fn create_handler(
        &self,
        transaction_id: TransactionId,
        strategy: EventStrategy,
        options: EventHandlerOptions,
    ) -> CommitResult<TransactionEventHandler>;

    /// Same as `create_handler`, selecting the preset by its canonical name.
    ///
    /// Unknown names fail with `UnknownStrategy` before anything is resolved.
    fn create_handler_by_name(
        &self,
        transaction_id: TransactionId,
        strategy_name: &str,
        options: EventHandlerOptions,
    ) -> CommitResult<TransactionEventHandler>;

    /// Create, start and await a handler in one call.
    async fn commit_and_wait(
        &self,
        transaction_id: TransactionId,
        strategy: EventStrategy,
        options: EventHandlerOptions,
    ) -> CommitResult<CommitOutcome>;
}
