//! Commit Event Service - builds one handler per submitted transaction

use crate::config::{CommitEventServiceConfig, EventHandlerConfig, EventHandlerOptions};
use crate::domain::{CommitOutcome, EventStrategy, PeerSet};
use crate::error::CommitResult;
use crate::handler::TransactionEventHandler;
use crate::ports::inbound::CommitEventApi;
use crate::ports::outbound::{EventHubFactory, ScopeResolver};
use async_trait::async_trait;
use shared_types::TransactionId;
use std::sync::Arc;
use tracing::debug;

/// Handler factory bound to one client identity and one channel.
pub struct CommitEventService {
    config: CommitEventServiceConfig,
    scope_resolver: Arc<dyn ScopeResolver>,
    event_hub_factory: Arc<dyn EventHubFactory>,
}

impl CommitEventService {
    pub fn new(
        config: CommitEventServiceConfig,
        scope_resolver: Arc<dyn ScopeResolver>,
        event_hub_factory: Arc<dyn EventHubFactory>,
    ) -> Self {
        Self {
            config,
            scope_resolver,
            event_hub_factory,
        }
    }

    pub fn config(&self) -> &CommitEventServiceConfig {
        &self.config
    }

    /// Handler using the configured default preset and options.
    pub fn create_default_handler(
        &self,
        transaction_id: TransactionId,
    ) -> CommitResult<TransactionEventHandler> {
        self.create_handler(
            transaction_id,
            self.config.default_strategy,
            self.config.default_options.clone(),
        )
    }
}

#[async_trait]
impl CommitEventApi for CommitEventService {
    fn create_handler(
        &self,
        transaction_id: TransactionId,
        strategy: EventStrategy,
        options: EventHandlerOptions,
    ) -> CommitResult<TransactionEventHandler> {
        options.validate()?;
        let peers = PeerSet::resolve(
            strategy.scope(),
            self.scope_resolver.as_ref(),
            &self.config.msp_id,
        )?;
        debug!(
            tx_id = %transaction_id,
            %strategy,
            channel = %peers.channel(),
            peers = peers.len(),
            "Resolved commit scope"
        );

        Ok(TransactionEventHandler::new(
            EventHandlerConfig {
                transaction_id,
                strategy,
                options,
            },
            peers,
            self.event_hub_factory.clone(),
        ))
    }

    fn create_handler_by_name(
        &self,
        transaction_id: TransactionId,
        strategy_name: &str,
        options: EventHandlerOptions,
    ) -> CommitResult<TransactionEventHandler> {
        let strategy: EventStrategy = strategy_name.parse()?;
        self.create_handler(transaction_id, strategy, options)
    }

    async fn commit_and_wait(
        &self,
        transaction_id: TransactionId,
        strategy: EventStrategy,
        options: EventHandlerOptions,
    ) -> CommitResult<CommitOutcome> {
        let mut handler = self.create_handler(transaction_id, strategy, options)?;
        handler.start().await?;
        handler.wait_for_outcome().await
    }
}
