//! # Commit Event Handler Scenarios
//!
//! End-to-end runs of the handler against in-memory event hubs.
//!
//! ## Test Categories
//!
//! 1. **Strategy outcomes** - AllOf / AnyOf success and failure paths
//! 2. **Timeouts** - inconclusive results resolve `TimedOut`, never `Failed`
//! 3. **Setup failures** - empty scope, no connectable sources
//! 4. **Exactly-once** - duplicates, late events, cancellation, teardown

use async_trait::async_trait;
use serde_json::json;
use shared_types::{ChannelConfig, PeerId, PeerInfo, PeerRoles, TransactionId, ValidationCode};
use std::sync::Arc;
use std::time::Duration;
use tx_commit_events::adapters::{ChannelScopeResolver, InMemoryEventHub, InMemoryEventHubFactory};
use tx_commit_events::{
    CommitEventApi, CommitEventError, CommitEventService, CommitEventServiceConfig, CommitStatus,
    ConnectionError, EventHandlerOptions, EventHubConnections, EventHubFactory, EventScope,
    EventStrategy, HandlerState, PeerSet, TransactionEventHandler, TransactionOutcome,
};

// =============================================================================
// TEST HELPERS
// =============================================================================

struct TestNetwork {
    service: CommitEventService,
    factory: Arc<InMemoryEventHubFactory>,
}

impl TestNetwork {
    /// Channel with `peers` as (peer id, msp id); the client is in Org1MSP.
    fn new(peers: &[(&str, &str)]) -> Self {
        let mut channel = ChannelConfig::new("mychannel".parse().unwrap());
        for (id, msp) in peers {
            channel
                .add_peer(PeerInfo::new(id.parse().unwrap(), msp.parse().unwrap()))
                .unwrap();
        }
        let factory = Arc::new(InMemoryEventHubFactory::new());
        let service = CommitEventService::new(
            CommitEventServiceConfig::new("Org1MSP".parse().unwrap()),
            Arc::new(ChannelScopeResolver::new(channel)),
            factory.clone(),
        );
        Self { service, factory }
    }

    fn org1(n: usize) -> Self {
        let ids: Vec<String> = (0..n).map(|i| format!("peer{}.org1", i)).collect();
        let peers: Vec<(&str, &str)> = ids.iter().map(|id| (id.as_str(), "Org1MSP")).collect();
        Self::new(&peers)
    }

    fn hub(&self, id: &str) -> Arc<InMemoryEventHub> {
        self.factory.hub(&peer(id))
    }

    fn handler(&self, strategy: EventStrategy, timeout_ms: u64) -> TransactionEventHandler {
        self.service
            .create_handler(tx(), strategy, EventHandlerOptions::new(timeout_ms).unwrap())
            .unwrap()
    }
}

fn peer(id: &str) -> PeerId {
    id.parse().unwrap()
}

fn tx() -> TransactionId {
    "TRANSACTION_ID".parse().unwrap()
}

fn mvcc() -> ValidationCode {
    ValidationCode::MvccReadConflict
}

/// Factory that hands every connected source out twice and can report a
/// peer as both connected and failed.
struct RepeatingFactory {
    inner: InMemoryEventHubFactory,
    also_failed: Option<PeerId>,
}

#[async_trait]
impl EventHubFactory for RepeatingFactory {
    async fn get_event_hubs(&self, peers: &PeerSet) -> EventHubConnections {
        let mut connections = self.inner.get_event_hubs(peers).await;
        let repeated = connections.connected.clone();
        connections.connected.extend(repeated);
        if let Some(peer) = &self.also_failed {
            connections.errors.insert(
                peer.clone(),
                ConnectionError {
                    peer: peer.clone(),
                    reason: "handshake timed out".to_string(),
                },
            );
        }
        connections
    }
}

fn repeating_service(also_failed: Option<&str>) -> (CommitEventService, Arc<RepeatingFactory>) {
    let channel = ChannelConfig::new("mychannel".parse().unwrap())
        .with_peer(PeerInfo::new(peer("peer0.org1"), "Org1MSP".parse().unwrap()))
        .unwrap()
        .with_peer(PeerInfo::new(peer("peer1.org1"), "Org1MSP".parse().unwrap()))
        .unwrap();
    let factory = Arc::new(RepeatingFactory {
        inner: InMemoryEventHubFactory::new(),
        also_failed: also_failed.map(peer),
    });
    let service = CommitEventService::new(
        CommitEventServiceConfig::new("Org1MSP".parse().unwrap()),
        Arc::new(ChannelScopeResolver::new(channel)),
        factory.clone(),
    );
    (service, factory)
}

async fn wait_for_state(handler: &TransactionEventHandler, state: HandlerState) {
    for _ in 0..100 {
        if handler.state() == state {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("handler never reached {:?}, stuck in {:?}", state, handler.state());
}

// =============================================================================
// STRATEGY OUTCOMES
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_all_of_three_valid_succeeds() {
    let net = TestNetwork::org1(3);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    for id in ["peer0.org1", "peer1.org1", "peer2.org1"] {
        assert_eq!(net.hub(id).commit(&tx(), ValidationCode::Valid, 7), 1);
    }
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert_eq!(outcome.peers_with(TransactionOutcome::Valid).len(), 3);
    assert_eq!(outcome.peer_codes.len(), 3);
    assert_eq!(handler.state(), HandlerState::Succeeded);
    for id in ["peer0.org1", "peer1.org1", "peer2.org1"] {
        assert_eq!(net.hub(id).listener_count(), 0);
    }
}

#[tokio::test(start_paused = true)]
async fn test_all_of_invalid_fails_before_timeout() {
    let net = TestNetwork::org1(3);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    net.hub("peer0.org1").commit(&tx(), ValidationCode::Valid, 7);
    net.hub("peer1.org1").commit(&tx(), mvcc(), 7);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert!(outcome.elapsed < Duration::from_millis(30_000));
    assert_eq!(outcome.peer_outcomes[&peer("peer0.org1")], TransactionOutcome::Valid);
    assert_eq!(outcome.peer_outcomes[&peer("peer1.org1")], TransactionOutcome::Invalid);
    assert_eq!(outcome.peer_outcomes[&peer("peer2.org1")], TransactionOutcome::Unknown);
    assert_eq!(outcome.peer_codes[&peer("peer1.org1")], mvcc());
    assert_eq!(net.hub("peer2.org1").listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_all_of_fails_immediately_on_unreachable_peer() {
    let net = TestNetwork::org1(3);
    net.factory
        .set_unreachable(&peer("peer1.org1"), "connection refused");
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert_eq!(outcome.elapsed, Duration::ZERO);
    assert_eq!(outcome.peer_outcomes[&peer("peer1.org1")], TransactionOutcome::Unavailable);
    assert_eq!(net.hub("peer0.org1").listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_all_of_fails_on_disconnect() {
    let net = TestNetwork::org1(2);
    let mut handler = net.handler(EventStrategy::NetworkScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    net.hub("peer0.org1").commit(&tx(), ValidationCode::Valid, 1);
    net.hub("peer1.org1").disconnect();
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert_eq!(outcome.peer_outcomes[&peer("peer1.org1")], TransactionOutcome::Unavailable);
}

#[tokio::test(start_paused = true)]
async fn test_any_of_first_valid_wins() {
    let net = TestNetwork::org1(3);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 30_000);
    handler.start().await.unwrap();

    net.hub("peer0.org1").commit(&tx(), mvcc(), 4);
    net.hub("peer1.org1").commit(&tx(), ValidationCode::Valid, 4);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert_eq!(outcome.peer_outcomes[&peer("peer0.org1")], TransactionOutcome::Invalid);
    assert_eq!(outcome.peer_outcomes[&peer("peer2.org1")], TransactionOutcome::Unknown);

    // Late report from the third peer reaches nobody and changes nothing
    assert_eq!(net.hub("peer2.org1").commit(&tx(), mvcc(), 4), 0);
    assert_eq!(handler.wait_for_outcome().await.unwrap(), outcome);
}

#[tokio::test(start_paused = true)]
async fn test_any_of_fails_when_every_peer_negative() {
    let net = TestNetwork::org1(3);
    net.factory.set_unreachable(&peer("peer2.org1"), "tls handshake failed");
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 30_000);
    handler.start().await.unwrap();

    net.hub("peer0.org1").commit(&tx(), ValidationCode::EndorsementPolicyFailure, 9);
    assert_eq!(handler.state(), HandlerState::Started);
    net.hub("peer1.org1").fail("stream reset");
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert_eq!(outcome.peers_with(TransactionOutcome::Unavailable).len(), 2);
    assert_eq!(outcome.peers_with(TransactionOutcome::Invalid).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_network_scope_includes_other_organizations() {
    let net = TestNetwork::new(&[("peer0.org1", "Org1MSP"), ("peer0.org2", "Org2MSP")]);

    let org = net.handler(EventStrategy::MspidScopeAllForTx, 1_000);
    assert_eq!(org.scope(), EventScope::PerOrganization);
    assert_eq!(org.peers().len(), 1);

    let mut network = net.handler(EventStrategy::NetworkScopeAllForTx, 1_000);
    assert_eq!(network.peers().len(), 2);
    network.start().await.unwrap();
    net.hub("peer0.org1").commit(&tx(), ValidationCode::Valid, 1);
    net.hub("peer0.org2").commit(&tx(), ValidationCode::Valid, 1);

    assert!(network.wait_for_outcome().await.unwrap().is_success());
}

// =============================================================================
// TIMEOUTS
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_any_of_no_response_times_out() {
    let net = TestNetwork::org1(2);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 100);
    handler.start().await.unwrap();

    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::TimedOut);
    assert!(outcome.elapsed >= Duration::from_millis(100));
    assert!(outcome.elapsed < Duration::from_millis(150));
    assert!(outcome
        .peer_outcomes
        .values()
        .all(|o| *o == TransactionOutcome::Unknown));
    assert_eq!(handler.state(), HandlerState::TimedOut);
    assert_eq!(net.hub("peer0.org1").listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_partial_reports_still_time_out_not_fail() {
    let net = TestNetwork::org1(3);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 100);
    handler.start().await.unwrap();

    net.hub("peer0.org1").commit(&tx(), ValidationCode::Valid, 2);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::TimedOut);
    assert_eq!(outcome.peer_outcomes[&peer("peer0.org1")], TransactionOutcome::Valid);
    assert_eq!(outcome.peer_outcomes[&peer("peer1.org1")], TransactionOutcome::Unknown);
}

#[tokio::test(start_paused = true)]
async fn test_event_before_deadline_beats_timer() {
    let net = TestNetwork::org1(1);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 100);
    handler.start().await.unwrap();

    let hub = net.hub("peer0.org1");
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        hub.commit(&tx(), ValidationCode::Valid, 11);
    });
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert!(outcome.elapsed >= Duration::from_millis(50));
    assert!(outcome.elapsed < Duration::from_millis(100));
}

// =============================================================================
// SETUP FAILURES
// =============================================================================

#[tokio::test]
async fn test_empty_scope_is_no_peers_available() {
    let net = TestNetwork::new(&[("peer0.org2", "Org2MSP")]);

    let err = net
        .service
        .create_handler(tx(), EventStrategy::MspidScopeAllForTx, EventHandlerOptions::default())
        .unwrap_err();

    assert!(matches!(
        err,
        CommitEventError::NoPeersAvailable {
            scope: EventScope::PerOrganization,
            ..
        }
    ));
    assert_eq!(net.hub("peer0.org2").listener_count(), 0);
}

#[tokio::test]
async fn test_peers_without_event_role_are_not_eligible() {
    let channel = ChannelConfig::new("mychannel".parse().unwrap())
        .with_peer(
            PeerInfo::new(peer("peer0.org1"), "Org1MSP".parse().unwrap())
                .with_roles(PeerRoles::without_events()),
        )
        .unwrap();
    let service = CommitEventService::new(
        CommitEventServiceConfig::new("Org1MSP".parse().unwrap()),
        Arc::new(ChannelScopeResolver::new(channel)),
        Arc::new(InMemoryEventHubFactory::new()),
    );

    let err = service.create_default_handler(tx()).unwrap_err();
    assert!(matches!(err, CommitEventError::NoPeersAvailable { .. }));
}

#[tokio::test]
async fn test_no_connected_sources_fails_start() {
    let net = TestNetwork::org1(2);
    net.factory.set_unreachable(&peer("peer0.org1"), "refused");
    net.factory.set_unreachable(&peer("peer1.org1"), "refused");
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 1_000);

    let err = handler.start().await.unwrap_err();

    assert!(matches!(err, CommitEventError::NoPeersAvailable { .. }));
    assert_eq!(handler.state(), HandlerState::Created);
    assert!(matches!(
        handler.wait_for_outcome().await,
        Err(CommitEventError::NotStarted)
    ));
}

#[tokio::test]
async fn test_zero_timeout_rejected_at_construction() {
    let err = EventHandlerOptions::from_json(json!({ "commitTimeoutMs": 0 })).unwrap_err();
    assert!(matches!(err, CommitEventError::InvalidConfig { .. }));
}

// =============================================================================
// EXACTLY-ONCE AND TEARDOWN
// =============================================================================

#[tokio::test(start_paused = true)]
async fn test_duplicate_events_keep_first_report() {
    let net = TestNetwork::org1(2);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    // Both queued before the tally task runs
    net.hub("peer0.org1").commit(&tx(), ValidationCode::Valid, 5);
    net.hub("peer0.org1").commit(&tx(), mvcc(), 6);
    net.hub("peer1.org1").commit(&tx(), ValidationCode::Valid, 5);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert_eq!(outcome.peer_codes[&peer("peer0.org1")], ValidationCode::Valid);
}

#[tokio::test(start_paused = true)]
async fn test_unavailable_peer_stays_unavailable_after_reconnect() {
    let net = TestNetwork::org1(2);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 30_000);
    handler.start().await.unwrap();

    let hub0 = net.hub("peer0.org1");
    hub0.disconnect();
    hub0.reconnect();
    hub0.commit(&tx(), ValidationCode::Valid, 3);
    net.hub("peer1.org1").commit(&tx(), mvcc(), 3);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert_eq!(outcome.peer_outcomes[&peer("peer0.org1")], TransactionOutcome::Unavailable);
    assert!(!outcome.peer_codes.contains_key(&peer("peer0.org1")));
}

#[tokio::test]
async fn test_lifecycle_misuse() {
    let net = TestNetwork::org1(1);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 1_000);

    assert!(matches!(
        handler.wait_for_outcome().await,
        Err(CommitEventError::NotStarted)
    ));
    handler.start().await.unwrap();
    assert!(matches!(
        handler.start().await,
        Err(CommitEventError::AlreadyStarted)
    ));
    assert_eq!(net.hub("peer0.org1").listener_count(), 1);
}

#[tokio::test]
async fn test_start_after_cancel_is_rejected() {
    let net = TestNetwork::org1(1);
    let mut handler = net.handler(EventStrategy::MspidScopeAnyForTx, 1_000);

    handler.cancel();

    assert_eq!(handler.state(), HandlerState::Cancelled);
    assert!(matches!(
        handler.start().await,
        Err(CommitEventError::HandlerCancelled)
    ));
    assert!(matches!(
        handler.wait_for_outcome().await,
        Err(CommitEventError::HandlerCancelled)
    ));
    assert_eq!(net.hub("peer0.org1").listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_sources_register_once_and_tear_down() {
    let (service, factory) = repeating_service(None);
    let mut handler = service
        .create_handler(tx(), EventStrategy::MspidScopeAllForTx, EventHandlerOptions::default())
        .unwrap();
    handler.start().await.unwrap();

    let hub0 = factory.inner.hub(&peer("peer0.org1"));
    let hub1 = factory.inner.hub(&peer("peer1.org1"));
    assert_eq!(hub0.listener_count(), 1);
    assert_eq!(hub1.listener_count(), 1);

    hub0.commit(&tx(), ValidationCode::Valid, 1);
    hub1.commit(&tx(), ValidationCode::Valid, 1);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert_eq!(hub0.listener_count(), 0);
    assert_eq!(hub1.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_source_reported_failed_is_never_subscribed() {
    let (service, factory) = repeating_service(Some("peer0.org1"));
    let mut handler = service
        .create_handler(tx(), EventStrategy::MspidScopeAnyForTx, EventHandlerOptions::default())
        .unwrap();
    handler.start().await.unwrap();

    let hub0 = factory.inner.hub(&peer("peer0.org1"));
    let hub1 = factory.inner.hub(&peer("peer1.org1"));
    assert_eq!(hub0.listener_count(), 0);
    assert_eq!(hub0.commit(&tx(), ValidationCode::Valid, 1), 0);

    hub1.commit(&tx(), ValidationCode::MvccReadConflict, 1);
    let outcome = handler.wait_for_outcome().await.unwrap();

    assert_eq!(outcome.status, CommitStatus::Failed);
    assert_eq!(outcome.peer_outcomes[&peer("peer0.org1")], TransactionOutcome::Unavailable);
    assert_eq!(hub1.listener_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_tears_down_without_outcome() {
    let net = TestNetwork::org1(2);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();
    assert_eq!(net.hub("peer0.org1").listener_count(), 1);

    handler.cancel();
    wait_for_state(&handler, HandlerState::Cancelled).await;

    assert_eq!(net.hub("peer0.org1").listener_count(), 0);
    assert_eq!(net.hub("peer1.org1").listener_count(), 0);
    assert!(matches!(
        handler.wait_for_outcome().await,
        Err(CommitEventError::HandlerCancelled)
    ));
}

#[tokio::test(start_paused = true)]
async fn test_dropped_handler_releases_listeners() {
    let net = TestNetwork::org1(1);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();
    let hub = net.hub("peer0.org1");
    assert_eq!(hub.listener_count(), 1);

    drop(handler);
    for _ in 0..100 {
        if hub.listener_count() == 0 {
            break;
        }
        tokio::task::yield_now().await;
    }

    assert_eq!(hub.listener_count(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_delivery_from_many_peers() {
    let net = TestNetwork::org1(16);
    let mut handler = net.handler(EventStrategy::MspidScopeAllForTx, 30_000);
    handler.start().await.unwrap();

    let threads: Vec<_> = (0..16)
        .map(|i| {
            let hub = net.hub(&format!("peer{}.org1", i));
            std::thread::spawn(move || {
                hub.commit(&tx(), ValidationCode::Valid, 42);
                // Repeats must not disturb the tally
                hub.commit(&tx(), ValidationCode::Valid, 42);
            })
        })
        .collect();
    for t in threads {
        t.join().unwrap();
    }

    let outcome = handler.wait_for_outcome().await.unwrap();
    assert_eq!(outcome.status, CommitStatus::Succeeded);
    assert_eq!(outcome.peers_with(TransactionOutcome::Valid).len(), 16);
}
