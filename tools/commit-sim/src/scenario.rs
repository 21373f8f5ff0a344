//! Simulated channel and scripted peer behaviour.

use anyhow::{anyhow, Context};
use rand::Rng;
use shared_types::{ChannelConfig, MspId, PeerId, PeerInfo, TransactionId, ValidationCode};
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tx_commit_events::adapters::{ChannelScopeResolver, InMemoryEventHubFactory};
use tx_commit_events::{
    CommitEventApi, CommitEventService, CommitEventServiceConfig, CommitOutcome,
    EventHandlerOptions,
};

/// What a simulated peer does once its latency has elapsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PeerBehaviour {
    /// Commit event with code `VALID`
    Valid,
    /// Commit event with code `MVCC_READ_CONFLICT`
    Invalid,
    /// Never reports
    Silent,
    /// Event stream drops
    Disconnect,
    /// Connection refused up front
    Unreachable,
}

impl FromStr for PeerBehaviour {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "valid" => Ok(PeerBehaviour::Valid),
            "invalid" => Ok(PeerBehaviour::Invalid),
            "silent" => Ok(PeerBehaviour::Silent),
            "disconnect" => Ok(PeerBehaviour::Disconnect),
            "unreachable" => Ok(PeerBehaviour::Unreachable),
            other => Err(anyhow!(
                "unknown behaviour '{}' (valid, invalid, silent, disconnect, unreachable)",
                other
            )),
        }
    }
}

/// Parse a `peer=behaviour` override.
pub fn parse_override(s: &str) -> anyhow::Result<(PeerId, PeerBehaviour)> {
    let (peer, behaviour) = s
        .split_once('=')
        .ok_or_else(|| anyhow!("expected PEER=BEHAVIOUR, got '{}'", s))?;
    let peer: PeerId = peer.trim().parse()?;
    Ok((peer, behaviour.trim().parse()?))
}

/// `peers_per_org` event-emitting peers in each of `orgs` organizations.
///
/// Peers are named `peer{n}.org{m}` and owned by `Org{m}MSP`.
pub fn build_channel(
    name: &str,
    orgs: usize,
    peers_per_org: usize,
) -> anyhow::Result<ChannelConfig> {
    let mut channel = ChannelConfig::new(name.parse()?);
    for org in 1..=orgs {
        let msp: MspId = format!("Org{}MSP", org).parse()?;
        for n in 0..peers_per_org {
            let peer: PeerId = format!("peer{}.org{}", n, org).parse()?;
            channel.add_peer(PeerInfo::new(peer, msp.clone()))?;
        }
    }
    Ok(channel)
}

/// One peer's scripted reaction.
#[derive(Clone, Debug)]
pub struct PeerPlan {
    pub peer: PeerId,
    pub behaviour: PeerBehaviour,
    pub latency: Duration,
}

/// Script every peer in the channel. Peers without an override commit
/// `VALID`; latencies are drawn uniformly from `0..=max_latency`.
pub fn plan_peers<R: Rng>(
    channel: &ChannelConfig,
    overrides: &HashMap<PeerId, PeerBehaviour>,
    max_latency: Duration,
    rng: &mut R,
) -> Vec<PeerPlan> {
    let max_ms = max_latency.as_millis() as u64;
    channel
        .peers()
        .iter()
        .map(|info| PeerPlan {
            peer: info.id.clone(),
            behaviour: overrides
                .get(&info.id)
                .copied()
                .unwrap_or(PeerBehaviour::Valid),
            latency: Duration::from_millis(rng.gen_range(0..=max_ms)),
        })
        .collect()
}

/// A simulated channel wired to the commit event service.
pub struct Simulation {
    service: CommitEventService,
    factory: Arc<InMemoryEventHubFactory>,
    plans: Vec<PeerPlan>,
}

impl Simulation {
    pub fn new(
        channel: ChannelConfig,
        service_config: CommitEventServiceConfig,
        plans: Vec<PeerPlan>,
    ) -> Self {
        let factory = Arc::new(InMemoryEventHubFactory::new());
        for plan in &plans {
            if plan.behaviour == PeerBehaviour::Unreachable {
                factory.set_unreachable(&plan.peer, "connection refused (simulated)");
            }
        }
        let service = CommitEventService::new(
            service_config,
            Arc::new(ChannelScopeResolver::new(channel)),
            factory.clone(),
        );
        Self {
            service,
            factory,
            plans,
        }
    }

    /// Submit `transaction_id` and wait for its outcome while the scripted
    /// peers react.
    pub async fn run(
        &self,
        transaction_id: TransactionId,
        strategy_name: &str,
        options: EventHandlerOptions,
    ) -> anyhow::Result<CommitOutcome> {
        let mut handler = self
            .service
            .create_handler_by_name(transaction_id.clone(), strategy_name, options)
            .context("creating commit event handler")?;
        handler
            .start()
            .await
            .context("starting commit event handler")?;

        for (block, plan) in self.plans.iter().enumerate() {
            if !handler.peers().contains(&plan.peer) {
                continue;
            }
            let hub = self.factory.hub(&plan.peer);
            let plan = plan.clone();
            let tx = transaction_id.clone();
            tokio::spawn(async move {
                tokio::time::sleep(plan.latency).await;
                tracing::debug!(peer = %plan.peer, behaviour = ?plan.behaviour, "Peer reacting");
                match plan.behaviour {
                    PeerBehaviour::Valid => {
                        hub.commit(&tx, ValidationCode::Valid, block as u64 + 1);
                    }
                    PeerBehaviour::Invalid => {
                        hub.commit(&tx, ValidationCode::MvccReadConflict, block as u64 + 1);
                    }
                    PeerBehaviour::Disconnect => hub.disconnect(),
                    PeerBehaviour::Silent | PeerBehaviour::Unreachable => {}
                }
            });
        }

        Ok(handler.wait_for_outcome().await?)
    }
}
