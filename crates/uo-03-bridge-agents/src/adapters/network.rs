//! # Local Network
//!
//! A hub and any number of branches sharing one [`InMemoryTransport`].
//! [`LocalNetwork::deliver_next`] plays the transport's role: it executes the
//! next envelope on its destination and, when the execution reports failure
//! for an envelope that asked for it, delivers the fallback to the origin in
//! the same step. An envelope never gets both a successful execution and a
//! fallback.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared_types::context::DEFAULT_GAS_LIMIT;
use shared_types::{Address, ChainId, TokenLedger, U256};
use tracing::{info, warn};
use uo_01_ports::{BranchPort, RootPort};
use uo_02_messaging::{Envelope, InMemoryTransport, Transport};
use uuid::Uuid;

use crate::adapters::host::{BranchChain, ChainHost, ChainState, RootChain};
use crate::agents::{BranchBridgeAgent, RootBridgeAgent};
use crate::domain::config::GasConfig;
use crate::domain::entities::ExecutionReport;
use crate::domain::errors::BridgeAgentError;
use crate::ports::outbound::{BranchRouter, RootRouter};

/// Network-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Hub chain id.
    pub hub_chain: ChainId,
    /// Gas price deliveries run at, on every chain.
    pub gas_price: u64,
    /// Gas limit of each delivery.
    pub gas_limit: u64,
    /// Upper bound on deliveries in one [`LocalNetwork::run_until_idle`].
    pub max_deliveries: usize,
    /// Gas constants of the root agent.
    pub root_gas: GasConfig,
    /// Gas constants of every branch agent.
    pub branch_gas: GasConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            hub_chain: 1,
            gas_price: 1,
            gas_limit: DEFAULT_GAS_LIMIT,
            max_deliveries: 1_000,
            root_gas: GasConfig::root(),
            branch_gas: GasConfig::branch(),
        }
    }
}

/// Initial reserves of a branch's gas pool at the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GasPoolSeed {
    /// Hub native put in by the owner.
    pub native_reserve: u64,
    /// Wrapped branch gas minted into the pool; the branch agent is funded
    /// with the same amount of branch native.
    pub gas_reserve: u64,
    /// Swap price impact bound.
    pub max_price_impact_bps: u32,
}

impl Default for GasPoolSeed {
    fn default() -> Self {
        Self {
            native_reserve: 1_000_000_000_000,
            gas_reserve: 1_000_000_000_000,
            max_price_impact_bps: 500,
        }
    }
}

/// A token's addresses on one branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LocalToken {
    /// hToken.
    pub h_token: Address,
    /// Underlying backing it.
    pub underlying: Address,
}

/// A token registered across the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenInfo {
    /// Global token at the hub.
    pub global: Address,
    /// Per-branch addresses.
    pub locals: BTreeMap<ChainId, LocalToken>,
}

impl TokenInfo {
    /// Addresses on `chain`.
    pub fn local(&self, chain: ChainId) -> Option<LocalToken> {
        self.locals.get(&chain).copied()
    }
}

/// Which callback a delivery invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DeliveryKind {
    /// `any_execute` on the destination.
    Execute,
    /// `any_fallback` on the origin.
    Fallback,
}

/// Outcome of one delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryRecord {
    /// Envelope id.
    pub envelope: Uuid,
    /// Origin chain.
    pub from_chain: ChainId,
    /// Destination chain.
    pub to_chain: ChainId,
    /// Callback invoked.
    pub kind: DeliveryKind,
    /// Whether it succeeded.
    pub success: bool,
    /// Reason reported.
    pub reason: String,
}

/// Everything one envelope's delivery produced: the execution and, when it
/// failed with the fallback flag set, the fallback delivered in its wake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Delivery {
    /// The execution on the destination.
    pub execute: DeliveryRecord,
    /// The fallback on the origin, if one was attempted.
    pub fallback: Option<DeliveryRecord>,
}

impl DeliveryRecord {
    fn new(envelope: &Envelope, kind: DeliveryKind, success: bool, reason: String) -> Self {
        Self {
            envelope: envelope.id,
            from_chain: envelope.from_chain,
            to_chain: envelope.to_chain,
            kind,
            success,
            reason,
        }
    }
}

/// Accounting snapshot of one token across the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenAudit {
    /// Global supply at the hub.
    pub hub_supply: U256,
    /// Global held in root port custody.
    pub custody: U256,
    /// Per chain: (attributed at hub, underlying locked in the branch port, hToken supply).
    pub chains: BTreeMap<ChainId, (U256, U256, U256)>,
}

impl TokenAudit {
    /// Holds at every point, messages in flight included: supply equals the
    /// sum of attributions, no chain is attributed more than it has locked,
    /// and custody covers every hToken outstanding.
    pub fn is_solvent(&self) -> bool {
        let mut attributed = U256::zero();
        let mut h_supply = U256::zero();
        for (attribution, locked, supply) in self.chains.values() {
            if attribution > locked {
                return false;
            }
            attributed = attributed.saturating_add(*attribution);
            h_supply = h_supply.saturating_add(*supply);
        }
        attributed == self.hub_supply && h_supply <= self.custody
    }

    /// Holds once nothing is in flight or awaiting redemption: every
    /// attribution equals the underlying locked on its chain and custody
    /// equals the hTokens outstanding.
    pub fn is_conserved(&self) -> bool {
        let h_supply = self
            .chains
            .values()
            .fold(U256::zero(), |acc, (_, _, supply)| acc.saturating_add(*supply));
        self.is_solvent()
            && h_supply == self.custody
            && self
                .chains
                .values()
                .all(|(attribution, locked, _)| attribution == locked)
    }
}

/// Hub plus branches over an in-memory transport.
#[derive(Debug)]
pub struct LocalNetwork {
    config: NetworkConfig,
    owner: Address,
    executor: Address,
    transport: Arc<InMemoryTransport>,
    hub: RootChain,
    branches: BTreeMap<ChainId, BranchChain>,
    log: Vec<DeliveryRecord>,
}

/// Deterministic per-chain account for `label`.
pub fn chain_address(label: &str, chain: ChainId) -> Address {
    let mut seed = format!("ulysses/{label}/").into_bytes();
    seed.extend_from_slice(&chain.to_be_bytes());
    Address::derive(&seed)
}

impl LocalNetwork {
    /// Hub only. Branches are added with [`LocalNetwork::add_branch`].
    pub fn new(
        config: NetworkConfig,
        root_router: Arc<dyn RootRouter>,
    ) -> Result<Self, BridgeAgentError> {
        config.root_gas.validate()?;
        config.branch_gas.validate()?;
        let owner = Address::derive(b"ulysses/owner");
        let executor = Address::derive(b"ulysses/executor");
        let hub_chain = config.hub_chain;
        let transport = Arc::new(InMemoryTransport::new());

        let mut port = RootPort::new(chain_address("root-port", hub_chain), owner, hub_chain);
        let agent_address = chain_address("root-agent", hub_chain);
        let cap = port.add_bridge_agent(owner, agent_address)?;
        let agent = RootBridgeAgent::new(
            agent_address,
            hub_chain,
            owner,
            cap,
            root_router,
            executor,
            config.root_gas,
        );
        let state = ChainState {
            ledger: TokenLedger::new(),
            port,
            agent,
        };
        let shared: Arc<dyn Transport> = transport.clone();
        let hub = ChainHost::new(state, shared, executor)
            .with_gas_price(U256::from(config.gas_price))
            .with_gas_limit(config.gas_limit);
        info!("[uo-03] network hub on chain {}", hub_chain);

        Ok(Self {
            config,
            owner,
            executor,
            transport,
            hub,
            branches: BTreeMap::new(),
            log: Vec::new(),
        })
    }

    /// Register `chain` at the hub, deploy its port and agent, bind them and
    /// seed its gas pool.
    pub fn add_branch(
        &mut self,
        chain: ChainId,
        router: Arc<dyn BranchRouter>,
        seed: GasPoolSeed,
    ) -> Result<(), BridgeAgentError> {
        let hub_chain = self.config.hub_chain;
        if chain == hub_chain || self.branches.contains_key(&chain) {
            return Err(BridgeAgentError::InvalidInputParams(format!(
                "chain {chain} already present"
            )));
        }
        let owner = self.owner;
        let gas_global = chain_address("gas-global", chain);
        self.hub
            .transact(|s| Ok(s.port.add_new_chain(owner, chain, gas_global)?))?;

        let mut port = BranchPort::new(chain_address("branch-port", chain), owner, chain);
        let agent_address = chain_address("branch-agent", chain);
        let cap = port.add_bridge_agent(owner, agent_address)?;
        let agent = BranchBridgeAgent::new(
            agent_address,
            chain,
            hub_chain,
            cap,
            router,
            self.executor,
            self.config.branch_gas,
        );
        let mut ledger = TokenLedger::new();
        ledger.mint(Address::NATIVE, agent_address, U256::from(seed.gas_reserve))?;
        let shared: Arc<dyn Transport> = self.transport.clone();
        let host = ChainHost::new(ChainState { ledger, port, agent }, shared, self.executor)
            .with_gas_price(U256::from(self.config.gas_price))
            .with_gas_limit(self.config.gas_limit);
        self.branches.insert(chain, host);

        let native = U256::from(seed.native_reserve);
        let gas = U256::from(seed.gas_reserve);
        self.hub.transact(|s| {
            s.agent
                .sync_branch_bridge_agent(&s.port, owner, chain, agent_address)?;
            s.ledger.mint(Address::NATIVE, owner, native)?;
            s.agent.initialize_gas_pool(
                &mut s.ledger,
                &mut s.port,
                owner,
                chain,
                native,
                gas,
                seed.max_price_impact_bps,
            )
        })?;
        info!("[uo-03] network added branch {}", chain);
        Ok(())
    }

    /// Register a token called `label` on the hub and on each of `chains`.
    pub fn add_token(
        &mut self,
        label: &str,
        chains: &[ChainId],
    ) -> Result<TokenInfo, BridgeAgentError> {
        let owner = self.owner;
        let global = Address::derive(format!("ulysses/token/{label}/global").as_bytes());
        let mut locals = BTreeMap::new();
        for &chain in chains {
            locals.insert(
                chain,
                LocalToken {
                    h_token: chain_address(&format!("token/{label}/h"), chain),
                    underlying: chain_address(&format!("token/{label}/underlying"), chain),
                },
            );
        }

        self.hub.transact(|s| {
            s.port.add_global_token(owner, global)?;
            for (&chain, local) in &locals {
                s.port
                    .add_local_token(owner, global, local.h_token, local.underlying, chain)?;
            }
            Ok(())
        })?;
        for (&chain, local) in &locals {
            let branch = self
                .branches
                .get_mut(&chain)
                .ok_or(BridgeAgentError::UnrecognizedChain(chain))?;
            branch.transact(|s| Ok(s.port.add_local_token(owner, local.h_token, local.underlying)?))?;
        }
        Ok(TokenInfo { global, locals })
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    /// Settings.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    /// Owner of every port and of the root agent.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Transport executor account, the same on every chain.
    pub fn executor(&self) -> Address {
        self.executor
    }

    /// Shared transport.
    pub fn transport(&self) -> &Arc<InMemoryTransport> {
        &self.transport
    }

    /// Hub.
    pub fn hub(&self) -> &RootChain {
        &self.hub
    }

    /// Hub, mutably.
    pub fn hub_mut(&mut self) -> &mut RootChain {
        &mut self.hub
    }

    /// Branch `chain`.
    pub fn branch(&self, chain: ChainId) -> Option<&BranchChain> {
        self.branches.get(&chain)
    }

    /// Branch `chain`, mutably.
    pub fn branch_mut(&mut self, chain: ChainId) -> Option<&mut BranchChain> {
        self.branches.get_mut(&chain)
    }

    /// Branch chain ids.
    pub fn branch_chains(&self) -> Vec<ChainId> {
        self.branches.keys().copied().collect()
    }

    /// Every delivery so far.
    pub fn deliveries(&self) -> &[DeliveryRecord] {
        &self.log
    }

    /// Mint `amount` of `token` to `holder` on `chain` (hub or branch).
    /// Meant for underlying tokens and native gas; minting hTokens or global
    /// tokens this way breaks conservation.
    pub fn fund(
        &mut self,
        chain: ChainId,
        token: Address,
        holder: Address,
        amount: U256,
    ) -> Result<(), BridgeAgentError> {
        if chain == self.config.hub_chain {
            return self
                .hub
                .transact(|s| Ok(s.ledger.mint(token, holder, amount)?));
        }
        self.branches
            .get_mut(&chain)
            .ok_or(BridgeAgentError::UnrecognizedChain(chain))?
            .transact(|s| Ok(s.ledger.mint(token, holder, amount)?))
    }

    /// Accounting snapshot of `token`.
    pub fn audit(&self, token: &TokenInfo) -> TokenAudit {
        let hub_ledger = self.hub.ledger();
        let root_port = self.hub.port();
        let mut chains = BTreeMap::new();
        for (&chain, local) in &token.locals {
            let (locked, h_supply) = match self.branches.get(&chain) {
                Some(branch) => (
                    branch
                        .ledger()
                        .balance_of(local.underlying, branch.port().address()),
                    branch.ledger().total_supply(local.h_token),
                ),
                None => (U256::zero(), U256::zero()),
            };
            chains.insert(
                chain,
                (root_port.chain_balance(token.global, chain), locked, h_supply),
            );
        }
        TokenAudit {
            hub_supply: hub_ledger.total_supply(token.global),
            custody: hub_ledger.balance_of(token.global, root_port.address()),
            chains,
        }
    }

    // =========================================================================
    // DELIVERY
    // =========================================================================

    /// Deliver the next queued envelope, followed by its fallback when the
    /// execution fails and asked for one. `None` when the queue is empty.
    pub fn deliver_next(&mut self) -> Option<Delivery> {
        let envelope = self.transport.next()?;
        let report = self.route_execute(&envelope).unwrap_or_else(|| {
            warn!(
                "[uo-03] envelope {} addressed to unknown chain {}",
                envelope.id, envelope.to_chain
            );
            ExecutionReport::failed(format!("unknown chain {}", envelope.to_chain))
        });
        let execute = DeliveryRecord::new(
            &envelope,
            DeliveryKind::Execute,
            report.success,
            report.reason.clone(),
        );
        self.log.push(execute.clone());

        let fallback = (!report.success && envelope.fallback).then(|| {
            let record = match self.route_fallback(&envelope) {
                Ok(()) => DeliveryRecord::new(
                    &envelope,
                    DeliveryKind::Fallback,
                    true,
                    "fallback delivered".into(),
                ),
                Err(err) => {
                    warn!("[uo-03] fallback for envelope {} failed: {}", envelope.id, err);
                    DeliveryRecord::new(&envelope, DeliveryKind::Fallback, false, err.to_string())
                }
            };
            self.log.push(record.clone());
            record
        });
        Some(Delivery { execute, fallback })
    }

    /// Deliver until the queue is empty or `max_deliveries` is reached.
    /// Returns the number of envelopes delivered.
    pub fn run_until_idle(&mut self) -> usize {
        let mut delivered = 0;
        while delivered < self.config.max_deliveries && self.deliver_next().is_some() {
            delivered += 1;
        }
        if self.transport.pending() > 0 {
            warn!(
                "[uo-03] stopped after {} deliveries with {} pending",
                delivered,
                self.transport.pending()
            );
        }
        delivered
    }

    fn route_execute(&mut self, envelope: &Envelope) -> Option<ExecutionReport> {
        if envelope.to_chain == self.config.hub_chain {
            return Some(self.hub.deliver_execute(envelope));
        }
        self.branches
            .get_mut(&envelope.to_chain)
            .map(|branch| branch.deliver_execute(envelope))
    }

    fn route_fallback(&mut self, envelope: &Envelope) -> Result<(), BridgeAgentError> {
        if envelope.from_chain == self.config.hub_chain {
            return self.hub.deliver_fallback(envelope);
        }
        self.branches
            .get_mut(&envelope.from_chain)
            .ok_or(BridgeAgentError::UnrecognizedChain(envelope.from_chain))?
            .deliver_fallback(envelope)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::routers::ForwardingRootRouter;

    fn router() -> Arc<dyn RootRouter> {
        Arc::new(ForwardingRootRouter::new(chain_address("root-router", 1)))
    }

    #[test]
    fn test_default_network_builds() {
        assert!(LocalNetwork::new(NetworkConfig::default(), router()).is_ok());
    }

    #[test]
    fn test_reserve_that_cannot_pay_a_fallback_is_rejected() {
        let mut config = NetworkConfig::default();
        config.branch_gas.min_fallback_reserve = 1_000;
        assert!(matches!(
            LocalNetwork::new(config, router()),
            Err(BridgeAgentError::InvalidGasConfig(_))
        ));

        let mut config = NetworkConfig::default();
        config.root_gas.fallback_overhead = config.root_gas.min_fallback_reserve;
        assert!(matches!(
            LocalNetwork::new(config, router()),
            Err(BridgeAgentError::InvalidGasConfig(_))
        ));
    }

    #[test]
    fn test_empty_queue_delivers_nothing() {
        let mut network = LocalNetwork::new(NetworkConfig::default(), router()).unwrap();
        assert_eq!(network.deliver_next(), None);
        assert!(network.deliveries().is_empty());
    }
}
