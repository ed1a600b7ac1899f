//! # Chain Host
//!
//! One simulated chain: its ledger, its port and the bridge agent living on
//! it. Every entry point runs through [`ChainHost::transact`], which
//! snapshots the whole chain, runs the body and only releases the agent's
//! outbox to the transport when the body commits.
//!
//! Deliveries map agent results onto the transport's `(success, reason)`
//! contract:
//!
//! | Agent result | Report | Fallback sent |
//! |--------------|--------|---------------|
//! | `Ok(report)` | `report` | if `!report.success` |
//! | `Err(AlreadyExecuted)` | `(true, "already executed tx")` | no |
//! | other `Err` | `(false, reason)`, state reverted | if requested |

use std::fmt;
use std::sync::Arc;

use shared_types::context::DEFAULT_GAS_LIMIT;
use shared_types::{atomically, Address, ChainId, TokenLedger, TxContext, U256};
use tracing::warn;
use uo_02_messaging::{Envelope, Transport};

use crate::agents::{BranchBridgeAgent, RootBridgeAgent};
use crate::domain::entities::ExecutionReport;
use crate::domain::errors::{BridgeAgentError, ALREADY_EXECUTED};
use crate::metrics;
use crate::ports::inbound::CrossChainEndpoint;

/// Everything that lives on one chain.
pub struct ChainState<A: CrossChainEndpoint> {
    /// Balances of every token on the chain, native gas included.
    pub ledger: TokenLedger,
    /// The chain's port.
    pub port: A::Port,
    /// The chain's bridge agent.
    pub agent: A,
}

impl<A> Clone for ChainState<A>
where
    A: CrossChainEndpoint + Clone,
    A::Port: Clone,
{
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
            port: self.port.clone(),
            agent: self.agent.clone(),
        }
    }
}

impl<A> fmt::Debug for ChainState<A>
where
    A: CrossChainEndpoint + fmt::Debug,
    A::Port: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainState")
            .field("ledger", &self.ledger)
            .field("port", &self.port)
            .field("agent", &self.agent)
            .finish()
    }
}

/// A chain plus its connection to the transport.
pub struct ChainHost<A: CrossChainEndpoint> {
    state: ChainState<A>,
    transport: Arc<dyn Transport>,
    executor: Address,
    gas_price: U256,
    gas_limit: u64,
}

/// Spoke chain.
pub type BranchChain = ChainHost<BranchBridgeAgent>;

/// Hub chain.
pub type RootChain = ChainHost<RootBridgeAgent>;

impl<A> ChainHost<A>
where
    A: CrossChainEndpoint + Clone,
    A::Port: Clone,
{
    /// Host `state`, delivering as `executor` at gas price 1.
    pub fn new(state: ChainState<A>, transport: Arc<dyn Transport>, executor: Address) -> Self {
        Self {
            state,
            transport,
            executor,
            gas_price: U256::one(),
            gas_limit: DEFAULT_GAS_LIMIT,
        }
    }

    /// Override the gas price deliveries run at.
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = gas_price;
        self
    }

    /// Override the gas limit deliveries run with.
    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = gas_limit;
        self
    }

    /// Chain id.
    pub fn chain(&self) -> ChainId {
        self.state.agent.chain()
    }

    /// Current state.
    pub fn state(&self) -> &ChainState<A> {
        &self.state
    }

    /// Ledger.
    pub fn ledger(&self) -> &TokenLedger {
        &self.state.ledger
    }

    /// Port.
    pub fn port(&self) -> &A::Port {
        &self.state.port
    }

    /// Agent.
    pub fn agent(&self) -> &A {
        &self.state.agent
    }

    /// Transport executor account.
    pub fn executor(&self) -> Address {
        self.executor
    }

    /// Gas price deliveries run at.
    pub fn gas_price(&self) -> U256 {
        self.gas_price
    }

    /// Run one transaction. On `Err` the chain is left exactly as before;
    /// on `Ok` the agent's queued envelopes are handed to the transport.
    pub fn transact<T, F>(&mut self, body: F) -> Result<T, BridgeAgentError>
    where
        F: FnOnce(&mut ChainState<A>) -> Result<T, BridgeAgentError>,
    {
        let transport = Arc::clone(&self.transport);
        atomically(&mut self.state, |state| {
            let value = body(state)?;
            for envelope in state.agent.drain_outbox() {
                transport.send(envelope)?;
            }
            Ok(value)
        })
    }

    /// Deliver `envelope` to the agent's `any_execute`.
    pub fn deliver_execute(&mut self, envelope: &Envelope) -> ExecutionReport {
        let ctx = self.executor_context();
        let from_chain = envelope.from_chain;
        let result = self.transact(|s| {
            s.agent
                .any_execute(&mut s.ledger, &mut s.port, &ctx, from_chain, &envelope.payload)
        });
        match result {
            Ok(report) => report,
            Err(err) if err.is_already_executed() => {
                metrics::record_replay_rejected();
                warn!(
                    "[uo-03] chain {} rejected replay of envelope {}",
                    self.chain(),
                    envelope.id
                );
                ExecutionReport::done(ALREADY_EXECUTED)
            }
            Err(err) => {
                warn!(
                    "[uo-03] chain {} reverted envelope {}: {}",
                    self.chain(),
                    envelope.id,
                    err
                );
                if envelope.fallback {
                    if let Err(seal) = self.state.agent.seal_retrieve_only(from_chain, &envelope.payload) {
                        warn!("[uo-03] could not seal envelope {}: {}", envelope.id, seal);
                    }
                }
                ExecutionReport::failed(err.to_string())
            }
        }
    }

    /// Deliver the fallback for an envelope this chain sent.
    pub fn deliver_fallback(&mut self, envelope: &Envelope) -> Result<(), BridgeAgentError> {
        let ctx = self.executor_context();
        self.transact(|s| {
            s.agent
                .any_fallback(&mut s.ledger, &mut s.port, &ctx, &envelope.payload)
        })
    }

    fn executor_context(&self) -> TxContext {
        TxContext::new(self.executor)
            .with_gas_price(self.gas_price)
            .with_gas_limit(self.gas_limit)
    }
}

impl<A> fmt::Debug for ChainHost<A>
where
    A: CrossChainEndpoint + fmt::Debug,
    A::Port: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChainHost")
            .field("state", &self.state)
            .field("executor", &self.executor)
            .field("gas_price", &self.gas_price)
            .finish_non_exhaustive()
    }
}
