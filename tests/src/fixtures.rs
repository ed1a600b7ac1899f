//! # Shared Fixtures
//!
//! A hub (chain 1) with two branches (2 and 3), one token registered
//! everywhere, and a funded user on each branch.

use std::collections::BTreeMap;
use std::sync::Arc;

use shared_types::{Address, ChainId, Nonce, TxContext, U256};
use uo_02_messaging::{AssetTransfer, DepositInput};
use uo_03_bridge_agents::{
    chain_address, BridgeAgentError, Entry, ForwardingRootRouter, GasPoolSeed, LocalNetwork,
    NetworkConfig, RecordStatus, RecordingBranchRouter, RouterInstruction, TokenInfo,
};

/// Hub chain.
pub const HUB: ChainId = 1;
/// Origin branch.
pub const BRANCH_A: ChainId = 2;
/// Destination branch.
pub const BRANCH_B: ChainId = 3;

/// Native attached to a deposit that the hub can execute and settle.
pub const FUNDED_VALUE: u64 = 2_000_000;
/// Remote gas set aside out of [`FUNDED_VALUE`].
pub const FUNDED_REMOTE_GAS: u128 = 1_000_000;
/// Clears the branch reserve (185_000) but not the hub's execution cost.
pub const UNDERFUNDED_VALUE: u64 = 300_000;

/// Underlying and native each user starts with on every branch.
const USER_UNDERLYING: u64 = 1_000_000;
const USER_NATIVE: u64 = 1_000_000_000;

/// Network plus handles the tests assert against.
pub struct TestNet {
    /// The network.
    pub net: LocalNetwork,
    /// Token registered on the hub and both branches.
    pub token: TokenInfo,
    /// Branch routers by chain.
    pub routers: BTreeMap<ChainId, Arc<RecordingBranchRouter>>,
    /// Funded user.
    pub user: Address,
}

impl TestNet {
    /// Fresh network with a funded user.
    pub fn new() -> Self {
        let root_router = Arc::new(ForwardingRootRouter::new(chain_address("root-router", HUB)));
        let mut net = LocalNetwork::new(NetworkConfig::default(), root_router).unwrap();
        let mut routers = BTreeMap::new();
        for chain in [BRANCH_A, BRANCH_B] {
            let router = Arc::new(RecordingBranchRouter::new(chain_address("router", chain)));
            net.add_branch(chain, router.clone(), GasPoolSeed::default())
                .unwrap();
            routers.insert(chain, router);
        }
        let token = net.add_token("USDU", &[BRANCH_A, BRANCH_B]).unwrap();
        let user = Address::derive(b"tests/user");
        for chain in [BRANCH_A, BRANCH_B] {
            let local = token.local(chain).unwrap();
            net.fund(chain, local.underlying, user, U256::from(USER_UNDERLYING))
                .unwrap();
            net.fund(chain, Address::NATIVE, user, U256::from(USER_NATIVE))
                .unwrap();
        }
        Self {
            net,
            token,
            routers,
            user,
        }
    }

    /// Forward everything cleared to the user on `to_chain`.
    pub fn forward_to(&self, to_chain: ChainId, params: &[u8]) -> Vec<u8> {
        RouterInstruction::Forward {
            recipient: self.user,
            to_chain,
            release_underlying: false,
            refundee: self.user,
            params: params.to_vec(),
            fallback: true,
        }
        .to_params()
        .unwrap()
    }

    /// Bridge `amount` underlying from `chain` to the hub.
    pub fn deposit(
        &mut self,
        chain: ChainId,
        amount: u64,
        value: u64,
        remote_gas: u128,
        params: Vec<u8>,
    ) -> Result<Nonce, BridgeAgentError> {
        let local = self.token.local(chain).unwrap();
        let ctx = TxContext::new(self.user).with_value(value);
        let input = DepositInput {
            asset: AssetTransfer {
                h_token: local.h_token,
                token: local.underlying,
                amount: U256::from(amount),
                deposit: U256::from(amount),
            },
            to_chain: HUB,
        };
        self.net.branch_mut(chain).unwrap().transact(|s| {
            s.agent
                .call_out_and_bridge(&mut s.ledger, &s.port, &ctx, params, input, remote_gas)
        })
    }

    /// Redeem a failed deposit as the user.
    pub fn redeem(&mut self, chain: ChainId, nonce: Nonce) -> Result<(), BridgeAgentError> {
        let ctx = TxContext::new(self.user);
        self.net
            .branch_mut(chain)
            .unwrap()
            .transact(|s| s.agent.redeem_deposit(&mut s.ledger, &s.port, &ctx, nonce))
    }

    /// Ask the hub to confirm a deposit never executed.
    pub fn retrieve(&mut self, chain: ChainId, nonce: Nonce) -> Result<(), BridgeAgentError> {
        let ctx = TxContext::new(self.user);
        self.net
            .branch_mut(chain)
            .unwrap()
            .transact(|s| s.agent.retrieve_deposit(&mut s.ledger, &ctx, nonce))
    }

    /// Status of deposit `nonce` on `chain`; `None` once redeemed or if absent.
    pub fn deposit_status(&self, chain: ChainId, nonce: Nonce) -> Option<RecordStatus> {
        match self.net.branch(chain).unwrap().agent().deposit(nonce) {
            Entry::Live(d) => Some(d.status),
            _ => None,
        }
    }

    /// Underlying balance of the user on `chain`.
    pub fn underlying(&self, chain: ChainId) -> U256 {
        let local = self.token.local(chain).unwrap();
        self.net
            .branch(chain)
            .unwrap()
            .ledger()
            .balance_of(local.underlying, self.user)
    }

    /// hToken balance of the user on `chain`.
    pub fn h_balance(&self, chain: ChainId) -> U256 {
        let local = self.token.local(chain).unwrap();
        self.net
            .branch(chain)
            .unwrap()
            .ledger()
            .balance_of(local.h_token, self.user)
    }

    /// Underlying locked in the branch port on `chain`.
    pub fn locked(&self, chain: ChainId) -> U256 {
        let local = self.token.local(chain).unwrap();
        let branch = self.net.branch(chain).unwrap();
        branch
            .ledger()
            .balance_of(local.underlying, branch.port().address())
    }
}

impl Default for TestNet {
    fn default() -> Self {
        Self::new()
    }
}

/// Starting underlying balance of the user.
pub fn starting_underlying() -> U256 {
    U256::from(USER_UNDERLYING)
}
