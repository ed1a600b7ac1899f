//! # Root Port
//!
//! Hub-side source of truth for token identity and canonical supply.
//!
//! ## Accounting
//!
//! Every unit of a global token's supply is attributed to the chain whose
//! branch port holds the underlying that backs it (`chain_balance`). Minting
//! adds to the attribution of the chain the value arrived from; burning is
//! only allowed up to the attribution of the chain the value leaves to. The
//! port also holds global tokens in custody for hTokens outstanding on
//! branches (`amount - deposit` legs).
//!
//! ## Roles
//!
//! | Role | Calls |
//! |------|-------|
//! | owner | `add_bridge_agent`, `toggle_bridge_agent`, `set_local_branch_port`, registry |
//! | [`Role::BridgeAgent`] | `bridge_to_root`, `escrow`, `burn`, virtual account approvals |
//! | [`Role::LocalBranchPort`] | `*_local_branch*` |

use std::collections::{BTreeMap, HashMap};

use shared_types::{Address, ChainId, TokenLedger, U256};
use tracing::{debug, info};

use super::capability::{Capability, Role};
use super::errors::PortError;
use super::registry::TokenRegistry;
use super::virtual_account::{VirtualAccount, VirtualAccountDirectory};

/// Hub-side port.
#[derive(Debug, Clone)]
pub struct RootPort {
    address: Address,
    owner: Address,
    hub_chain: ChainId,
    bridge_agents: HashMap<Address, bool>,
    local_branch_port: Option<Address>,
    registry: TokenRegistry,
    chain_balances: BTreeMap<(Address, ChainId), U256>,
    virtual_accounts: VirtualAccountDirectory,
}

impl RootPort {
    /// New port at `address` on the hub chain.
    pub fn new(address: Address, owner: Address, hub_chain: ChainId) -> Self {
        Self {
            address,
            owner,
            hub_chain,
            bridge_agents: HashMap::new(),
            local_branch_port: None,
            registry: TokenRegistry::new(),
            chain_balances: BTreeMap::new(),
            virtual_accounts: VirtualAccountDirectory::default(),
        }
    }

    /// Port address (custody account in the hub ledger).
    pub fn address(&self) -> Address {
        self.address
    }

    /// Hub chain id.
    pub fn hub_chain(&self) -> ChainId {
        self.hub_chain
    }

    /// Token identity registry.
    pub fn registry(&self) -> &TokenRegistry {
        &self.registry
    }

    // =========================================================================
    // ADMINISTRATION
    // =========================================================================

    /// Register a bridge agent and issue its capability.
    pub fn add_bridge_agent(
        &mut self,
        caller: Address,
        agent: Address,
    ) -> Result<Capability, PortError> {
        self.only_owner(caller)?;
        if self.bridge_agents.contains_key(&agent) {
            return Err(PortError::AlreadyAdded(format!("bridge agent {agent}")));
        }
        self.bridge_agents.insert(agent, true);
        info!("[uo-01] root port registered bridge agent {}", agent);
        Ok(Capability::new(agent, self.address, Role::BridgeAgent))
    }

    /// Flip an agent between active and inactive.
    pub fn toggle_bridge_agent(&mut self, caller: Address, agent: Address) -> Result<bool, PortError> {
        self.only_owner(caller)?;
        let active = self
            .bridge_agents
            .get_mut(&agent)
            .ok_or(PortError::UnrecognizedBridgeAgent(agent))?;
        *active = !*active;
        Ok(*active)
    }

    /// True if `agent` is registered and active.
    pub fn is_bridge_agent(&self, agent: Address) -> bool {
        self.bridge_agents.get(&agent).copied().unwrap_or(false)
    }

    /// Designate the hub's own branch port.
    pub fn set_local_branch_port(
        &mut self,
        caller: Address,
        branch_port: Address,
    ) -> Result<Capability, PortError> {
        self.only_owner(caller)?;
        if self.local_branch_port.is_some() {
            return Err(PortError::AlreadyAdded("local branch port".into()));
        }
        self.local_branch_port = Some(branch_port);
        Ok(Capability::new(branch_port, self.address, Role::LocalBranchPort))
    }

    /// Register a branch chain and its gas global token.
    pub fn add_new_chain(
        &mut self,
        caller: Address,
        chain: ChainId,
        gas_global: Address,
    ) -> Result<(), PortError> {
        self.only_owner(caller)?;
        if chain == self.hub_chain {
            return Err(PortError::InvalidInputParams("hub chain is implicit".into()));
        }
        self.registry.add_chain(chain, gas_global)?;
        info!("[uo-01] root port added chain {} (gas token {})", chain, gas_global);
        Ok(())
    }

    /// Register a new global token.
    pub fn add_global_token(&mut self, caller: Address, global: Address) -> Result<(), PortError> {
        self.only_owner(caller)?;
        self.registry.add_global(global)
    }

    /// Map `global` to `local` (backed by `underlying`) on `chain`.
    pub fn add_local_token(
        &mut self,
        caller: Address,
        global: Address,
        local: Address,
        underlying: Address,
        chain: ChainId,
    ) -> Result<(), PortError> {
        self.only_owner(caller)?;
        self.registry.add_local(global, local, underlying, chain)
    }

    // =========================================================================
    // LOOKUPS
    // =========================================================================

    /// True if `token` is a global token.
    pub fn is_global_address(&self, token: Address) -> bool {
        self.registry.is_global(token)
    }

    /// True if `chain` is a registered branch chain.
    pub fn is_chain_id(&self, chain: ChainId) -> bool {
        self.registry.is_chain(chain)
    }

    /// Global token for `local` on `chain`.
    pub fn get_global_token_from_local(
        &self,
        local: Address,
        chain: ChainId,
    ) -> Result<Address, PortError> {
        self.registry
            .global_from_local(local, chain)
            .ok_or(PortError::UnrecognizedLocalAddress { local, chain })
    }

    /// Local token for `global` on `chain`.
    pub fn get_local_token_from_global(
        &self,
        global: Address,
        chain: ChainId,
    ) -> Result<Address, PortError> {
        self.registry
            .local_from_global(global, chain)
            .ok_or(PortError::UnrecognizedToken(global))
    }

    /// Local token for `underlying` on `chain`.
    pub fn get_local_token_from_underlying(
        &self,
        underlying: Address,
        chain: ChainId,
    ) -> Result<Address, PortError> {
        self.registry
            .local_from_underlying(underlying, chain)
            .ok_or(PortError::UnrecognizedUnderlyingAddress { underlying, chain })
    }

    /// Underlying token behind `local` on `chain`.
    pub fn get_underlying_token_from_local(
        &self,
        local: Address,
        chain: ChainId,
    ) -> Result<Address, PortError> {
        self.registry
            .underlying_from_local(local, chain)
            .ok_or(PortError::UnrecognizedLocalAddress { local, chain })
    }

    /// Gas global token of `chain`.
    pub fn gas_global_token(&self, chain: ChainId) -> Result<Address, PortError> {
        self.registry
            .gas_global(chain)
            .ok_or(PortError::UnrecognizedChain(chain))
    }

    /// Supply of `global` attributed to `chain`.
    pub fn chain_balance(&self, global: Address, chain: ChainId) -> U256 {
        self.chain_balances
            .get(&(global, chain))
            .copied()
            .unwrap_or_default()
    }

    /// All `(chain, balance)` attributions for `global`.
    pub fn chain_balances(&self, global: Address) -> Vec<(ChainId, U256)> {
        self.chain_balances
            .iter()
            .filter(|((token, _), _)| *token == global)
            .map(|((_, chain), balance)| (*chain, *balance))
            .collect()
    }

    // =========================================================================
    // BRIDGE AGENT CALLS
    // =========================================================================

    /// Settle value arriving from `from_chain`: release `amount - deposit`
    /// from custody and mint `deposit` attributed to `from_chain`.
    #[allow(clippy::too_many_arguments)]
    pub fn bridge_to_root(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        recipient: Address,
        global: Address,
        amount: U256,
        deposit: U256,
        from_chain: ChainId,
    ) -> Result<(), PortError> {
        self.require(cap, Role::BridgeAgent)?;
        if !self.registry.is_global(global) {
            return Err(PortError::UnrecognizedToken(global));
        }
        if deposit > amount {
            return Err(PortError::InvalidInputParams(format!(
                "deposit {deposit} exceeds amount {amount}"
            )));
        }
        let custody = amount - deposit;
        if !custody.is_zero() {
            ledger.transfer(global, self.address, recipient, custody)?;
        }
        if !deposit.is_zero() {
            self.mint(ledger, recipient, global, deposit, from_chain)?;
        }
        debug!(
            "[uo-01] bridge_to_root {} of {} from chain {} (minted {})",
            amount, global, from_chain, deposit
        );
        Ok(())
    }

    /// Take `amount` of `global` from `from` into custody.
    pub fn escrow(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        from: Address,
        global: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require(cap, Role::BridgeAgent)?;
        ledger.transfer(global, from, self.address, amount)?;
        Ok(())
    }

    /// Burn `amount` of `global` from `from`, reducing `chain`'s attribution.
    pub fn burn(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        from: Address,
        global: Address,
        amount: U256,
        chain: ChainId,
    ) -> Result<(), PortError> {
        self.require(cap, Role::BridgeAgent)?;
        self.burn_attributed(ledger, from, global, amount, chain)
    }

    // =========================================================================
    // LOCAL BRANCH PORT CALLS
    // =========================================================================

    /// Move hub-local hTokens into root custody.
    pub fn bridge_to_root_from_local_branch(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        from: Address,
        global: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require(cap, Role::LocalBranchPort)?;
        ledger.transfer(global, from, self.address, amount)?;
        Ok(())
    }

    /// Release custody to a hub-local recipient.
    pub fn bridge_to_local_branch_from_root(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        to: Address,
        global: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require(cap, Role::LocalBranchPort)?;
        ledger.transfer(global, self.address, to, amount)?;
        Ok(())
    }

    /// Burn against the hub chain's attribution.
    pub fn burn_from_local_branch(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        from: Address,
        global: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require(cap, Role::LocalBranchPort)?;
        let hub = self.hub_chain;
        self.burn_attributed(ledger, from, global, amount, hub)
    }

    /// Mint attributed to the hub chain.
    pub fn mint_to_local_branch(
        &mut self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        to: Address,
        global: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require(cap, Role::LocalBranchPort)?;
        let hub = self.hub_chain;
        self.mint(ledger, to, global, amount, hub)
    }

    // =========================================================================
    // VIRTUAL ACCOUNTS
    // =========================================================================

    /// Fetch (creating on first use) the virtual account address of `user`.
    pub fn fetch_virtual_account(&mut self, user: Address) -> Address {
        self.virtual_accounts.fetch(user).address
    }

    /// Existing virtual account of `user`.
    pub fn get_user_account(&self, user: Address) -> Option<&VirtualAccount> {
        self.virtual_accounts.get(user)
    }

    /// Flip `router`'s approval on `user`'s virtual account. Returns the new state.
    pub fn toggle_virtual_account_approved(
        &mut self,
        cap: &Capability,
        user: Address,
        router: Address,
    ) -> Result<bool, PortError> {
        self.require(cap, Role::BridgeAgent)?;
        let account = self.virtual_accounts.fetch(user);
        let approved = if account.approved_routers.remove(&router) {
            false
        } else {
            account.approved_routers.insert(router);
            true
        };
        debug!("[uo-01] router {} approval on {} -> {}", router, user, approved);
        Ok(approved)
    }

    /// True if `router` may operate `user`'s virtual account.
    pub fn is_router_approved(&self, user: Address, router: Address) -> bool {
        self.virtual_accounts
            .get(user)
            .map(|a| a.approved_routers.contains(&router))
            .unwrap_or(false)
    }

    /// Owner of the virtual account at `address`.
    pub fn virtual_account_owner(&self, address: Address) -> Option<Address> {
        self.virtual_accounts.owner_of(address)
    }

    /// Withdraw from `user`'s virtual account to `caller`.
    pub fn virtual_account_withdraw(
        &mut self,
        ledger: &mut TokenLedger,
        caller: Address,
        user: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        let account = self
            .virtual_accounts
            .get(user)
            .ok_or(PortError::UnauthorizedCaller(caller))?;
        if !account.is_approved_caller(caller) {
            return Err(PortError::UnauthorizedCaller(caller));
        }
        ledger.transfer(token, account.address, caller, amount)?;
        Ok(())
    }

    // =========================================================================
    // INTERNAL
    // =========================================================================

    fn mint(
        &mut self,
        ledger: &mut TokenLedger,
        to: Address,
        global: Address,
        amount: U256,
        chain: ChainId,
    ) -> Result<(), PortError> {
        let attributed = self
            .chain_balance(global, chain)
            .checked_add(amount)
            .ok_or(shared_types::MathError::Overflow)?;
        ledger.mint(global, to, amount)?;
        self.chain_balances.insert((global, chain), attributed);
        Ok(())
    }

    fn burn_attributed(
        &mut self,
        ledger: &mut TokenLedger,
        from: Address,
        global: Address,
        amount: U256,
        chain: ChainId,
    ) -> Result<(), PortError> {
        let available = self.chain_balance(global, chain);
        if available < amount {
            return Err(PortError::InsufficientBalanceForSettlement {
                token: global,
                chain,
                available,
                required: amount,
            });
        }
        ledger.burn(global, from, amount)?;
        self.chain_balances.insert((global, chain), available - amount);
        Ok(())
    }

    fn only_owner(&self, caller: Address) -> Result<(), PortError> {
        if caller != self.owner {
            return Err(PortError::UnauthorizedCaller(caller));
        }
        Ok(())
    }

    fn require(&self, cap: &Capability, role: Role) -> Result<(), PortError> {
        if cap.port() != self.address || cap.role() != role {
            return Err(PortError::UnauthorizedCaller(cap.holder()));
        }
        match role {
            Role::BridgeAgent if !self.is_bridge_agent(cap.holder()) => {
                Err(PortError::UnrecognizedBridgeAgent(cap.holder()))
            }
            Role::LocalBranchPort if self.local_branch_port != Some(cap.holder()) => {
                Err(PortError::UnauthorizedCaller(cap.holder()))
            }
            _ => Ok(()),
        }
    }
}
