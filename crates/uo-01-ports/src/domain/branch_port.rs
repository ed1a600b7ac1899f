//! # Branch Port
//!
//! Custody of underlying assets and issuance of hTokens on a spoke chain.
//!
//! | Call | Effect |
//! |------|--------|
//! | `bridge_out` | burn `amount - deposit` hTokens, pull `deposit` underlying into the port |
//! | `bridge_in` | mint hTokens to the recipient |
//! | `withdraw` | release underlying from the port |
//!
//! All three require a [`Capability`] with [`Role::BridgeAgent`].

use std::collections::HashMap;

use shared_types::{Address, ChainId, TokenLedger, U256};
use tracing::debug;

use super::capability::{Capability, Role};
use super::errors::PortError;

/// Branch-side port.
#[derive(Debug, Clone)]
pub struct BranchPort {
    address: Address,
    owner: Address,
    chain: ChainId,
    /// Registered agents and whether they are active.
    bridge_agents: HashMap<Address, bool>,
    /// hToken -> underlying.
    local_tokens: HashMap<Address, Address>,
}

impl BranchPort {
    /// New port at `address` on `chain`, administered by `owner`.
    pub fn new(address: Address, owner: Address, chain: ChainId) -> Self {
        Self {
            address,
            owner,
            chain,
            bridge_agents: HashMap::new(),
            local_tokens: HashMap::new(),
        }
    }

    /// Port address (custody account in the ledger).
    pub fn address(&self) -> Address {
        self.address
    }

    /// Chain this port lives on.
    pub fn chain(&self) -> ChainId {
        self.chain
    }

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
        debug!("[uo-01] branch {} registered bridge agent {}", self.chain, agent);
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

    /// Register an hToken backed by `underlying`.
    pub fn add_local_token(
        &mut self,
        caller: Address,
        h_token: Address,
        underlying: Address,
    ) -> Result<(), PortError> {
        self.only_owner(caller)?;
        if h_token.is_zero() || underlying.is_zero() {
            return Err(PortError::InvalidInputParams("zero token address".into()));
        }
        if self.local_tokens.contains_key(&h_token) {
            return Err(PortError::AlreadyAdded(format!("hToken {h_token}")));
        }
        self.local_tokens.insert(h_token, underlying);
        Ok(())
    }

    /// Underlying token behind `h_token`.
    pub fn underlying_of(&self, h_token: Address) -> Option<Address> {
        self.local_tokens.get(&h_token).copied()
    }

    /// Lock value leaving this chain.
    #[allow(clippy::too_many_arguments)]
    pub fn bridge_out(
        &self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        depositor: Address,
        h_token: Address,
        token: Address,
        amount: U256,
        deposit: U256,
    ) -> Result<(), PortError> {
        self.require_agent(cap)?;
        if deposit > amount {
            return Err(PortError::InvalidInputParams(format!(
                "deposit {deposit} exceeds amount {amount}"
            )));
        }
        let h_amount = amount - deposit;
        if !h_amount.is_zero() {
            self.require_h_token(h_token)?;
            ledger.burn(h_token, depositor, h_amount)?;
        }
        if !deposit.is_zero() {
            self.require_underlying(h_token, token)?;
            ledger.transfer(token, depositor, self.address, deposit)?;
        }
        debug!(
            "[uo-01] branch {} bridge_out {} (deposit {}) of {}",
            self.chain, amount, deposit, h_token
        );
        Ok(())
    }

    /// Lock several assets at once. Slices must have equal length.
    pub fn bridge_out_multiple(
        &self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        depositor: Address,
        h_tokens: &[Address],
        tokens: &[Address],
        amounts: &[U256],
        deposits: &[U256],
    ) -> Result<(), PortError> {
        let n = h_tokens.len();
        if tokens.len() != n || amounts.len() != n || deposits.len() != n {
            return Err(PortError::InvalidInputParams("array length mismatch".into()));
        }
        for i in 0..n {
            self.bridge_out(
                ledger,
                cap,
                depositor,
                h_tokens[i],
                tokens[i],
                amounts[i],
                deposits[i],
            )?;
        }
        Ok(())
    }

    /// Mint hTokens arriving from the hub.
    pub fn bridge_in(
        &self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        recipient: Address,
        h_token: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require_agent(cap)?;
        if amount.is_zero() {
            return Ok(());
        }
        self.require_h_token(h_token)?;
        ledger.mint(h_token, recipient, amount)?;
        Ok(())
    }

    /// Mint several hTokens.
    pub fn bridge_in_multiple(
        &self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        recipient: Address,
        h_tokens: &[Address],
        amounts: &[U256],
    ) -> Result<(), PortError> {
        if h_tokens.len() != amounts.len() {
            return Err(PortError::InvalidInputParams("array length mismatch".into()));
        }
        for (h_token, amount) in h_tokens.iter().zip(amounts) {
            self.bridge_in(ledger, cap, recipient, *h_token, *amount)?;
        }
        Ok(())
    }

    /// Release underlying held by the port.
    pub fn withdraw(
        &self,
        ledger: &mut TokenLedger,
        cap: &Capability,
        recipient: Address,
        token: Address,
        amount: U256,
    ) -> Result<(), PortError> {
        self.require_agent(cap)?;
        ledger.transfer(token, self.address, recipient, amount)?;
        Ok(())
    }

    fn only_owner(&self, caller: Address) -> Result<(), PortError> {
        if caller != self.owner {
            return Err(PortError::UnauthorizedCaller(caller));
        }
        Ok(())
    }

    fn require_agent(&self, cap: &Capability) -> Result<(), PortError> {
        if cap.port() != self.address || cap.role() != Role::BridgeAgent {
            return Err(PortError::UnauthorizedCaller(cap.holder()));
        }
        if !self.is_bridge_agent(cap.holder()) {
            return Err(PortError::UnrecognizedBridgeAgent(cap.holder()));
        }
        Ok(())
    }

    fn require_h_token(&self, h_token: Address) -> Result<(), PortError> {
        if !self.local_tokens.contains_key(&h_token) {
            return Err(PortError::UnrecognizedLocalAddress {
                local: h_token,
                chain: self.chain,
            });
        }
        Ok(())
    }

    fn require_underlying(&self, h_token: Address, token: Address) -> Result<(), PortError> {
        if self.local_tokens.get(&h_token) != Some(&token) {
            return Err(PortError::UnrecognizedUnderlyingAddress {
                underlying: token,
                chain: self.chain,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: u64 = 1;
    const PORT: u64 = 2;
    const AGENT: u64 = 3;
    const USER: u64 = 4;
    const H_TOKEN: u64 = 10;
    const TOKEN: u64 = 11;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn setup() -> (BranchPort, Capability, TokenLedger) {
        let mut port = BranchPort::new(addr(PORT), addr(OWNER), 2);
        let cap = port.add_bridge_agent(addr(OWNER), addr(AGENT)).unwrap();
        port.add_local_token(addr(OWNER), addr(H_TOKEN), addr(TOKEN))
            .unwrap();
        let mut ledger = TokenLedger::new();
        ledger.mint(addr(TOKEN), addr(USER), U256::from(1_000)).unwrap();
        ledger.mint(addr(H_TOKEN), addr(USER), U256::from(50)).unwrap();
        (port, cap, ledger)
    }

    #[test]
    fn test_bridge_out_splits_deposit_and_burn() {
        let (port, cap, mut ledger) = setup();
        port.bridge_out(
            &mut ledger,
            &cap,
            addr(USER),
            addr(H_TOKEN),
            addr(TOKEN),
            U256::from(130),
            U256::from(100),
        )
        .unwrap();

        assert_eq!(ledger.balance_of(addr(TOKEN), addr(PORT)), U256::from(100));
        assert_eq!(ledger.balance_of(addr(H_TOKEN), addr(USER)), U256::from(20));
        assert_eq!(ledger.total_supply(addr(H_TOKEN)), U256::from(20));
    }

    #[test]
    fn test_bridge_out_rejects_deposit_above_amount() {
        let (port, cap, mut ledger) = setup();
        let err = port
            .bridge_out(
                &mut ledger,
                &cap,
                addr(USER),
                addr(H_TOKEN),
                addr(TOKEN),
                U256::from(10),
                U256::from(11),
            )
            .unwrap_err();
        assert!(matches!(err, PortError::InvalidInputParams(_)));
    }

    #[test]
    fn test_bridge_out_checks_underlying_pairing() {
        let (port, cap, mut ledger) = setup();
        let err = port
            .bridge_out(
                &mut ledger,
                &cap,
                addr(USER),
                addr(H_TOKEN),
                addr(99),
                U256::from(10),
                U256::from(10),
            )
            .unwrap_err();
        assert!(matches!(err, PortError::UnrecognizedUnderlyingAddress { .. }));
    }

    #[test]
    fn test_toggled_agent_loses_capability() {
        let (mut port, cap, mut ledger) = setup();
        assert!(!port.toggle_bridge_agent(addr(OWNER), addr(AGENT)).unwrap());
        let err = port
            .bridge_in(&mut ledger, &cap, addr(USER), addr(H_TOKEN), U256::one())
            .unwrap_err();
        assert_eq!(err, PortError::UnrecognizedBridgeAgent(addr(AGENT)));
    }

    #[test]
    fn test_foreign_capability_rejected() {
        let (port, _, mut ledger) = setup();
        let mut other = BranchPort::new(addr(77), addr(OWNER), 3);
        let foreign = other.add_bridge_agent(addr(OWNER), addr(AGENT)).unwrap();
        let err = port
            .withdraw(&mut ledger, &foreign, addr(USER), addr(TOKEN), U256::one())
            .unwrap_err();
        assert_eq!(err, PortError::UnauthorizedCaller(addr(AGENT)));
    }

    #[test]
    fn test_only_owner_adds_agents() {
        let (mut port, _, _) = setup();
        assert_eq!(
            port.add_bridge_agent(addr(USER), addr(5)).unwrap_err(),
            PortError::UnauthorizedCaller(addr(USER))
        );
    }
}
