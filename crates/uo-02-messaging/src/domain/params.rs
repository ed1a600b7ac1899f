//! # Parameter Types
//!
//! Inputs users hand to the agents, and the parameter views handed to routers
//! after token clearance.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Nonce, U256};

use super::errors::CodecError;

/// Maximum number of assets in one multi-asset message.
pub const MAX_TOKENS_PER_MESSAGE: usize = u8::MAX as usize;

/// One asset leg of a bridge: `amount` total value, `deposit` of which is
/// backed by underlying. The rest is pure hToken movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetTransfer {
    /// Local hToken on the chain the value leaves (or global at the hub).
    pub h_token: Address,
    /// Underlying token on that chain.
    pub token: Address,
    /// Total value bridged.
    pub amount: U256,
    /// Underlying-backed portion, `deposit <= amount`.
    pub deposit: U256,
}

impl AssetTransfer {
    /// True if `deposit <= amount`.
    pub fn is_well_formed(&self) -> bool {
        self.deposit <= self.amount
    }

    /// Zip parallel arrays into transfers.
    pub fn zip(
        h_tokens: &[Address],
        tokens: &[Address],
        amounts: &[U256],
        deposits: &[U256],
    ) -> Result<Vec<AssetTransfer>, CodecError> {
        let n = h_tokens.len();
        if tokens.len() != n || amounts.len() != n || deposits.len() != n {
            return Err(CodecError::ArrayLengthMismatch);
        }
        if n > MAX_TOKENS_PER_MESSAGE {
            return Err(CodecError::TooManyTokens(n));
        }
        Ok((0..n)
            .map(|i| AssetTransfer {
                h_token: h_tokens[i],
                token: tokens[i],
                amount: amounts[i],
                deposit: deposits[i],
            })
            .collect())
    }
}

/// User input for a single-asset bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositInput {
    /// Asset leg.
    pub asset: AssetTransfer,
    /// Destination chain of the value.
    pub to_chain: ChainId,
}

/// User input for a multi-asset bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMultipleInput {
    /// Asset legs.
    pub assets: Vec<AssetTransfer>,
    /// Destination chain of the value.
    pub to_chain: ChainId,
}

/// Gas attached to a root-bound message, in the origin chain's native units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GasParams {
    /// Native value deposited by the user on the origin chain.
    pub deposited_gas: u128,
    /// Portion to forward for execution on the final destination.
    pub remote_execution_gas: u128,
}

/// Router view of a single-asset deposit cleared at the hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositParams {
    /// Deposit nonce on the origin branch.
    pub deposit_nonce: Nonce,
    /// Global token credited.
    pub h_token: Address,
    /// Underlying token on the origin chain.
    pub token: Address,
    /// Total value.
    pub amount: U256,
    /// Underlying-backed portion.
    pub deposit: U256,
    /// Destination chain requested by the user.
    pub to_chain: ChainId,
}

/// Router view of a multi-asset deposit cleared at the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMultipleParams {
    /// Deposit nonce on the origin branch.
    pub deposit_nonce: Nonce,
    /// Global tokens credited, aligned with `assets`.
    pub global_tokens: Vec<Address>,
    /// Legs as sent by the branch.
    pub assets: Vec<AssetTransfer>,
    /// Destination chain requested by the user.
    pub to_chain: ChainId,
}

/// Branch router view of a single-asset settlement cleared on the branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementParams {
    /// Settlement nonce at the hub.
    pub settlement_nonce: Nonce,
    /// Recipient of the cleared tokens.
    pub recipient: Address,
    /// Asset leg, expressed in this branch's tokens.
    pub asset: AssetTransfer,
}

/// Branch router view of a multi-asset settlement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettlementMultipleParams {
    /// Settlement nonce at the hub.
    pub settlement_nonce: Nonce,
    /// Recipient of the cleared tokens.
    pub recipient: Address,
    /// Asset legs, expressed in this branch's tokens.
    pub assets: Vec<AssetTransfer>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zip_rejects_mismatch() {
        let a = Address::from_low_u64_be(1);
        let err = AssetTransfer::zip(&[a, a], &[a], &[U256::one()], &[U256::zero()]).unwrap_err();
        assert_eq!(err, CodecError::ArrayLengthMismatch);
    }

    #[test]
    fn test_zip_builds_transfers() {
        let h = Address::from_low_u64_be(1);
        let t = Address::from_low_u64_be(2);
        let legs = AssetTransfer::zip(&[h], &[t], &[U256::from(10)], &[U256::from(4)]).unwrap();
        assert_eq!(legs.len(), 1);
        assert!(legs[0].is_well_formed());
        assert_eq!(legs[0].amount - legs[0].deposit, U256::from(6));
    }
}
