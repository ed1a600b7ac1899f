//! # Cross-Chain Messages
//!
//! Typed actions exchanged between branch and root agents. The byte layout
//! lives in [`crate::algorithms::codec`]; this module only names the actions.
//!
//! | Direction | Tag | Variant |
//! |-----------|-----|---------|
//! | branch -> root | 0x01 / 0x04 | `CallOut` (unsigned / signed) |
//! | branch -> root | 0x02 / 0x05 | `CallOutAndBridge` |
//! | branch -> root | 0x03 / 0x06 | `CallOutAndBridgeMultiple` |
//! | branch -> root | 0x07 | `RetrySettlement` |
//! | branch -> root | 0x08 | `RetrieveDeposit` |
//! | root -> branch | 0x00 | `NoSettlement` |
//! | root -> branch | 0x01 | `Settlement` |
//! | root -> branch | 0x02 | `SettlementMultiple` |
//! | root -> branch | 0x03 | `RetrieveSettlement` |
//!
//! The high bit of the tag (`0x80`) carries the fallback flag.

use serde::{Deserialize, Serialize};
use shared_types::{Address, ChainId, Nonce};

use super::params::{AssetTransfer, GasParams};

/// Tag bit requesting a fallback notification on failure.
pub const FALLBACK_FLAG: u8 = 0x80;

/// Branch -> root actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RootBoundMessage {
    /// Router call without value.
    CallOut {
        /// Set for signed calls: the user whose virtual account is used.
        signer: Option<Address>,
        /// Deposit nonce on the origin branch.
        nonce: Nonce,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Gas carried.
        gas: GasParams,
    },
    /// Router call with one asset leg.
    CallOutAndBridge {
        /// Set for signed calls.
        signer: Option<Address>,
        /// Deposit nonce.
        nonce: Nonce,
        /// Asset leg in the origin branch's tokens.
        asset: AssetTransfer,
        /// Destination chain requested.
        to_chain: ChainId,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Gas carried.
        gas: GasParams,
    },
    /// Router call with several asset legs.
    CallOutAndBridgeMultiple {
        /// Set for signed calls.
        signer: Option<Address>,
        /// Deposit nonce.
        nonce: Nonce,
        /// Asset legs.
        assets: Vec<AssetTransfer>,
        /// Destination chain requested.
        to_chain: ChainId,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Gas carried.
        gas: GasParams,
    },
    /// Ask the hub to resend a failed settlement with more gas.
    RetrySettlement {
        /// Settlement owner asking for the retry.
        signer: Address,
        /// Settlement to retry.
        settlement_nonce: Nonce,
        /// Gas-only deposit created on the branch for this request.
        deposit_nonce: Nonce,
        /// Gas carried.
        gas: GasParams,
    },
    /// Ask the hub to confirm a deposit never executed, so it can fall back.
    RetrieveDeposit {
        /// Deposit nonce.
        nonce: Nonce,
    },
}

impl RootBoundMessage {
    /// Deposit nonce this message is keyed on in the execution ledger.
    pub fn deposit_nonce(&self) -> Nonce {
        match self {
            Self::CallOut { nonce, .. }
            | Self::CallOutAndBridge { nonce, .. }
            | Self::CallOutAndBridgeMultiple { nonce, .. }
            | Self::RetrieveDeposit { nonce } => *nonce,
            Self::RetrySettlement { deposit_nonce, .. } => *deposit_nonce,
        }
    }

    /// Gas carried, if any.
    pub fn gas(&self) -> Option<GasParams> {
        match self {
            Self::CallOut { gas, .. }
            | Self::CallOutAndBridge { gas, .. }
            | Self::CallOutAndBridgeMultiple { gas, .. }
            | Self::RetrySettlement { gas, .. } => Some(*gas),
            Self::RetrieveDeposit { .. } => None,
        }
    }

    /// Short action name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CallOut { signer: None, .. } => "call_out",
            Self::CallOut { .. } => "call_out_signed",
            Self::CallOutAndBridge { signer: None, .. } => "call_out_and_bridge",
            Self::CallOutAndBridge { .. } => "call_out_and_bridge_signed",
            Self::CallOutAndBridgeMultiple { signer: None, .. } => "call_out_and_bridge_multiple",
            Self::CallOutAndBridgeMultiple { .. } => "call_out_and_bridge_multiple_signed",
            Self::RetrySettlement { .. } => "retry_settlement",
            Self::RetrieveDeposit { .. } => "retrieve_deposit",
        }
    }
}

/// Root -> branch actions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BranchBoundMessage {
    /// Router call without value.
    NoSettlement {
        /// Recipient of leftover gas.
        recipient: Address,
        /// Settlement nonce at the hub.
        nonce: Nonce,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Execution gas forwarded, in the branch's native units.
        remote_gas: u128,
    },
    /// Clear one asset leg then call the router.
    Settlement {
        /// Recipient.
        recipient: Address,
        /// Settlement nonce.
        nonce: Nonce,
        /// Asset leg in the destination branch's tokens.
        asset: AssetTransfer,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Execution gas forwarded.
        remote_gas: u128,
    },
    /// Clear several asset legs then call the router.
    SettlementMultiple {
        /// Recipient.
        recipient: Address,
        /// Settlement nonce.
        nonce: Nonce,
        /// Asset legs.
        assets: Vec<AssetTransfer>,
        /// Opaque router instructions.
        params: Vec<u8>,
        /// Execution gas forwarded.
        remote_gas: u128,
    },
    /// Ask the branch to confirm a settlement never executed.
    RetrieveSettlement {
        /// Settlement nonce.
        nonce: Nonce,
    },
}

impl BranchBoundMessage {
    /// Settlement nonce this message is keyed on.
    pub fn settlement_nonce(&self) -> Nonce {
        match self {
            Self::NoSettlement { nonce, .. }
            | Self::Settlement { nonce, .. }
            | Self::SettlementMultiple { nonce, .. }
            | Self::RetrieveSettlement { nonce } => *nonce,
        }
    }

    /// Short action name for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NoSettlement { .. } => "no_settlement",
            Self::Settlement { .. } => "settlement",
            Self::SettlementMultiple { .. } => "settlement_multiple",
            Self::RetrieveSettlement { .. } => "retrieve_settlement",
        }
    }
}
