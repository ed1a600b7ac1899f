//! # Byte-Packed Codec
//!
//! Big-endian, fixed-width fields behind a one-byte tag:
//!
//! | Field | Width |
//! |-------|-------|
//! | nonce, chain id | 4 |
//! | address | 20 |
//! | amount | 32 |
//! | token count | 1 |
//! | root-bound gas trailer | 16 + 16 |
//! | branch-bound gas trailer | 16 |
//!
//! Router params are the variable-length bytes between the fixed fields and
//! the gas trailer, so they need no length prefix.

use shared_types::{Address, U256};

use crate::domain::errors::CodecError;
use crate::domain::messages::{BranchBoundMessage, RootBoundMessage, FALLBACK_FLAG};
use crate::domain::params::{AssetTransfer, GasParams, MAX_TOKENS_PER_MESSAGE};

const ROOT_GAS_TRAILER: usize = 32;
const BRANCH_GAS_TRAILER: usize = 16;

/// A message type with a tag-dispatched byte layout.
pub trait WireMessage: Sized {
    /// Action tag without the fallback bit.
    fn tag(&self) -> u8;

    /// Append the body (everything after the tag).
    fn write_body(&self, w: &mut Writer) -> Result<(), CodecError>;

    /// Parse the body for `tag`.
    fn read_body(tag: u8, r: &mut Reader<'_>) -> Result<Self, CodecError>;
}

/// Encode `message`, setting the fallback bit if requested.
pub fn encode<M: WireMessage>(message: &M, fallback: bool) -> Result<Vec<u8>, CodecError> {
    let mut w = Writer::default();
    let tag = message.tag();
    w.u8(if fallback { tag | FALLBACK_FLAG } else { tag });
    message.write_body(&mut w)?;
    Ok(w.into_bytes())
}

/// Decode a payload into its message and fallback flag.
pub fn decode<M: WireMessage>(payload: &[u8]) -> Result<(M, bool), CodecError> {
    let (&first, _) = payload.split_first().ok_or(CodecError::EmptyPayload)?;
    let fallback = first & FALLBACK_FLAG != 0;
    let mut r = Reader::new(payload);
    r.u8()?;
    let message = M::read_body(first & !FALLBACK_FLAG, &mut r)?;
    r.finish()?;
    Ok((message, fallback))
}

/// True if the payload's tag carries the fallback bit.
pub fn has_fallback_flag(payload: &[u8]) -> bool {
    payload.first().is_some_and(|t| t & FALLBACK_FLAG != 0)
}

// =============================================================================
// WRITER / READER
// =============================================================================

/// Append-only big-endian writer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    fn u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn u128(&mut self, v: u128) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    fn address(&mut self, a: Address) {
        self.buf.extend_from_slice(a.as_bytes());
    }

    fn u256(&mut self, v: U256) {
        let mut bytes = [0u8; 32];
        v.to_big_endian(&mut bytes);
        self.buf.extend_from_slice(&bytes);
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn count(&mut self, n: usize) -> Result<(), CodecError> {
        let n8 = u8::try_from(n).map_err(|_| CodecError::TooManyTokens(n))?;
        self.u8(n8);
        Ok(())
    }

    fn assets(&mut self, assets: &[AssetTransfer]) -> Result<(), CodecError> {
        if assets.len() > MAX_TOKENS_PER_MESSAGE {
            return Err(CodecError::TooManyTokens(assets.len()));
        }
        self.count(assets.len())?;
        assets.iter().for_each(|a| self.address(a.h_token));
        assets.iter().for_each(|a| self.address(a.token));
        assets.iter().for_each(|a| self.u256(a.amount));
        assets.iter().for_each(|a| self.u256(a.deposit));
        Ok(())
    }

    fn asset(&mut self, a: &AssetTransfer) {
        self.address(a.h_token);
        self.address(a.token);
        self.u256(a.amount);
        self.u256(a.deposit);
    }

    fn root_gas(&mut self, gas: &GasParams) {
        self.u128(gas.deposited_gas);
        self.u128(gas.remote_execution_gas);
    }

    fn into_bytes(self) -> Vec<u8> {
        self.buf
    }
}

/// Bounds-checked big-endian reader.
#[derive(Debug)]
pub struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CodecError> {
        if self.remaining() < n {
            return Err(CodecError::Truncated {
                offset: self.pos,
                needed: n,
                available: self.remaining(),
            });
        }
        let out = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, CodecError> {
        let mut b = [0u8; 4];
        b.copy_from_slice(self.take(4)?);
        Ok(u32::from_be_bytes(b))
    }

    fn u128(&mut self) -> Result<u128, CodecError> {
        let mut b = [0u8; 16];
        b.copy_from_slice(self.take(16)?);
        Ok(u128::from_be_bytes(b))
    }

    fn address(&mut self) -> Result<Address, CodecError> {
        let mut b = [0u8; 20];
        b.copy_from_slice(self.take(20)?);
        Ok(Address(b))
    }

    fn u256(&mut self) -> Result<U256, CodecError> {
        Ok(U256::from_big_endian(self.take(32)?))
    }

    /// Everything except the last `trailer` bytes.
    fn params(&mut self, trailer: usize) -> Result<Vec<u8>, CodecError> {
        let len = self
            .remaining()
            .checked_sub(trailer)
            .ok_or(CodecError::Truncated {
                offset: self.pos,
                needed: trailer,
                available: self.remaining(),
            })?;
        Ok(self.take(len)?.to_vec())
    }

    fn asset(&mut self) -> Result<AssetTransfer, CodecError> {
        Ok(AssetTransfer {
            h_token: self.address()?,
            token: self.address()?,
            amount: self.u256()?,
            deposit: self.u256()?,
        })
    }

    fn assets(&mut self) -> Result<Vec<AssetTransfer>, CodecError> {
        let n = self.u8()? as usize;
        let h_tokens = (0..n).map(|_| self.address()).collect::<Result<Vec<_>, _>>()?;
        let tokens = (0..n).map(|_| self.address()).collect::<Result<Vec<_>, _>>()?;
        let amounts = (0..n).map(|_| self.u256()).collect::<Result<Vec<_>, _>>()?;
        let deposits = (0..n).map(|_| self.u256()).collect::<Result<Vec<_>, _>>()?;
        AssetTransfer::zip(&h_tokens, &tokens, &amounts, &deposits)
    }

    fn root_gas(&mut self) -> Result<GasParams, CodecError> {
        Ok(GasParams {
            deposited_gas: self.u128()?,
            remote_execution_gas: self.u128()?,
        })
    }

    fn finish(&self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(CodecError::TrailingBytes(n)),
        }
    }
}

// =============================================================================
// ROOT-BOUND
// =============================================================================

impl WireMessage for RootBoundMessage {
    fn tag(&self) -> u8 {
        let signed = |s: &Option<Address>| if s.is_some() { 3 } else { 0 };
        match self {
            Self::CallOut { signer, .. } => 0x01 + signed(signer),
            Self::CallOutAndBridge { signer, .. } => 0x02 + signed(signer),
            Self::CallOutAndBridgeMultiple { signer, .. } => 0x03 + signed(signer),
            Self::RetrySettlement { .. } => 0x07,
            Self::RetrieveDeposit { .. } => 0x08,
        }
    }

    fn write_body(&self, w: &mut Writer) -> Result<(), CodecError> {
        match self {
            Self::CallOut {
                signer,
                nonce,
                params,
                gas,
            } => {
                if let Some(s) = signer {
                    w.address(*s);
                }
                w.u32(*nonce);
                w.bytes(params);
                w.root_gas(gas);
            }
            Self::CallOutAndBridge {
                signer,
                nonce,
                asset,
                to_chain,
                params,
                gas,
            } => {
                if let Some(s) = signer {
                    w.address(*s);
                }
                w.u32(*nonce);
                w.asset(asset);
                w.u32(*to_chain);
                w.bytes(params);
                w.root_gas(gas);
            }
            Self::CallOutAndBridgeMultiple {
                signer,
                nonce,
                assets,
                to_chain,
                params,
                gas,
            } => {
                if let Some(s) = signer {
                    w.address(*s);
                }
                w.u32(*nonce);
                w.assets(assets)?;
                w.u32(*to_chain);
                w.bytes(params);
                w.root_gas(gas);
            }
            Self::RetrySettlement {
                signer,
                settlement_nonce,
                deposit_nonce,
                gas,
            } => {
                w.address(*signer);
                w.u32(*settlement_nonce);
                w.u32(*deposit_nonce);
                w.root_gas(gas);
            }
            Self::RetrieveDeposit { nonce } => w.u32(*nonce),
        }
        Ok(())
    }

    fn read_body(tag: u8, r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let signer = match tag {
            0x04..=0x06 => Some(r.address()?),
            _ => None,
        };
        let msg = match tag {
            0x01 | 0x04 => Self::CallOut {
                signer,
                nonce: r.u32()?,
                params: r.params(ROOT_GAS_TRAILER)?,
                gas: r.root_gas()?,
            },
            0x02 | 0x05 => Self::CallOutAndBridge {
                signer,
                nonce: r.u32()?,
                asset: r.asset()?,
                to_chain: r.u32()?,
                params: r.params(ROOT_GAS_TRAILER)?,
                gas: r.root_gas()?,
            },
            0x03 | 0x06 => Self::CallOutAndBridgeMultiple {
                signer,
                nonce: r.u32()?,
                assets: r.assets()?,
                to_chain: r.u32()?,
                params: r.params(ROOT_GAS_TRAILER)?,
                gas: r.root_gas()?,
            },
            0x07 => Self::RetrySettlement {
                signer: r.address()?,
                settlement_nonce: r.u32()?,
                deposit_nonce: r.u32()?,
                gas: r.root_gas()?,
            },
            0x08 => Self::RetrieveDeposit { nonce: r.u32()? },
            other => return Err(CodecError::UnknownTag(other)),
        };
        Ok(msg)
    }
}

// =============================================================================
// BRANCH-BOUND
// =============================================================================

impl WireMessage for BranchBoundMessage {
    fn tag(&self) -> u8 {
        match self {
            Self::NoSettlement { .. } => 0x00,
            Self::Settlement { .. } => 0x01,
            Self::SettlementMultiple { .. } => 0x02,
            Self::RetrieveSettlement { .. } => 0x03,
        }
    }

    fn write_body(&self, w: &mut Writer) -> Result<(), CodecError> {
        match self {
            Self::NoSettlement {
                recipient,
                nonce,
                params,
                remote_gas,
            } => {
                w.address(*recipient);
                w.u32(*nonce);
                w.bytes(params);
                w.u128(*remote_gas);
            }
            Self::Settlement {
                recipient,
                nonce,
                asset,
                params,
                remote_gas,
            } => {
                w.address(*recipient);
                w.u32(*nonce);
                w.asset(asset);
                w.bytes(params);
                w.u128(*remote_gas);
            }
            Self::SettlementMultiple {
                recipient,
                nonce,
                assets,
                params,
                remote_gas,
            } => {
                w.address(*recipient);
                w.u32(*nonce);
                w.assets(assets)?;
                w.bytes(params);
                w.u128(*remote_gas);
            }
            Self::RetrieveSettlement { nonce } => w.u32(*nonce),
        }
        Ok(())
    }

    fn read_body(tag: u8, r: &mut Reader<'_>) -> Result<Self, CodecError> {
        let msg = match tag {
            0x00 => Self::NoSettlement {
                recipient: r.address()?,
                nonce: r.u32()?,
                params: r.params(BRANCH_GAS_TRAILER)?,
                remote_gas: r.u128()?,
            },
            0x01 => Self::Settlement {
                recipient: r.address()?,
                nonce: r.u32()?,
                asset: r.asset()?,
                params: r.params(BRANCH_GAS_TRAILER)?,
                remote_gas: r.u128()?,
            },
            0x02 => Self::SettlementMultiple {
                recipient: r.address()?,
                nonce: r.u32()?,
                assets: r.assets()?,
                params: r.params(BRANCH_GAS_TRAILER)?,
                remote_gas: r.u128()?,
            },
            0x03 => Self::RetrieveSettlement { nonce: r.u32()? },
            other => return Err(CodecError::UnknownTag(other)),
        };
        Ok(msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(n: u64) -> Address {
        Address::from_low_u64_be(n)
    }

    fn asset(n: u64) -> AssetTransfer {
        AssetTransfer {
            h_token: addr(n),
            token: addr(n + 1),
            amount: U256::from(100 * n),
            deposit: U256::from(50 * n),
        }
    }

    fn gas() -> GasParams {
        GasParams {
            deposited_gas: 200_000,
            remote_execution_gas: 50_000,
        }
    }

    #[test]
    fn test_call_out_and_bridge_layout() {
        let msg = RootBoundMessage::CallOutAndBridge {
            signer: None,
            nonce: 1,
            asset: asset(1),
            to_chain: 2,
            params: vec![0xAA, 0xBB],
            gas: gas(),
        };
        let bytes = encode(&msg, true).unwrap();

        // tag + nonce + 2 addresses + 2 amounts + chain + params + gas
        assert_eq!(bytes.len(), 1 + 4 + 40 + 64 + 4 + 2 + 32);
        assert_eq!(bytes[0], 0x82);
        assert_eq!(&bytes[1..5], &1u32.to_be_bytes());
        assert_eq!(&bytes[109..113], &2u32.to_be_bytes());
        assert_eq!(&bytes[113..115], &[0xAA, 0xBB]);

        let (back, fallback) = decode::<RootBoundMessage>(&bytes).unwrap();
        assert!(fallback);
        assert_eq!(back, msg);
    }

    #[test]
    fn test_signed_variant_tags() {
        let signer = Some(addr(9));
        let out = RootBoundMessage::CallOut {
            signer,
            nonce: 3,
            params: vec![],
            gas: gas(),
        };
        let bytes = encode(&out, false).unwrap();
        assert_eq!(bytes[0], 0x04);
        assert_eq!(&bytes[1..21], addr(9).as_bytes());
        assert_eq!(decode::<RootBoundMessage>(&bytes).unwrap().0, out);

        let multi = RootBoundMessage::CallOutAndBridgeMultiple {
            signer,
            nonce: 4,
            assets: vec![asset(1), asset(3)],
            to_chain: 5,
            params: vec![1, 2, 3],
            gas: gas(),
        };
        let bytes = encode(&multi, false).unwrap();
        assert_eq!(bytes[0], 0x06);
        assert_eq!(decode::<RootBoundMessage>(&bytes).unwrap().0, multi);
    }

    #[test]
    fn test_params_may_contain_anything() {
        // Params that look like a gas trailer must not confuse the split.
        let msg = BranchBoundMessage::NoSettlement {
            recipient: addr(1),
            nonce: 7,
            params: vec![0xFF; 48],
            remote_gas: 12,
        };
        let bytes = encode(&msg, false).unwrap();
        assert_eq!(decode::<BranchBoundMessage>(&bytes).unwrap().0, msg);
    }

    #[test]
    fn test_branch_bound_variants() {
        for msg in [
            BranchBoundMessage::Settlement {
                recipient: addr(1),
                nonce: 2,
                asset: asset(4),
                params: vec![9],
                remote_gas: 77,
            },
            BranchBoundMessage::SettlementMultiple {
                recipient: addr(1),
                nonce: 3,
                assets: vec![asset(1), asset(2)],
                params: vec![],
                remote_gas: 0,
            },
            BranchBoundMessage::RetrieveSettlement { nonce: 8 },
        ] {
            let bytes = encode(&msg, true).unwrap();
            let (back, fallback) = decode::<BranchBoundMessage>(&bytes).unwrap();
            assert_eq!(back, msg);
            assert!(fallback);
            assert_eq!(back.settlement_nonce(), msg.settlement_nonce());
        }
    }

    #[test]
    fn test_retry_and_retrieve() {
        let retry = RootBoundMessage::RetrySettlement {
            signer: addr(2),
            settlement_nonce: 11,
            deposit_nonce: 12,
            gas: gas(),
        };
        let bytes = encode(&retry, false).unwrap();
        assert_eq!(bytes.len(), 1 + 20 + 4 + 4 + 32);
        let (back, _) = decode::<RootBoundMessage>(&bytes).unwrap();
        assert_eq!(back.deposit_nonce(), 12);

        let retrieve = RootBoundMessage::RetrieveDeposit { nonce: 5 };
        let bytes = encode(&retrieve, true).unwrap();
        assert_eq!(bytes, vec![0x88, 0, 0, 0, 5]);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(
            decode::<RootBoundMessage>(&[]).unwrap_err(),
            CodecError::EmptyPayload
        );
        assert_eq!(
            decode::<RootBoundMessage>(&[0x09]).unwrap_err(),
            CodecError::UnknownTag(0x09)
        );
        assert!(matches!(
            decode::<RootBoundMessage>(&[0x01, 0, 0]).unwrap_err(),
            CodecError::Truncated { .. }
        ));
        assert_eq!(
            decode::<BranchBoundMessage>(&[0x03, 0, 0, 0, 1, 0]).unwrap_err(),
            CodecError::TrailingBytes(1)
        );
        // Multi-asset count promises more tokens than present.
        let mut bytes = vec![0x02];
        bytes.extend_from_slice(addr(1).as_bytes());
        bytes.extend_from_slice(&1u32.to_be_bytes());
        bytes.push(3);
        assert!(matches!(
            decode::<BranchBoundMessage>(&bytes).unwrap_err(),
            CodecError::Truncated { .. }
        ));
    }

    #[test]
    fn test_too_many_tokens() {
        let msg = BranchBoundMessage::SettlementMultiple {
            recipient: addr(1),
            nonce: 1,
            assets: vec![asset(1); 256],
            params: vec![],
            remote_gas: 0,
        };
        assert_eq!(encode(&msg, false).unwrap_err(), CodecError::TooManyTokens(256));
    }

    #[test]
    fn test_has_fallback_flag() {
        assert!(has_fallback_flag(&[0x81]));
        assert!(!has_fallback_flag(&[0x01]));
        assert!(!has_fallback_flag(&[]));
    }
}
