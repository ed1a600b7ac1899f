//! Driving Ports (API - Inbound)
//!
//! The transport-facing surface both agents expose. A chain host drives an
//! agent exclusively through this trait when delivering envelopes.

use shared_types::{ChainId, TokenLedger, TxContext};
use uo_02_messaging::Envelope;

use crate::domain::entities::ExecutionReport;
use crate::domain::errors::BridgeAgentError;

/// Transport callbacks of a bridge agent.
pub trait CrossChainEndpoint {
    /// Port this agent settles through.
    type Port;

    /// Chain this agent lives on.
    fn chain(&self) -> ChainId;

    /// Execute an inbound payload from `from_chain`.
    ///
    /// `Ok` commits; the report says whether the result is final.
    /// `Err(AlreadyExecuted)` is a replay and is final.
    /// Any other `Err` reverts the whole delivery.
    fn any_execute(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut Self::Port,
        ctx: &TxContext,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<ExecutionReport, BridgeAgentError>;

    /// Handle the failure notification for a payload this agent sent.
    fn any_fallback(
        &mut self,
        ledger: &mut TokenLedger,
        port: &mut Self::Port,
        ctx: &TxContext,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError>;

    /// Seal an inbound nonce as retrieve-only after a reverted delivery that
    /// requested a fallback, so redeliveries cannot execute it.
    fn seal_retrieve_only(
        &mut self,
        from_chain: ChainId,
        payload: &[u8],
    ) -> Result<(), BridgeAgentError>;

    /// Take the envelopes queued by the current transaction.
    fn drain_outbox(&mut self) -> Vec<Envelope>;
}
