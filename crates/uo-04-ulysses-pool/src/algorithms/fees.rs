//! # Rebalancing Fee Curve
//!
//! The marginal fee rate depends on how far a destination's bandwidth sits
//! below its target:
//!
//! ```text
//! rate
//!  λ1+λ2 |\
//!        |  \
//!     λ1 |    \______
//!        |            \____
//!      0 +--------+--------+------> bandwidth
//!        0       b2        b1     target
//! ```
//!
//! with `b1 = target * σ1` and `b2 = target * σ2`. `F(b)` is the area under
//! the rate curve from `b` up to the target, and draining bandwidth from
//! `before` to `after` costs `F(after) - F(before)`. Refills are free.

use shared_types::math::{checked_add, checked_mul, checked_sub, mul_div_down, wad};
use shared_types::{MathError, U256};

use crate::domain::config::Fees;

/// Area under the rate curve between `bandwidth` and the target.
pub fn fee_area(bandwidth: U256, target: U256, fees: &Fees) -> Result<U256, MathError> {
    let b1 = mul_div_down(target, U256::from(fees.sigma1), wad())?;
    let b2 = mul_div_down(target, U256::from(fees.sigma2), wad())?;
    if bandwidth >= b1 {
        return Ok(U256::zero());
    }

    // Gentle segment, clipped at b2.
    let upper = bandwidth.max(b2);
    let span = b1 - b2;
    let d = b1 - upper;
    let gentle = mul_div_down(
        checked_mul(U256::from(fees.lambda1), d)?,
        d,
        checked_mul(checked_mul(span, U256::from(2))?, wad())?,
    )?;
    if bandwidth >= b2 {
        return Ok(gentle);
    }

    // Steep segment: flat lambda1 plus a ramp to lambda1 + lambda2 at zero.
    let d2 = b2 - bandwidth;
    let flat = mul_div_down(U256::from(fees.lambda1), d2, wad())?;
    let ramp = mul_div_down(
        checked_mul(U256::from(fees.lambda2), d2)?,
        d2,
        checked_mul(checked_mul(b2, U256::from(2))?, wad())?,
    )?;
    checked_add(checked_add(gentle, flat)?, ramp)
}

/// Fee for moving bandwidth from `before` to `after`, never above the
/// amount moved.
pub fn rebalancing_fee(
    before: U256,
    after: U256,
    target: U256,
    fees: &Fees,
) -> Result<U256, MathError> {
    if after >= before {
        return Ok(U256::zero());
    }
    let fee = checked_sub(fee_area(after, target, fees)?, fee_area(before, target, fees)?)?;
    Ok(fee.min(before - after))
}
