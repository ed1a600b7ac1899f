//! # Bandwidth Diffusion
//!
//! Allocation of incoming value across a pool's destinations.
//!
//! 1. `diff_x = max(0, target_x - bandwidth_x)` for every destination.
//! 2. `min(Σ diff, amount)` is spread proportionally to `diff_x`, refilling
//!    under-target destinations first.
//! 3. Whatever is left is spread proportionally to weight.
//! 4. Rounding dust goes to the requested destination (or the first one).
//!
//! Targets are computed from the pool's assets *before* the incoming amount.

use shared_types::math::{checked_add, checked_sub, mul_div_down};
use shared_types::{MathError, U256};

use crate::domain::entities::BandwidthState;

/// Fair-share bandwidth of a destination with `weight`.
pub fn target_bandwidth(
    total_assets: U256,
    weight: u8,
    total_weights: u32,
) -> Result<U256, MathError> {
    if total_weights == 0 {
        return Ok(U256::zero());
    }
    mul_div_down(total_assets, U256::from(weight), U256::from(total_weights))
}

/// Add `amount` of bandwidth across `states`. `Σ bandwidth` grows by exactly
/// `amount` unless `states` is empty.
pub fn distribute(
    states: &mut [BandwidthState],
    total_assets: U256,
    total_weights: u32,
    amount: U256,
    requested: Option<usize>,
) -> Result<(), MathError> {
    if states.is_empty() || amount.is_zero() {
        return Ok(());
    }

    let mut diffs = Vec::with_capacity(states.len());
    let mut total_diff = U256::zero();
    for state in states.iter() {
        let target = target_bandwidth(total_assets, state.weight, total_weights)?;
        let diff = target.saturating_sub(state.bandwidth);
        total_diff = checked_add(total_diff, diff)?;
        diffs.push(diff);
    }

    let mut allocated = U256::zero();
    let diffused = total_diff.min(amount);
    if !total_diff.is_zero() {
        for (state, diff) in states.iter_mut().zip(&diffs) {
            let share = mul_div_down(diffused, *diff, total_diff)?;
            state.bandwidth = checked_add(state.bandwidth, share)?;
            allocated = checked_add(allocated, share)?;
        }
    }

    let remainder = amount - diffused;
    if !remainder.is_zero() && total_weights > 0 {
        for state in states.iter_mut() {
            let share = mul_div_down(remainder, U256::from(state.weight), U256::from(total_weights))?;
            state.bandwidth = checked_add(state.bandwidth, share)?;
            allocated = checked_add(allocated, share)?;
        }
    }

    let dust = checked_sub(amount, allocated)?;
    let sink = requested.unwrap_or(0).min(states.len() - 1);
    states[sink].bandwidth = checked_add(states[sink].bandwidth, dust)?;
    Ok(())
}

/// Make room for a new destination of `weight`. Existing bandwidth is
/// rescaled to the new total weight and the freed amount is returned for
/// the newcomer.
pub fn rescale_for_new(
    states: &mut [BandwidthState],
    old_total_weights: u32,
    new_total_weights: u32,
) -> Result<U256, MathError> {
    let mut freed = U256::zero();
    for state in states.iter_mut() {
        let kept = mul_div_down(
            state.bandwidth,
            U256::from(old_total_weights),
            U256::from(new_total_weights),
        )?;
        freed = checked_add(freed, state.bandwidth - kept)?;
        state.bandwidth = kept;
    }
    Ok(freed)
}

/// `Σ bandwidth`.
pub fn total_bandwidth(states: &[BandwidthState]) -> Result<U256, MathError> {
    states
        .iter()
        .try_fold(U256::zero(), |acc, s| checked_add(acc, s.bandwidth))
}
