//! # Fixed-Point Math
//!
//! Checked 256-bit helpers. `mul_div_*` use a 512-bit intermediate product so
//! `a * b` never overflows before the division.

use primitive_types::U512;

use crate::entities::U256;
use crate::errors::MathError;

/// 1e18, the fixed-point unit for rates and thresholds.
pub const WAD: u64 = 1_000_000_000_000_000_000;

/// `WAD` as a `U256`.
pub fn wad() -> U256 {
    U256::from(WAD)
}

/// `a + b`, failing with [`MathError::Overflow`].
pub fn checked_add(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_add(b).ok_or(MathError::Overflow)
}

/// `a - b`, failing with [`MathError::Underflow`].
pub fn checked_sub(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_sub(b).ok_or(MathError::Underflow)
}

/// `a * b`, failing with [`MathError::Overflow`].
pub fn checked_mul(a: U256, b: U256) -> Result<U256, MathError> {
    a.checked_mul(b).ok_or(MathError::Overflow)
}

/// `floor(a * b / d)`.
pub fn mul_div_down(a: U256, b: U256, d: U256) -> Result<U256, MathError> {
    if d.is_zero() {
        return Err(MathError::MulDivFailed);
    }
    let quotient = a.full_mul(b) / U512::from(d);
    U256::try_from(quotient).map_err(|_| MathError::MulDivFailed)
}

/// `ceil(a * b / d)`.
pub fn mul_div_up(a: U256, b: U256, d: U256) -> Result<U256, MathError> {
    if d.is_zero() {
        return Err(MathError::MulDivFailed);
    }
    let product = a.full_mul(b);
    let d = U512::from(d);
    let mut quotient = product / d;
    if !(product % d).is_zero() {
        quotient += U512::one();
    }
    U256::try_from(quotient).map_err(|_| MathError::MulDivFailed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_mul_div_rounding() {
        let a = U256::from(10);
        let b = U256::from(3);
        let d = U256::from(4);
        assert_eq!(mul_div_down(a, b, d).unwrap(), U256::from(7));
        assert_eq!(mul_div_up(a, b, d).unwrap(), U256::from(8));
        assert_eq!(mul_div_up(U256::from(8), b, U256::from(3)).unwrap(), U256::from(8));
    }

    #[test]
    fn test_mul_div_wide_intermediate() {
        // MAX * 2 / 2 overflows a naive 256-bit multiply.
        let r = mul_div_down(U256::MAX, U256::from(2), U256::from(2)).unwrap();
        assert_eq!(r, U256::MAX);
    }

    #[test]
    fn test_mul_div_failures() {
        assert_eq!(
            mul_div_down(U256::one(), U256::one(), U256::zero()),
            Err(MathError::MulDivFailed)
        );
        assert_eq!(
            mul_div_up(U256::MAX, U256::from(2), U256::one()),
            Err(MathError::MulDivFailed)
        );
    }

    #[test]
    fn test_checked_ops() {
        assert_eq!(checked_sub(U256::one(), U256::from(2)), Err(MathError::Underflow));
        assert_eq!(checked_add(U256::MAX, U256::one()), Err(MathError::Overflow));
        assert_eq!(checked_mul(U256::MAX, U256::from(2)), Err(MathError::Overflow));
    }

    proptest! {
        #[test]
        fn prop_up_is_down_or_one_more(a in any::<u64>(), b in any::<u64>(), d in 1u64..) {
            let (a, b, d) = (U256::from(a), U256::from(b), U256::from(d));
            let down = mul_div_down(a, b, d).unwrap();
            let up = mul_div_up(a, b, d).unwrap();
            prop_assert!(up == down || up == down + 1);
        }
    }
}
