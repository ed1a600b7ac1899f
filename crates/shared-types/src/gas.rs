//! # Gas Metering
//!
//! A transaction carries a gas limit; handlers consume fixed costs per step so
//! that `initial_gas - gas_left()` is a meaningful execution-cost measure.

use serde::{Deserialize, Serialize};

use crate::errors::GasError;

/// Tracks gas consumed by one transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GasMeter {
    limit: u64,
    used: u64,
}

impl GasMeter {
    /// New meter with the given limit.
    pub fn new(limit: u64) -> Self {
        Self { limit, used: 0 }
    }

    /// Consume `units`, failing without change if the limit would be exceeded.
    pub fn consume(&mut self, units: u64) -> Result<(), GasError> {
        let next = self.used.saturating_add(units);
        if next > self.limit {
            return Err(GasError::OutOfGas {
                limit: self.limit,
                used: self.used,
                requested: units,
            });
        }
        self.used = next;
        Ok(())
    }

    /// Gas remaining.
    pub fn gas_left(&self) -> u64 {
        self.limit - self.used
    }

    /// Gas consumed so far.
    pub fn used(&self) -> u64 {
        self.used
    }

    /// Configured limit.
    pub fn limit(&self) -> u64 {
        self.limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_consume_until_exhausted() {
        let mut meter = GasMeter::new(100);
        meter.consume(60).unwrap();
        assert_eq!(meter.gas_left(), 40);
        assert!(meter.consume(41).is_err());
        assert_eq!(meter.used(), 60);
        meter.consume(40).unwrap();
        assert_eq!(meter.gas_left(), 0);
    }
}
