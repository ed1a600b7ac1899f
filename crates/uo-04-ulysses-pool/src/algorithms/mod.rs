//! Pure bandwidth and fee math.

pub mod bandwidth;
pub mod fees;

pub use bandwidth::{distribute, rescale_for_new, target_bandwidth, total_bandwidth};
pub use fees::{fee_area, rebalancing_fee};
