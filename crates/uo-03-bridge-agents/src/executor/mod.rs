//! Executors: decode-free, stateless clearance and router dispatch.

pub mod branch;
pub mod root;

pub use branch::BranchExecutor;
pub use root::{invoke_router, RootExecutor, RouterCall};
