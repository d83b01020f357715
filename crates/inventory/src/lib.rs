//! Inventory domain module.
//!
//! Business rules for stock movements and material-withdrawal approval,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no
//! storage). The persistence layer mirrors these rules with atomic SQL.

pub mod stock;
pub mod withdrawal;

pub use stock::{DeltaOutcome, StockRecord, apply_delta};
pub use withdrawal::WithdrawalStatus;
