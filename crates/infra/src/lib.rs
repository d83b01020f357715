//! `plantops-infra` — PostgreSQL persistence.
//!
//! One repository per entity, plus the stock ledger (the only sanctioned
//! mutator of stock quantities) and the report aggregation queries. Row
//! mapping is explicit; every mutation that moves stock runs its ledger
//! application inside the same transaction as the triggering business write.

pub mod audit;
pub mod batches;
pub mod config;
pub mod customers;
pub mod db;
pub mod error;
pub mod expenses;
pub mod production;
pub mod products;
pub mod reports;
pub mod sales;
pub mod stock;
pub mod suppliers;
pub mod users;
pub mod withdrawals;

pub use db::{connect, run_migrations};
pub use error::{RepoError, RepoResult};
pub use stock::StockLedger;
