//! Database engine for Tessera
//!
//! This crate orchestrates the lower layers:
//! - Database: storage + transaction coordination + configuration
//! - Transaction: keyspace-scoped façade with get/set/delete/batch_get/iter
//! - TesseraConfig: `tessera.toml` loading and validation
//! - RetryConfig: caller-side retry of conflicting transactions
//!
//! The engine never retries on its own; `Database::transaction` commits on
//! `Ok` and rolls back on `Err`, and conflicts surface to the caller.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod database;
pub mod transaction;

pub use coordinator::{TransactionCoordinator, TransactionMetrics};
pub use database::{Database, GcConfig, RetryConfig, TesseraConfig, CONFIG_FILE_NAME};
pub use transaction::Transaction;
