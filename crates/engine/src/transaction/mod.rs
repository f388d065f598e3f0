//! Keyspace-scoped transaction façade
//!
//! `Transaction` is the narrow surface collection code runs against:
//! point reads and writes, batched reads, and ordered range cursors, all
//! under one snapshot. Commit and rollback end it; dropping an unfinished
//! transaction rolls it back.

mod context;

pub use context::Transaction;
pub use tessera_concurrency::Cursor;
