//! Collection-layer integration suite
//!
//! End-to-end behavior through the public `tessera` API: set algebra,
//! garbage collection, snapshot consistency and randomized invariants.

#[path = "../common/mod.rs"]
mod common;

mod gc;
mod properties;
mod set_algebra;
mod snapshot;
