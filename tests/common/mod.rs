//! Shared test utilities for the integration suites.
//!
//! Import via `#[path = "../common/mod.rs"] mod common;` from a suite's main.rs.

#![allow(dead_code)]

use std::sync::{Arc, Once};

use tessera::{Database, HashStore, Keyspace, SetStore, TesseraConfig};
use tracing_subscriber::filter::LevelFilter;

static INIT_TRACING: Once = Once::new();

/// Route `tracing` output through the test harness (shown for failing tests).
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(LevelFilter::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// Test database with both collection facades on one keyspace.
pub struct TestDb {
    pub db: Arc<Database>,
    pub sets: SetStore,
    pub hashes: HashStore,
    pub ks: Keyspace,
}

impl TestDb {
    /// In-memory database with default configuration.
    pub fn new() -> Self {
        Self::with_db(Database::in_memory())
    }

    /// In-memory database whose cursors fetch `batch` entries at a time.
    pub fn with_scan_batch(batch: usize) -> Self {
        let config = TesseraConfig {
            scan_batch_size: batch,
            ..TesseraConfig::default()
        };
        Self::with_db(Database::open(config).expect("valid config"))
    }

    /// Database opened on `dir`, reading (or creating) its `tessera.toml`.
    pub fn open_dir(dir: &std::path::Path) -> Self {
        Self::with_db(Database::open_dir(dir).expect("open dir"))
    }

    fn with_db(db: Arc<Database>) -> Self {
        init_tracing();
        Self {
            sets: SetStore::new(Arc::clone(&db)),
            hashes: HashStore::new(Arc::clone(&db)),
            ks: Keyspace::new("it", 0),
            db,
        }
    }

    /// Add string members to a set.
    pub fn add(&self, key: &str, members: &[&str]) {
        self.sets
            .add(&self.ks, key.as_bytes(), &bytes(members))
            .expect("add");
    }

    /// Members of a set as strings.
    pub fn members(&self, key: &str) -> Vec<String> {
        strings(self.sets.members(&self.ks, key.as_bytes()).expect("members"))
    }

    /// Physical keys currently live in `[start, end)`.
    pub fn live_in(&self, range: (Vec<u8>, Vec<u8>)) -> usize {
        self.db.storage().live_count_in(&range.0, &range.1)
    }
}

/// Convert string literals to byte vectors.
pub fn bytes(items: &[&str]) -> Vec<Vec<u8>> {
    items.iter().map(|s| s.as_bytes().to_vec()).collect()
}

/// Convert byte vectors back to strings (lossy).
pub fn strings(items: Vec<Vec<u8>>) -> Vec<String> {
    items
        .into_iter()
        .map(|b| String::from_utf8_lossy(&b).into_owned())
        .collect()
}
