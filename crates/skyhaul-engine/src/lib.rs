//! Skyhaul engine: flight lifecycle and settlement over SQLite.
//!
//! Every public operation executes as one transaction: all ledger,
//! aircraft, job, and flight mutations commit together or not at all.

pub mod aircraft;
pub mod auth;
pub mod config;
pub mod error;
pub mod flights;
pub mod fulfillment;
pub mod ground_ops;
pub mod jobs;
pub mod nearest;
pub mod persistence;
pub mod stats;

pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use persistence::{init_database, Database};
pub use stats::Stats;

/// Shared handles passed to every engine operation.
pub struct EngineContext {
    db: Database,
    stats: Stats,
}

impl EngineContext {
    pub fn new(db: Database) -> Self {
        Self { db, stats: Stats::new() }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }
}
