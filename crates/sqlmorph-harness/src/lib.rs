//! Campaign harness for sqlmorph.
//!
//! Runs oracle checks across worker threads, each worker with its own
//! session and seeds derived from one root seed, and records defects in a
//! repro bundle. SQLite through `rusqlite` is the built-in engine.

pub mod campaign;
pub mod config;
pub mod logging;
pub mod repro;
pub mod seed;
pub mod sqlite;

pub use campaign::{Campaign, CampaignReport, CampaignSummary, ExecutorFactory, SchemaProvider};
pub use config::CampaignConfig;
pub use logging::{init_logging, init_test_logging};
pub use repro::{ReproBundle, init_repro_bundle, validate_bundle};
pub use seed::WorkerSeeds;
pub use sqlite::{SqliteExecutor, SqliteSchemaProvider, introspect};
