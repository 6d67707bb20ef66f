//! Background workers, replication, and process-wide state for the
//! ctxmem memory engine: the embedding drain loop (C4), the working-set
//! consolidator's scheduling (C8), the remote replicator (C9), turn/
//! session ephemeral state (C10), the helpfulness sweep's scheduling
//! (C11), and the two process-wide singletons (session registry, worker
//! table) described in the design notes.
//!
//! Every worker in this crate follows the same shape: a pure decision or
//! batch function that's unit-testable without a thread, wrapped by
//! `worker::Worker` for the actual interval-driven background loop.

pub mod config;
pub mod consolidation;
pub mod embedding;
mod error;
pub mod helpfulness;
pub mod paths;
pub mod registry;
pub mod replicator;
pub mod turn_state;
pub mod worker;

mod engine;

pub use config::{default_config_path, Config, MongoSyncConfig, SyncDirection};
pub use engine::{ProjectEngine, CURRENT_EMBEDDING_VERSION};
pub use error::{Error, Result};
pub use paths::Layout;
pub use worker::Worker;
