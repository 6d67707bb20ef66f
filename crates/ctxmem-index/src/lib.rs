//! SQLite-backed event log, transactional outbox, and ancillary storage
//! for the ctxmem memory engine (C2, C3, C6, and the storage half of
//! C8/C11). WAL mode; one writer at a time, concurrent readers.

mod connection;
mod consolidated;
mod error;
mod events;
mod helpfulness;
mod keyword;
pub mod schema;
mod sessions;
mod sync;
mod turns;
mod working_set;
mod wipe;

pub mod outbox;

pub use connection::EventLog;
pub use error::{Error, Result};
pub use events::{AppendOutcome, ImportOutcome};
pub use keyword::KeywordHit;
pub use outbox::OutboxMetrics;
pub use turns::TurnSummary;
