//! Shared data model for the ctxmem conversational memory engine.
//!
//! This crate holds plain data types only: no I/O, no SQL, no embedding
//! logic. Every other crate in the workspace depends on it.

mod event;
mod helpfulness;
mod metadata;
mod outbox;
mod session;
mod turn;
mod working_set;

pub use event::{Event, EventInput, EventType};
pub use helpfulness::HelpfulnessRecord;
pub use metadata::Metadata;
pub use outbox::{ItemKind, JobStatus, OutboxJob};
pub use session::{Session, SyncPosition};
pub use turn::TurnState;
pub use working_set::{ConsolidatedMemory, ConsolidatedRule, WorkingSetItem};
