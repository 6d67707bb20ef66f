//! ctxmem-sdk: the public facade over the ctxmem conversational memory
//! engine.
//!
//! This crate is what external collaborators actually depend on — the
//! hook process, `ctxmem-cli`, and any embedding host never reach past
//! it into `ctxmem-index`/`ctxmem-vector`/`ctxmem-runtime` directly.
//!
//! # Quickstart
//!
//! ```no_run
//! use ctxmem_sdk::Client;
//! use ctxmem_engine::RetrieveOptions;
//! use ctxmem_types::{EventInput, EventType};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::connect_default("/path/to/project")?;
//! client.ingest(EventInput::new(EventType::UserPrompt, "s1", "prefers dark mode"))?;
//! client.start_background_workers()?;
//!
//! let result = client.retrieve("dark mode", RetrieveOptions::default())?;
//! println!("{}", result.context.text);
//! # Ok(())
//! # }
//! ```
//!
//! # Hook protocol
//!
//! [`hook::run`] implements the stdin/stdout JSON contract a thin host
//! hook script speaks: one [`hook::HookRequest`] in, one
//! [`hook::HookResponse`] out, never an error the host has to handle.

pub mod client;
pub mod error;
pub mod hook;

pub use client::{Client, Stats};
pub use error::{Error, Result};
pub use hook::{run as run_hook, HookMessage, HookRequest, HookResponse};

// Re-exported so a caller can build requests/options without reaching
// past this crate for the types it consumes and returns.
pub use ctxmem_engine::{RetrieveOptions, RetrieveResult, Strategy};
pub use ctxmem_index::{AppendOutcome, ImportOutcome};
pub use ctxmem_runtime::Layout;
pub use ctxmem_types::{Event, EventInput, EventType, Session};
