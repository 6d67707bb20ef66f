//! Testing infrastructure for ctxmem integration tests.
//!
//! - `TestWorld`: an isolated, temp-directory-backed memory home plus an
//!   opened `Client`, for scenario tests that span ingest, retrieval, and
//!   consolidation without touching a developer's real `~/.ctxmem`.
//! - `fixtures`: builders for the event sequences scenario tests need.
//! - `assertions`: small helpers for asserting on `RetrieveResult`.

pub mod assertions;
pub mod fixtures;
pub mod world;

pub use world::TestWorld;
