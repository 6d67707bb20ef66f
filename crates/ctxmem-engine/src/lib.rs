//! Retrieval, consolidation, and helpfulness-scoring logic for the ctxmem
//! memory engine (C7, C8, C11, and the access half of C12).
//!
//! This crate is deliberately free of storage and embedding concerns: it
//! operates on `ctxmem-index::EventLog` and `ctxmem-vector::VectorIndex`
//! handles passed in by the caller, and accepts pre-computed query
//! embeddings rather than depending on `ctxmem-embed` itself. That keeps
//! the scoring and fallback logic unit-testable without a database or a
//! model.

mod confidence;
mod consolidator;
mod context;
mod error;
mod helpfulness;
mod rerank;
mod retriever;
mod scope;
mod shared;
mod topics;
mod working_set;

pub use confidence::{classify, combined_score, ConfidenceThresholds, ConfidenceWeights, MatchConfidence};
pub use consolidator::{run_consolidation, should_trigger, ConsolidationReport, ConsolidationTriggers};
pub use context::{assemble_context, format_memory, AssembledContext, RetrievedMemory};
pub use error::{Error, Result};
pub use helpfulness::evaluate_session_helpfulness;
pub use rerank::{blended_score, lexical_overlap, tokenize, CandidateScores, DecayPolicy, RerankWeights};
pub use retriever::{retrieve, RetrieveOptions, RetrieveResult, Strategy};
pub use scope::Scope;
pub use shared::{promote_entry, search_shared, vector_search_shared};
pub use topics::extract_topics;
pub use working_set::{add as add_to_working_set, maintain as maintain_working_set, refresh as refresh_working_set, WorkingSetConfig};
