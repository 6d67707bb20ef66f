//! Small assertion helpers for `RetrieveResult`, so scenario tests read
//! as intent ("the top hit mentions X") rather than index arithmetic.

use ctxmem_sdk::RetrieveResult;

/// True if any retrieved memory's content contains `needle`.
pub fn mentions(result: &RetrieveResult, needle: &str) -> bool {
    result.memories.iter().any(|m| m.event.content.contains(needle))
}

/// The session ids retrieved, in rank order, duplicates included.
pub fn session_order(result: &RetrieveResult) -> Vec<String> {
    result.memories.iter().map(|m| m.event.session_id.clone()).collect()
}

/// True if the fallback trace recorded `stage` having run, e.g.
/// `"keyword"`, `"vector"`, `"summary"`.
pub fn used_stage(result: &RetrieveResult, stage: &str) -> bool {
    result.fallback_trace.iter().any(|s| s.contains(stage))
}
