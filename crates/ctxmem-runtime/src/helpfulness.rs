//! Scheduling for the helpfulness tracker (C11). The scoring itself
//! (`ctxmem_engine::evaluate_session_helpfulness`) already persists its
//! results and is idempotent against already-measured records; this
//! module's job is only to find sessions worth evaluating.

use crate::error::Result;
use ctxmem_engine::evaluate_session_helpfulness;
use ctxmem_index::EventLog;
use ctxmem_types::HelpfulnessRecord;

/// How many recent sessions a sweep inspects. Sessions are looked at
/// regardless of whether they've formally `ended_at` yet — a retrieval
/// made mid-session is just as measurable once later events exist, and
/// waiting for an explicit end would leave long-running sessions'
/// retrievals unscored indefinitely.
const SWEEP_SESSION_LIMIT: usize = 200;

/// Evaluates every unmeasured retrieval across the most recently active
/// sessions. Returns the newly measured records across all of them.
pub fn sweep(log: &EventLog) -> Result<Vec<HelpfulnessRecord>> {
    let sessions = log.list_sessions(SWEEP_SESSION_LIMIT)?;
    let mut measured = Vec::new();
    for session in sessions {
        measured.extend(evaluate_session_helpfulness(log, &session.id)?);
    }
    Ok(measured)
}

/// Evaluates a single session's unmeasured retrievals, e.g. called
/// directly when a session ends rather than waiting for the next sweep.
pub fn evaluate_session(log: &EventLog, session_id: &str) -> Result<Vec<HelpfulnessRecord>> {
    Ok(evaluate_session_helpfulness(log, session_id)?)
}
