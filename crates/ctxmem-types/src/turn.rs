use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ephemeral per-session turn marker, persisted as a single small JSON
/// file rather than a database row: this state is best-effort and
/// disposable, so it doesn't need WAL durability.
///
/// Reads must validate `session_id` against the session they were loaded
/// for and discard the state if it's older than the turn TTL (see
/// `ctxmem-runtime`'s turn-state cleanup worker).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TurnState {
    pub turn_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

impl TurnState {
    pub fn new(turn_id: impl Into<String>, session_id: impl Into<String>) -> Self {
        Self {
            turn_id: turn_id.into(),
            session_id: session_id.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_stale(&self, now: DateTime<Utc>, ttl: chrono::Duration) -> bool {
        now - self.created_at > ttl
    }
}
