use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A conversation session: one continuous interaction between a user and
/// the coding agent, usually scoped to a single project checkout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub project_path: Option<String>,
    pub summary: Option<String>,
    pub tags: Vec<String>,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            started_at: Utc::now(),
            ended_at: None,
            project_path: None,
            summary: None,
            tags: Vec::new(),
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }
}

/// Durable replication cursor: one row per sync target (e.g. a remote
/// project key), tracking how far this node has pushed or pulled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncPosition {
    pub target_name: String,
    pub last_event_cursor: i64,
    pub last_timestamp: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SyncPosition {
    pub fn initial(target_name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            target_name: target_name.into(),
            last_event_cursor: 0,
            last_timestamp: now,
            updated_at: now,
        }
    }
}
