use crate::metadata::Metadata;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of conversational event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserPrompt,
    AgentResponse,
    ToolObservation,
    SessionSummary,
}

impl EventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserPrompt => "user_prompt",
            EventType::AgentResponse => "agent_response",
            EventType::ToolObservation => "tool_observation",
            EventType::SessionSummary => "session_summary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "user_prompt" => Some(EventType::UserPrompt),
            "agent_response" => Some(EventType::AgentResponse),
            "tool_observation" => Some(EventType::ToolObservation),
            "session_summary" => Some(EventType::SessionSummary),
            _ => None,
        }
    }
}

/// Caller-supplied fields for [`append`](../ctxmem_index/fn.append.html)-style
/// ingestion. `id`, `canonical_key` and `dedupe_key` are left unset for
/// ordinary ingest (the event log derives them); they are set only when
/// replaying events from a remote log via `import_events`, which must
/// preserve identity across nodes.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub event_type: EventType,
    pub session_id: String,
    pub turn_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub metadata: Metadata,
    pub id: Option<String>,
    pub canonical_key: Option<String>,
    pub dedupe_key: Option<String>,
}

impl EventInput {
    pub fn new(
        event_type: EventType,
        session_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            event_type,
            session_id: session_id.into(),
            turn_id: None,
            timestamp: Utc::now(),
            content: content.into(),
            metadata: Metadata::new(),
            id: None,
            canonical_key: None,
            dedupe_key: None,
        }
    }

    pub fn with_turn_id(mut self, turn_id: impl Into<String>) -> Self {
        self.turn_id = Some(turn_id.into());
        self
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }
}

/// An immutable, durable conversational event.
///
/// Once appended, every field here except `metadata` (mutated only by
/// access-count bookkeeping) is fixed for the lifetime of the event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub event_type: EventType,
    pub session_id: String,
    pub turn_id: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub content: String,
    pub canonical_key: String,
    pub dedupe_key: String,
    pub metadata: Metadata,
    /// Monotonically increasing, local to this node. Never compared across
    /// peers — see `SyncPosition` / replication `seq` for cross-node order.
    pub rowid: i64,
}

impl Event {
    pub fn new_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }
}
