use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::EventType;

/// Per-turn rollup derived from the events table: how many events the turn
/// has accumulated so far and whether an `agent_response` has landed yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnSummary {
    pub turn_id: String,
    pub event_count: usize,
    pub has_response: bool,
    pub started_at: DateTime<Utc>,
}

impl EventLog {
    /// Turns touched by a session, ordered by first appearance.
    pub fn get_session_turns(&self, session_id: &str) -> Result<Vec<TurnSummary>> {
        let events = self.get_session_events(session_id)?;
        let mut summaries: Vec<TurnSummary> = Vec::new();

        for event in events {
            let Some(turn_id) = event.turn_id.clone() else {
                continue;
            };
            if let Some(existing) = summaries.iter_mut().find(|s| s.turn_id == turn_id) {
                existing.event_count += 1;
                existing.has_response |= event.event_type == EventType::AgentResponse;
            } else {
                summaries.push(TurnSummary {
                    turn_id,
                    event_count: 1,
                    has_response: event.event_type == EventType::AgentResponse,
                    started_at: event.timestamp,
                });
            }
        }

        Ok(summaries)
    }
}
