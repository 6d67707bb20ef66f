//! Builders for the event sequences scenario tests exercise most often.

use chrono::{DateTime, Duration, Utc};
use ctxmem_types::{EventInput, EventType};

/// A user prompt / agent response pair sharing one turn id, the shape
/// almost every scenario starts from.
pub fn turn(session_id: &str, turn_id: &str, prompt: &str, response: &str) -> Vec<EventInput> {
    vec![
        EventInput::new(EventType::UserPrompt, session_id, prompt).with_turn_id(turn_id),
        EventInput::new(EventType::AgentResponse, session_id, response).with_turn_id(turn_id),
    ]
}

/// Same as [`turn`] but with an explicit timestamp, for scenarios that
/// depend on recency decay or ordering (consolidation TTL, fallback
/// chain age checks).
pub fn turn_at(session_id: &str, turn_id: &str, prompt: &str, response: &str, at: DateTime<Utc>) -> Vec<EventInput> {
    turn(session_id, turn_id, prompt, response)
        .into_iter()
        .map(|e| e.with_timestamp(at))
        .collect()
}

/// A turn timestamped `age` before now, for decay/fallback scenarios
/// that need events spread across a time range.
pub fn turn_aged(session_id: &str, turn_id: &str, prompt: &str, response: &str, age: Duration) -> Vec<EventInput> {
    turn_at(session_id, turn_id, prompt, response, Utc::now() - age)
}

pub fn tool_observation(session_id: &str, turn_id: &str, tool_output_json: &str) -> EventInput {
    EventInput::new(EventType::ToolObservation, session_id, tool_output_json).with_turn_id(turn_id)
}

/// A deterministic id for the n-th synthetic session in a scenario,
/// so assertions can refer to `session_id(2)` instead of threading a
/// `uuid` value through test setup.
pub fn session_id(n: u32) -> String {
    format!("test-session-{n:04}")
}
