//! Hook ingest protocol (§6 of the design): a single JSON object on
//! standard input, a single JSON object on standard output. The host
//! assistant's thin hook script speaks this; this module is the engine
//! side of the contract.
//!
//! A malformed request, a missing project, or any internal engine
//! failure must still produce a valid, empty-context response — the
//! memory layer is never allowed to be the reason a host assistant turn
//! fails. Only a genuine I/O failure writing the response itself
//! propagates, since there is nothing left to degrade to at that point.

use crate::client::Client;
use crate::error::Result;
use ctxmem_embed::Embedder;
use ctxmem_engine::RetrieveOptions;
use ctxmem_runtime::Layout;
use ctxmem_types::{Event, EventInput, EventType};
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::sync::Arc;

#[derive(Debug, Clone, Deserialize)]
pub struct HookMessage {
    pub role: String,
    pub content: String,
}

/// Raw shape of the hooks process's stdin payload. Every field but
/// `session_id` is optional — a hook firing on plain prompt submission
/// sends `prompt`; one firing after a multi-turn batch replay sends
/// `messages` instead. Unknown extra fields are ignored by serde's
/// default behavior rather than rejected.
#[derive(Debug, Clone, Deserialize)]
pub struct HookRequest {
    pub session_id: String,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub turn_id: Option<String>,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub messages: Option<Vec<HookMessage>>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct HookResponse {
    pub context: String,
}

impl HookResponse {
    pub fn empty() -> Self {
        Self::default()
    }
}

/// Reads one JSON request from `reader`, processes it, and writes one
/// JSON response to `writer`. The exit-code decision (0 vs 1) is left to
/// the caller (`ctxmem-cli`'s `hook` subcommand) — this function always
/// writes a valid response body regardless of whether processing
/// succeeded.
pub fn run<R: Read, W: Write>(mut reader: R, mut writer: W, embedder: Arc<dyn Embedder>) -> std::io::Result<()> {
    let mut input = String::new();
    reader.read_to_string(&mut input)?;

    let response = match serde_json::from_str::<HookRequest>(&input) {
        Ok(request) => handle_request(&request, embedder).unwrap_or_else(|_| HookResponse::empty()),
        Err(_) => HookResponse::empty(),
    };

    serde_json::to_writer(&mut writer, &response)?;
    writeln!(writer)
}

fn handle_request(request: &HookRequest, embedder: Arc<dyn Embedder>) -> Result<HookResponse> {
    let project_root = request.cwd.clone().unwrap_or_else(|| ".".to_string());
    let layout = Layout::resolve(None)?;
    let client = Client::open(layout, &project_root, embedder)?;
    client.register_session(&request.session_id, &project_root)?;

    let turn_id = resolve_turn_id(&client, request)?;
    ingest_events(&client, request, &turn_id)?;

    let Some(query) = query_text(request) else {
        return Ok(HookResponse::empty());
    };

    let result = client.retrieve(&query, RetrieveOptions::default())?;
    Ok(HookResponse { context: result.context.text })
}

/// A request-supplied `turn_id` is trusted as-is (the host already knows
/// its own turn boundaries); otherwise this reuses the session's
/// currently open turn marker, or starts a new one.
fn resolve_turn_id(client: &Client, request: &HookRequest) -> Result<String> {
    if let Some(turn_id) = &request.turn_id {
        client.write_turn_marker(&request.session_id, turn_id)?;
        return Ok(turn_id.clone());
    }
    if let Some(existing) = client.read_turn_marker(&request.session_id) {
        return Ok(existing);
    }
    let turn_id = Event::new_id();
    client.write_turn_marker(&request.session_id, &turn_id)?;
    Ok(turn_id)
}

fn ingest_events(client: &Client, request: &HookRequest, turn_id: &str) -> Result<()> {
    if let Some(messages) = &request.messages {
        for message in messages {
            let event_type = match message.role.as_str() {
                "user" => EventType::UserPrompt,
                "assistant" => EventType::AgentResponse,
                _ => EventType::ToolObservation,
            };
            let input = EventInput::new(event_type, &request.session_id, message.content.clone()).with_turn_id(turn_id);
            client.ingest(input)?;
        }
        return Ok(());
    }

    if let Some(prompt) = &request.prompt {
        let input = EventInput::new(EventType::UserPrompt, &request.session_id, prompt.clone()).with_turn_id(turn_id);
        client.ingest(input)?;
    }

    Ok(())
}

/// The text retrieval should be run against: the prompt verbatim, or the
/// last user-role message in a `messages` batch. `None` when the request
/// carries neither (e.g. a tool-observation-only hook call that's purely
/// ingest, no context requested back).
fn query_text(request: &HookRequest) -> Option<String> {
    if let Some(prompt) = &request.prompt {
        return Some(prompt.clone());
    }
    request
        .messages
        .as_ref()?
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_embed::LocalEmbedder;
    use tempfile::TempDir;

    fn embedder() -> Arc<dyn Embedder> {
        Arc::new(LocalEmbedder::new(32))
    }

    #[test]
    fn a_malformed_request_yields_an_empty_context_response_not_an_error() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("CLAUDE_MEMORY_HOME", dir.path());

        let input = b"not json".as_slice();
        let mut output = Vec::new();
        run(input, &mut output, embedder()).unwrap();

        let response: HookResponse = serde_json::from_slice(&output).unwrap();
        assert_eq!(response.context, "");
        std::env::remove_var("CLAUDE_MEMORY_HOME");
    }

    #[test]
    fn a_prompt_only_request_ingests_and_can_retrieve_itself_via_keyword_search() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("CLAUDE_MEMORY_HOME", dir.path());

        let request = serde_json::json!({
            "session_id": "s1",
            "cwd": dir.path().to_str().unwrap(),
            "prompt": "remember to use dark mode",
        });
        let input = serde_json::to_vec(&request).unwrap();
        let mut output = Vec::new();
        run(input.as_slice(), &mut output, embedder()).unwrap();

        let response: HookResponse = serde_json::from_slice(&output).unwrap();
        assert!(response.context.contains("dark mode"));
        std::env::remove_var("CLAUDE_MEMORY_HOME");
    }

    #[test]
    fn missing_prompt_and_messages_ingests_nothing_and_returns_empty_context() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("CLAUDE_MEMORY_HOME", dir.path());

        let request = serde_json::json!({ "session_id": "s1", "cwd": dir.path().to_str().unwrap() });
        let input = serde_json::to_vec(&request).unwrap();
        let mut output = Vec::new();
        run(input.as_slice(), &mut output, embedder()).unwrap();

        let response: HookResponse = serde_json::from_slice(&output).unwrap();
        assert_eq!(response.context, "");
        std::env::remove_var("CLAUDE_MEMORY_HOME");
    }
}
