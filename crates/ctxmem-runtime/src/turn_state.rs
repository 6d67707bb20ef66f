//! Per-session ephemeral turn marker (C10): `${home}/.turn-state-<session_id>.json`.
//!
//! Everything here is best-effort. A write failure, a read failure, or a
//! stale/missing file never propagates past this module as anything but
//! `Ok(None)` / a swallowed error — the contract is that a broken turn
//! link only ever degrades grouping of a few events, never a request.

use crate::paths::Layout;
use chrono::{Duration, Utc};
use ctxmem_types::TurnState;

/// How long a turn-state file is trusted on read before it's treated as
/// stale and discarded, per the design notes ("staleness is handled on
/// read").
const READ_TTL_MINUTES: i64 = 30;

/// How long an untouched turn-state file is allowed to linger on disk
/// before the background cleanup sweep removes it outright.
const CLEANUP_AGE: std::time::Duration = std::time::Duration::from_secs(60 * 60);

/// Writes (or replaces) the turn marker for `session_id` via a temp file
/// plus rename, so a reader never observes a half-written file.
pub fn write(layout: &Layout, session_id: &str, turn_id: &str) -> crate::Result<()> {
    let state = TurnState::new(turn_id, session_id);
    let path = layout.turn_state_path(session_id);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, serde_json::to_string(&state)?)?;
    std::fs::rename(&tmp_path, &path)?;
    Ok(())
}

/// Reads the current turn marker for `session_id`, discarding (returning
/// `None` for) a file that belongs to a different session or has aged
/// past [`READ_TTL_MINUTES`]. A missing or unparsable file is also `None`
/// rather than an error — callers treat "no turn state" as the normal
/// case for the first event of an exchange.
pub fn read(layout: &Layout, session_id: &str) -> Option<TurnState> {
    let path = layout.turn_state_path(session_id);
    let content = std::fs::read_to_string(&path).ok()?;
    let state: TurnState = serde_json::from_str(&content).ok()?;

    if state.session_id != session_id {
        return None;
    }
    if state.is_stale(Utc::now(), Duration::minutes(READ_TTL_MINUTES)) {
        return None;
    }
    Some(state)
}

/// Removes a session's turn-state file outright, e.g. once its last turn
/// has produced an `agent_response` and there is nothing left to group.
pub fn clear(layout: &Layout, session_id: &str) {
    let _ = std::fs::remove_file(layout.turn_state_path(session_id));
}

/// Background sweep: deletes every `.turn-state-*.json` file under the
/// memory home whose modification time is older than [`CLEANUP_AGE`].
/// Returns the number of files removed; scan or stat failures for an
/// individual file are skipped rather than aborting the whole sweep.
pub fn cleanup_stale(layout: &Layout) -> usize {
    let entries = match std::fs::read_dir(layout.home()) {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let now = std::time::SystemTime::now();
    let mut removed = 0;

    for entry in entries.flatten() {
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();
        if !name.starts_with(".turn-state-") || !name.ends_with(".json") {
            continue;
        }

        let Ok(metadata) = entry.metadata() else {
            continue;
        };
        let Ok(modified) = metadata.modified() else {
            continue;
        };
        let Ok(age) = now.duration_since(modified) else {
            continue;
        };

        if age > CLEANUP_AGE && std::fs::remove_file(entry.path()).is_ok() {
            removed += 1;
        }
    }

    removed
}
