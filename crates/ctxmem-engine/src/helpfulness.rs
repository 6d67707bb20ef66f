use crate::error::Result;
use chrono::Utc;
use ctxmem_index::EventLog;
use ctxmem_types::{EventType, HelpfulnessRecord};
use std::collections::HashSet;

/// Scores every unmeasured retrieval logged for a session against what
/// actually happened afterward.
///
/// `HelpfulnessRecord` carries no timestamp or rowid of its own (see the
/// data model), so "events after the retrieval" is anchored to the
/// `rowid` of the event that was retrieved — the point in the session's
/// timeline the surfaced memory originated from. This slightly overcounts
/// when a memory is retrieved long after ingestion, but there is no other
/// ordering field available to anchor on.
pub fn evaluate_session_helpfulness(log: &EventLog, session_id: &str) -> Result<Vec<HelpfulnessRecord>> {
    let pending = log.list_unmeasured_helpfulness(session_id)?;
    if pending.is_empty() {
        return Ok(Vec::new());
    }

    let session_events = log.get_session_events(session_id)?;
    let mut measured = Vec::with_capacity(pending.len());

    for mut record in pending {
        let anchor_rowid = log
            .get_by_id(&record.event_id)?
            .map(|e| e.rowid)
            .unwrap_or(i64::MAX);

        let events_after: Vec<_> = session_events.iter().filter(|e| e.rowid > anchor_rowid).collect();

        let session_continued = !events_after.is_empty();
        let prompt_count_after = events_after.iter().filter(|e| e.event_type == EventType::UserPrompt).count() as i64;

        let tool_observations: Vec<_> = events_after
            .iter()
            .filter(|e| e.event_type == EventType::ToolObservation)
            .collect();
        let tool_success_ratio = if tool_observations.is_empty() {
            1.0
        } else {
            let successes = tool_observations.iter().filter(|e| tool_call_succeeded(&e.content)).count();
            successes as f64 / tool_observations.len() as f64
        };

        let was_reasked = events_after
            .iter()
            .filter(|e| e.event_type == EventType::UserPrompt)
            .any(|e| reask_overlap(&record.query_preview, &e.content) > 0.5);

        let helpfulness_score = 0.30 * record.retrieval_score.min(1.0)
            + 0.25 * bool_to_f64(session_continued)
            + 0.25 * tool_success_ratio
            + 0.20 * (1.0 - bool_to_f64(was_reasked));

        record.session_continued = Some(session_continued);
        record.prompt_count_after = Some(prompt_count_after);
        record.tool_success_ratio = Some(tool_success_ratio);
        record.was_reasked = Some(was_reasked);
        record.helpfulness_score = Some(helpfulness_score.clamp(0.0, 1.0));
        record.measured_at = Some(Utc::now());

        log.mark_helpfulness_measured(&record)?;
        measured.push(record);
    }

    Ok(measured)
}

fn bool_to_f64(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

/// Per §4.11: parsed from a JSON `success` field on the observation's
/// content; unparseable content is assumed successful.
fn tool_call_succeeded(content: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(content)
        .ok()
        .and_then(|v| v.get("success").and_then(|s| s.as_bool()))
        .unwrap_or(true)
}

/// Fraction of the original query's tokens (length ≥ 3) that reappear in
/// a later prompt — a re-ask signal, not a relevance score.
fn reask_overlap(original_query: &str, later_prompt: &str) -> f64 {
    let original: HashSet<String> = tokenize_min_len(original_query, 3);
    if original.is_empty() {
        return 0.0;
    }
    let later = tokenize_min_len(later_prompt, 3);
    let matched = original.iter().filter(|t| later.contains(*t)).count();
    matched as f64 / original.len() as f64
}

fn tokenize_min_len(text: &str, min_len: usize) -> HashSet<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= min_len)
        .map(|t| t.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_types::EventInput;

    #[test]
    fn continuation_and_clean_tool_runs_score_above_a_dead_end() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "how do I retry a failed job"), &[1])
            .unwrap();
        let anchor = log.get_session_events("s1").unwrap().pop().unwrap();
        log.record_retrieval(&anchor.id, "s1", 0.9, "how do I retry a failed job").unwrap();

        log.append(
            EventInput::new(EventType::ToolObservation, "s1", r#"{"success": true}"#),
            &[1],
        )
        .unwrap();
        log.append(EventInput::new(EventType::AgentResponse, "s1", "done"), &[1]).unwrap();

        let measured = evaluate_session_helpfulness(&log, "s1").unwrap();
        assert_eq!(measured.len(), 1);
        assert_eq!(measured[0].session_continued, Some(true));
        assert_eq!(measured[0].tool_success_ratio, Some(1.0));
        assert!(measured[0].helpfulness_score.unwrap() > 0.7);
    }

    #[test]
    fn a_near_identical_followup_prompt_is_flagged_as_a_reask() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "how do I retry a failed background job"), &[1])
            .unwrap();
        let anchor = log.get_session_events("s1").unwrap().pop().unwrap();
        log.record_retrieval(&anchor.id, "s1", 0.9, "how do I retry a failed background job").unwrap();

        log.append(
            EventInput::new(EventType::UserPrompt, "s1", "how do I retry a failed background job again"),
            &[1],
        )
        .unwrap();

        let measured = evaluate_session_helpfulness(&log, "s1").unwrap();
        assert_eq!(measured[0].was_reasked, Some(true));
    }

    #[test]
    fn helpfulness_score_always_stays_within_bounds() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hello"), &[1]).unwrap();
        let anchor = log.get_session_events("s1").unwrap().pop().unwrap();
        log.record_retrieval(&anchor.id, "s1", 1.5, "hello").unwrap();

        let measured = evaluate_session_helpfulness(&log, "s1").unwrap();
        let score = measured[0].helpfulness_score.unwrap();
        assert!((0.0..=1.0).contains(&score));
    }
}
