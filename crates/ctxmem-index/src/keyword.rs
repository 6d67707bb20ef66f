use crate::connection::EventLog;
use crate::error::Result;
use crate::events::row_to_event;
use ctxmem_types::Event;

/// One keyword hit: the matched event plus its source rank (lower is
/// better — callers normalize this into a bounded `[0, 1]` lexical score,
/// not this module's concern).
#[derive(Debug, Clone)]
pub struct KeywordHit {
    pub event: Event,
    pub rank: f64,
}

impl EventLog {
    /// Prefix-ORed token match against the FTS5 index kept in sync by
    /// triggers on `events`. Falls back to a plain substring scan if the
    /// FTS structure is missing or corrupt (self-repair happens in
    /// [`EventLog::delete_session_events`]'s trigger dance, not here —
    /// this fallback just keeps search available in the meantime).
    pub fn keyword_search(&self, query: &str, limit: usize) -> Result<Vec<KeywordHit>> {
        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match self.keyword_search_fts(&tokens, limit) {
            Ok(hits) => Ok(hits),
            Err(_) => self.keyword_search_substring(&tokens, limit),
        }
    }

    fn keyword_search_fts(&self, tokens: &[String], limit: usize) -> Result<Vec<KeywordHit>> {
        let match_expr = tokens
            .iter()
            .map(|t| format!("{}*", escape_fts_token(t)))
            .collect::<Vec<_>>()
            .join(" OR ");

        let mut stmt = self.conn.prepare(
            r#"
            SELECT e.rowid, e.id, e.event_type, e.session_id, e.turn_id, e.timestamp,
                   e.content, e.canonical_key, e.dedupe_key, e.metadata, f.rank
            FROM events_fts f
            JOIN events e ON e.rowid = f.rowid
            WHERE events_fts MATCH ?1
            ORDER BY f.rank
            LIMIT ?2
            "#,
        )?;

        let rows = stmt
            .query_map(rusqlite::params![match_expr, limit as i64], |row| {
                let event = row_to_event(row)?;
                let rank: f64 = row.get(10)?;
                Ok(KeywordHit { event, rank })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    fn keyword_search_substring(&self, tokens: &[String], limit: usize) -> Result<Vec<KeywordHit>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events ORDER BY rowid DESC",
        )?;
        let mut hits = Vec::new();
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let event = row_to_event(row)?;
            let lowered = event.content.to_lowercase();
            let matched = tokens.iter().filter(|t| lowered.contains(t.as_str())).count();
            if matched > 0 {
                // Lower rank is better, matching FTS convention: more
                // matched tokens -> lower (better) synthetic rank.
                let rank = -(matched as f64);
                hits.push(KeywordHit { event, rank });
            }
            if hits.len() >= limit * 4 {
                break;
            }
        }
        hits.sort_by(|a, b| a.rank.total_cmp(&b.rank));
        hits.truncate(limit);
        Ok(hits)
    }
}

fn tokenize(query: &str) -> Vec<String> {
    query
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect()
}

fn escape_fts_token(token: &str) -> String {
    token.chars().filter(|c| c.is_alphanumeric()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_types::{EventInput, EventType};

    #[test]
    fn finds_events_by_token_prefix() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(
            EventInput::new(EventType::UserPrompt, "s1", "skip after-lunch summaries"),
            &[1],
        )
        .unwrap();
        log.append(
            EventInput::new(EventType::UserPrompt, "s1", "morning briefing preference"),
            &[1],
        )
        .unwrap();

        let hits = log.keyword_search("briefing", 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert!(hits[0].event.content.contains("briefing"));
    }

    #[test]
    fn empty_query_returns_no_hits() {
        let log = EventLog::open_in_memory().unwrap();
        assert!(log.keyword_search("   ", 10).unwrap().is_empty());
    }
}
