use crate::connection::EventLog;
use crate::error::{Error, Result};
use crate::outbox;
use chrono::{DateTime, Utc};
use ctxmem_core::canon;
use ctxmem_types::{Event, EventInput, EventType, ItemKind, Metadata, Session};
use rusqlite::{params, OptionalExtension, Row};

/// Outcome of [`EventLog::append`]. `is_duplicate` mirrors the `Conflict`
/// error kind from the design: a dedupe hit is surfaced as data, not an
/// error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppendOutcome {
    pub id: String,
    pub is_duplicate: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    pub inserted: usize,
    pub skipped: usize,
}

impl EventLog {
    /// Embedding versions enqueued for every freshly appended event.
    /// A deployment that rebuilds its vector index under a new version
    /// adds it here and drains the outbox under both versions until the
    /// old one is retired.
    pub fn append(&mut self, input: EventInput, embedding_versions: &[i64]) -> Result<AppendOutcome> {
        if input.content.is_empty() {
            return Err(Error::InputInvalid("event content must not be empty".into()));
        }
        if input.session_id.is_empty() {
            return Err(Error::InputInvalid("session_id must not be empty".into()));
        }

        let dedupe_key = input
            .dedupe_key
            .clone()
            .unwrap_or_else(|| canon::dedupe_key(&input.content, &input.session_id));

        if let Some(existing_id) = self.find_id_by_dedupe_key(&dedupe_key)? {
            return Ok(AppendOutcome {
                id: existing_id,
                is_duplicate: true,
            });
        }

        let id = input.id.clone().unwrap_or_else(Event::new_id);
        let canonical_key = input
            .canonical_key
            .clone()
            .unwrap_or_else(|| canon::canonical_key(&input.content, None));

        let tx = self.conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO events
                (id, event_type, session_id, turn_id, timestamp, content,
                 canonical_key, dedupe_key, metadata, access_count, level)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0)
            "#,
            params![
                id,
                input.event_type.as_str(),
                input.session_id,
                input.turn_id,
                input.timestamp.to_rfc3339(),
                input.content,
                canonical_key,
                dedupe_key,
                input.metadata.to_json_string(),
            ],
        )?;

        for version in embedding_versions {
            outbox::enqueue_tx(&tx, ItemKind::Event, &id, *version)?;
        }

        tx.commit()?;
        self.upsert_session(&Session::new(input.session_id))?;

        Ok(AppendOutcome {
            id,
            is_duplicate: false,
        })
    }

    /// Replay path used by the replicator (C9): preserves the caller's
    /// `id`/`canonical_key`/`dedupe_key` instead of deriving them, and
    /// skips silently on either a duplicate `id` or a duplicate
    /// `dedupe_key` so that re-pulling the same remote batch is a no-op.
    pub fn import_events(
        &mut self,
        batch: Vec<EventInput>,
        embedding_versions: &[i64],
    ) -> Result<ImportOutcome> {
        let mut outcome = ImportOutcome::default();

        for input in batch {
            let id = input
                .id
                .clone()
                .ok_or_else(|| Error::InputInvalid("import_events requires a supplied id".into()))?;
            let canonical_key = input.canonical_key.clone().unwrap_or_else(|| {
                canon::canonical_key(&input.content, None)
            });
            let dedupe_key = input
                .dedupe_key
                .clone()
                .unwrap_or_else(|| canon::dedupe_key(&input.content, &input.session_id));

            if self.get_by_id(&id)?.is_some() || self.find_id_by_dedupe_key(&dedupe_key)?.is_some() {
                outcome.skipped += 1;
                continue;
            }

            let tx = self.conn.transaction()?;
            tx.execute(
                r#"
                INSERT INTO events
                    (id, event_type, session_id, turn_id, timestamp, content,
                     canonical_key, dedupe_key, metadata, access_count, level)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 0, 0)
                "#,
                params![
                    id,
                    input.event_type.as_str(),
                    input.session_id,
                    input.turn_id,
                    input.timestamp.to_rfc3339(),
                    input.content,
                    canonical_key,
                    dedupe_key,
                    input.metadata.to_json_string(),
                ],
            )?;
            for version in embedding_versions {
                outbox::enqueue_tx(&tx, ItemKind::Event, &id, *version)?;
            }
            tx.commit()?;
            self.upsert_session(&Session::new(input.session_id))?;
            outcome.inserted += 1;
        }

        Ok(outcome)
    }

    pub fn get_by_id(&self, id: &str) -> Result<Option<Event>> {
        self.conn
            .query_row(
                "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
                 canonical_key, dedupe_key, metadata FROM events WHERE id = ?1",
                [id],
                row_to_event,
            )
            .optional()
            .map_err(Error::from)
    }

    fn find_id_by_dedupe_key(&self, dedupe_key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT id FROM events WHERE dedupe_key = ?1",
                [dedupe_key],
                |row| row.get(0),
            )
            .optional()
            .map_err(Error::from)
    }

    /// Events of one session, in insertion (`rowid`) order — the only
    /// order consumers may rely on for correctness.
    pub fn get_session_events(&self, session_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events WHERE session_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([session_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_events_by_turn(&self, turn_id: &str) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events WHERE turn_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt
            .query_map([turn_id], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn recent_events(&self, limit: usize) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events ORDER BY rowid DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn get_events_by_level(&self, level: i64, limit: usize) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events WHERE level = ?1 ORDER BY rowid DESC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![level, limit as i64], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Batched cursor read for the replicator's push loop: events with
    /// `rowid > since_rowid`, ascending, capped at `limit`.
    pub fn events_since_rowid(&self, since_rowid: i64, limit: usize) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events WHERE rowid > ?1 ORDER BY rowid ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![since_rowid, limit as i64], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn events_since_timestamp(
        &self,
        since: DateTime<Utc>,
        limit: usize,
    ) -> Result<Vec<Event>> {
        let mut stmt = self.conn.prepare(
            "SELECT rowid, id, event_type, session_id, turn_id, timestamp, content, \
             canonical_key, dedupe_key, metadata FROM events WHERE timestamp > ?1 \
             ORDER BY timestamp ASC LIMIT ?2",
        )?;
        let rows = stmt
            .query_map(params![since.to_rfc3339(), limit as i64], row_to_event)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn increment_access_count(&self, ids: &[String]) -> Result<()> {
        let tx_needed = ids.len() > 1;
        if tx_needed {
            let tx = self.conn.unchecked_transaction()?;
            for id in ids {
                tx.execute(
                    "UPDATE events SET access_count = access_count + 1 WHERE id = ?1",
                    [id],
                )?;
            }
            tx.commit()?;
        } else if let Some(id) = ids.first() {
            self.conn.execute(
                "UPDATE events SET access_count = access_count + 1 WHERE id = ?1",
                [id],
            )?;
        }
        Ok(())
    }
}

pub(crate) fn row_to_event(row: &Row) -> rusqlite::Result<Event> {
    let event_type_str: String = row.get(2)?;
    let timestamp_str: String = row.get(5)?;
    let metadata_str: String = row.get(9)?;

    Ok(Event {
        rowid: row.get(0)?,
        id: row.get(1)?,
        event_type: EventType::parse(&event_type_str).unwrap_or(EventType::UserPrompt),
        session_id: row.get(3)?,
        turn_id: row.get(4)?,
        timestamp: DateTime::parse_from_rfc3339(&timestamp_str)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        content: row.get(6)?,
        canonical_key: row.get(7)?,
        dedupe_key: row.get(8)?,
        metadata: Metadata::from_json_str(&metadata_str),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(session: &str, content: &str) -> EventInput {
        EventInput::new(EventType::UserPrompt, session, content)
    }

    #[test]
    fn append_twice_is_idempotent() {
        let mut log = EventLog::open_in_memory().unwrap();
        let first = log.append(input("s1", "hello"), &[1]).unwrap();
        let second = log.append(input("s1", "hello"), &[1]).unwrap();

        assert!(!first.is_duplicate);
        assert!(second.is_duplicate);
        assert_eq!(first.id, second.id);
        assert_eq!(log.get_session_events("s1").unwrap().len(), 1);
    }

    #[test]
    fn different_sessions_never_collide_on_identical_content() {
        let mut log = EventLog::open_in_memory().unwrap();
        let a = log.append(input("s1", "same"), &[1]).unwrap();
        let b = log.append(input("s2", "same"), &[1]).unwrap();
        assert_ne!(a.id, b.id);
        assert!(!b.is_duplicate);
    }

    #[test]
    fn rowid_is_strictly_increasing() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(input("s1", "one"), &[1]).unwrap();
        log.append(input("s1", "two"), &[1]).unwrap();
        log.append(input("s1", "three"), &[1]).unwrap();

        let events = log.get_session_events("s1").unwrap();
        let rowids: Vec<i64> = events.iter().map(|e| e.rowid).collect();
        let mut sorted = rowids.clone();
        sorted.sort();
        assert_eq!(rowids, sorted);
        assert!(rowids.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn append_enqueues_one_outbox_job_per_embedding_version() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(input("s1", "hello"), &[1, 2]).unwrap();
        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.pending, 2);
    }

    #[test]
    fn import_events_is_idempotent_under_replay() {
        let mut log = EventLog::open_in_memory().unwrap();
        let mut e = input("s1", "hello");
        e.id = Some("fixed-id".to_string());
        e.canonical_key = Some("hello".to_string());
        e.dedupe_key = Some("s1:deadbeef".to_string());

        let first = log.import_events(vec![e.clone()], &[1]).unwrap();
        let second = log.import_events(vec![e], &[1]).unwrap();

        assert_eq!(first.inserted, 1);
        assert_eq!(second.inserted, 0);
        assert_eq!(second.skipped, 1);
    }

    #[test]
    fn turn_grouping_links_prompt_tools_and_response() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(input("s1", "prompt").with_turn_id("T1"), &[1])
            .unwrap();
        for i in 0..3 {
            log.append(
                EventInput::new(EventType::ToolObservation, "s1", format!("tool {}", i))
                    .with_turn_id("T1"),
                &[1],
            )
            .unwrap();
        }
        log.append(
            EventInput::new(EventType::AgentResponse, "s1", "response").with_turn_id("T1"),
            &[1],
        )
        .unwrap();

        assert_eq!(log.get_events_by_turn("T1").unwrap().len(), 5);
    }
}
