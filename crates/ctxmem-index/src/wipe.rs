use crate::connection::EventLog;
use crate::error::Result;
use crate::schema;

impl EventLog {
    /// Bulk-delete every event (and cascading dedupe/outbox/helpfulness/
    /// working-set state) for one session, for reimport only — this is not
    /// a normal operation, since events are otherwise immutable.
    ///
    /// FTS maintenance triggers are dropped before the bulk delete and
    /// recreated after, then the FTS table is rebuilt wholesale. Doing the
    /// delete under per-row triggers would work too, but dropping them
    /// first avoids a full FTS rewrite racing the delete transaction and
    /// makes a partial failure (crash mid-wipe) easy to resume: triggers
    /// missing is itself the signal that a wipe didn't finish, and
    /// `rebuild_fts` is safe to re-run unconditionally.
    pub fn delete_session_events(&self, session_id: &str) -> Result<usize> {
        schema::drop_fts_triggers(&self.conn)?;

        let result = (|| -> Result<usize> {
            let tx = self.conn.unchecked_transaction()?;

            let event_ids: Vec<String> = {
                let mut stmt = tx.prepare("SELECT id FROM events WHERE session_id = ?1")?;
                let ids = stmt
                    .query_map([session_id], |row| row.get::<_, String>(0))?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                ids
            };

            for id in &event_ids {
                tx.execute("DELETE FROM outbox WHERE item_id = ?1", [id])?;
            }
            tx.execute("DELETE FROM helpfulness WHERE session_id = ?1", [session_id])?;
            tx.execute("DELETE FROM working_set WHERE event_id IN (SELECT id FROM events WHERE session_id = ?1)", [session_id])?;
            let removed = tx.execute("DELETE FROM events WHERE session_id = ?1", [session_id])?;

            tx.commit()?;
            Ok(removed)
        })();

        schema::create_fts_triggers(&self.conn)?;
        schema::rebuild_fts(&self.conn)?;

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_types::{EventInput, EventType};

    #[test]
    fn wipe_clears_events_and_dedupe_state_for_reimport() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hello"), &[1])
            .unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s2", "other"), &[1])
            .unwrap();

        let removed = log.delete_session_events("s1").unwrap();
        assert_eq!(removed, 1);
        assert!(log.get_session_events("s1").unwrap().is_empty());
        assert_eq!(log.get_session_events("s2").unwrap().len(), 1);
        assert!(log.keyword_search("hello", 10).unwrap().is_empty());

        // Dedupe state cleared too: reinserting the same content succeeds.
        let outcome = log.append(EventInput::new(EventType::UserPrompt, "s1", "hello"), &[1]).unwrap();
        assert!(!outcome.is_duplicate);
    }
}
