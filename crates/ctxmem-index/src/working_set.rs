use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::WorkingSetItem;
use rusqlite::{params, Row};

impl EventLog {
    pub fn insert_working_set_item(
        &self,
        event_id: &str,
        relevance: f64,
        topics: &[String],
        expires_at: DateTime<Utc>,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO working_set (event_id, added_at, relevance, topics, expires_at) \
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                event_id,
                Utc::now().to_rfc3339(),
                relevance,
                serde_json::to_string(topics).unwrap_or_else(|_| "[]".to_string()),
                expires_at.to_rfc3339(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Reset an item's TTL (rehearsal): the event stays salient a while
    /// longer instead of aging out on schedule.
    pub fn refresh_working_set_item(&self, event_id: &str, expires_at: DateTime<Utc>) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE working_set SET expires_at = ?2 WHERE event_id = ?1",
            params![event_id, expires_at.to_rfc3339()],
        )?;
        Ok(updated > 0)
    }

    pub fn list_working_set(&self) -> Result<Vec<WorkingSetItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, added_at, relevance, topics, expires_at FROM working_set \
             ORDER BY added_at ASC",
        )?;
        let rows = stmt
            .query_map([], row_to_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn expire_working_set(&self, now: DateTime<Utc>) -> Result<usize> {
        let removed = self
            .conn
            .execute("DELETE FROM working_set WHERE expires_at < ?1", [now.to_rfc3339()])?;
        Ok(removed)
    }

    /// Drop the lowest-relevance, oldest-first rows until the set is at
    /// most `max_events` long.
    pub fn trim_working_set(&self, max_events: usize) -> Result<usize> {
        let current: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM working_set", [], |r| r.get(0))?;
        let overflow = (current as usize).saturating_sub(max_events);
        if overflow == 0 {
            return Ok(0);
        }
        let removed = self.conn.execute(
            "DELETE FROM working_set WHERE id IN ( \
                SELECT id FROM working_set ORDER BY relevance ASC, added_at ASC LIMIT ?1 \
             )",
            [overflow as i64],
        )?;
        Ok(removed)
    }

    pub fn delete_working_set_items(&self, ids: &[i64]) -> Result<usize> {
        let mut removed = 0;
        for id in ids {
            removed += self.conn.execute("DELETE FROM working_set WHERE id = ?1", [id])?;
        }
        Ok(removed)
    }
}

fn row_to_item(row: &Row) -> rusqlite::Result<WorkingSetItem> {
    let added_at: String = row.get(2)?;
    let topics: String = row.get(4)?;
    let expires_at: String = row.get(5)?;

    Ok(WorkingSetItem {
        id: row.get(0)?,
        event_id: row.get(1)?,
        added_at: DateTime::parse_from_rfc3339(&added_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        relevance: row.get(3)?,
        topics: serde_json::from_str(&topics).unwrap_or_default(),
        expires_at: DateTime::parse_from_rfc3339(&expires_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn expire_working_set_removes_only_stale_rows() {
        let log = EventLog::open_in_memory().unwrap();
        let now = Utc::now();
        log.insert_working_set_item("e1", 0.5, &[], now - Duration::hours(1))
            .unwrap();
        log.insert_working_set_item("e2", 0.5, &[], now + Duration::hours(1))
            .unwrap();

        let removed = log.expire_working_set(now).unwrap();
        assert_eq!(removed, 1);
        assert_eq!(log.list_working_set().unwrap().len(), 1);
    }

    #[test]
    fn trim_working_set_drops_lowest_relevance_first() {
        let log = EventLog::open_in_memory().unwrap();
        let future = Utc::now() + Duration::hours(1);
        log.insert_working_set_item("low", 0.1, &[], future).unwrap();
        log.insert_working_set_item("high", 0.9, &[], future).unwrap();

        let removed = log.trim_working_set(1).unwrap();
        assert_eq!(removed, 1);
        let remaining = log.list_working_set().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].event_id, "high");
    }
}
