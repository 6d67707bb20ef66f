use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::SyncPosition;
use rusqlite::{params, OptionalExtension, Row};

impl EventLog {
    pub fn get_sync_position(&self, target_name: &str) -> Result<Option<SyncPosition>> {
        self.conn
            .query_row(
                "SELECT target_name, last_event_cursor, last_timestamp, updated_at \
                 FROM sync_positions WHERE target_name = ?1",
                [target_name],
                row_to_position,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn set_sync_position(&self, position: &SyncPosition) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sync_positions (target_name, last_event_cursor, last_timestamp, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(target_name) DO UPDATE SET
                last_event_cursor = ?2, last_timestamp = ?3, updated_at = ?4
            "#,
            params![
                position.target_name,
                position.last_event_cursor,
                position.last_timestamp.to_rfc3339(),
                position.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}

fn row_to_position(row: &Row) -> rusqlite::Result<SyncPosition> {
    let last_timestamp: String = row.get(2)?;
    let updated_at: String = row.get(3)?;

    Ok(SyncPosition {
        target_name: row.get(0)?,
        last_event_cursor: row.get(1)?,
        last_timestamp: DateTime::parse_from_rfc3339(&last_timestamp)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        updated_at: DateTime::parse_from_rfc3339(&updated_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_then_get_round_trips() {
        let log = EventLog::open_in_memory().unwrap();
        let mut pos = SyncPosition::initial("push:proj-a");
        pos.last_event_cursor = 7;
        log.set_sync_position(&pos).unwrap();

        let fetched = log.get_sync_position("push:proj-a").unwrap().unwrap();
        assert_eq!(fetched.last_event_cursor, 7);
    }

    #[test]
    fn missing_target_returns_none() {
        let log = EventLog::open_in_memory().unwrap();
        assert!(log.get_sync_position("nope").unwrap().is_none());
    }
}
