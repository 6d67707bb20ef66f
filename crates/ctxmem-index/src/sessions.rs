use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::Session;
use rusqlite::{params, OptionalExtension, Row};

impl EventLog {
    /// Append-or-update: a session row is created on first touch and
    /// updated in place thereafter (e.g. to set `ended_at`).
    pub fn upsert_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            r#"
            INSERT INTO sessions (id, started_at, ended_at, project_path, summary, tags)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                ended_at = COALESCE(?3, ended_at),
                project_path = COALESCE(?4, project_path),
                summary = COALESCE(?5, summary),
                tags = ?6
            "#,
            params![
                session.id,
                session.started_at.to_rfc3339(),
                session.ended_at.map(|t| t.to_rfc3339()),
                session.project_path,
                session.summary,
                serde_json::to_string(&session.tags).unwrap_or_else(|_| "[]".to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn end_session(&self, session_id: &str, ended_at: DateTime<Utc>) -> Result<()> {
        self.conn.execute(
            "UPDATE sessions SET ended_at = ?2 WHERE id = ?1",
            params![session_id, ended_at.to_rfc3339()],
        )?;
        Ok(())
    }

    pub fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        self.conn
            .query_row(
                "SELECT id, started_at, ended_at, project_path, summary, tags FROM sessions WHERE id = ?1",
                [session_id],
                row_to_session,
            )
            .optional()
            .map_err(Into::into)
    }

    pub fn list_sessions(&self, limit: usize) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, started_at, ended_at, project_path, summary, tags FROM sessions \
             ORDER BY started_at DESC LIMIT ?1",
        )?;
        let rows = stmt
            .query_map([limit as i64], row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
    let started_at: String = row.get(1)?;
    let ended_at: Option<String> = row.get(2)?;
    let tags: String = row.get(5)?;

    Ok(Session {
        id: row.get(0)?,
        started_at: DateTime::parse_from_rfc3339(&started_at)
            .map(|d| d.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now()),
        ended_at: ended_at.and_then(|t| DateTime::parse_from_rfc3339(&t).ok().map(|d| d.with_timezone(&Utc))),
        project_path: row.get(3)?,
        summary: row.get(4)?,
        tags: serde_json::from_str(&tags).unwrap_or_default(),
    })
}
