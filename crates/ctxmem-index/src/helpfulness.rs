use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_types::HelpfulnessRecord;
use rusqlite::{params, Row};

impl EventLog {
    pub fn record_retrieval(
        &self,
        event_id: &str,
        session_id: &str,
        score: f64,
        query: &str,
    ) -> Result<i64> {
        self.conn.execute(
            "INSERT INTO helpfulness (event_id, session_id, retrieval_score, query_preview) \
             VALUES (?1, ?2, ?3, ?4)",
            params![event_id, session_id, score, query_preview(query)],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn list_unmeasured_helpfulness(&self, session_id: &str) -> Result<Vec<HelpfulnessRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, event_id, session_id, retrieval_score, query_preview, session_continued, \
             prompt_count_after, tool_success_ratio, was_reasked, helpfulness_score, measured_at \
             FROM helpfulness WHERE session_id = ?1 AND measured_at IS NULL",
        )?;
        let rows = stmt
            .query_map([session_id], row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn mark_helpfulness_measured(&self, record: &HelpfulnessRecord) -> Result<()> {
        self.conn.execute(
            r#"
            UPDATE helpfulness SET
                session_continued = ?2, prompt_count_after = ?3, tool_success_ratio = ?4,
                was_reasked = ?5, helpfulness_score = ?6, measured_at = ?7
            WHERE id = ?1
            "#,
            params![
                record.id,
                record.session_continued,
                record.prompt_count_after,
                record.tool_success_ratio,
                record.was_reasked,
                record.helpfulness_score,
                record
                    .measured_at
                    .map(|t| t.to_rfc3339())
                    .unwrap_or_else(|| Utc::now().to_rfc3339()),
            ],
        )?;
        Ok(())
    }
}

fn query_preview(query: &str) -> String {
    query.chars().take(200).collect()
}

fn row_to_record(row: &Row) -> rusqlite::Result<HelpfulnessRecord> {
    let measured_at: Option<String> = row.get(10)?;
    Ok(HelpfulnessRecord {
        id: row.get(0)?,
        event_id: row.get(1)?,
        session_id: row.get(2)?,
        retrieval_score: row.get(3)?,
        query_preview: row.get(4)?,
        session_continued: row.get::<_, Option<i64>>(5)?.map(|v| v != 0),
        prompt_count_after: row.get(6)?,
        tool_success_ratio: row.get(7)?,
        was_reasked: row.get::<_, Option<i64>>(8)?.map(|v| v != 0),
        helpfulness_score: row.get(9)?,
        measured_at: measured_at.and_then(|t| DateTime::parse_from_rfc3339(&t).ok().map(|d| d.with_timezone(&Utc))),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_retrieval_starts_unmeasured() {
        let log = EventLog::open_in_memory().unwrap();
        log.record_retrieval("e1", "s1", 0.8, "how do I retry").unwrap();
        let pending = log.list_unmeasured_helpfulness("s1").unwrap();
        assert_eq!(pending.len(), 1);
        assert!(!pending[0].is_measured());
    }

    #[test]
    fn marking_measured_removes_it_from_the_pending_list() {
        let log = EventLog::open_in_memory().unwrap();
        log.record_retrieval("e1", "s1", 0.8, "q").unwrap();
        let mut record = log.list_unmeasured_helpfulness("s1").unwrap().remove(0);
        record.helpfulness_score = Some(0.5);
        record.measured_at = Some(Utc::now());
        log.mark_helpfulness_measured(&record).unwrap();

        assert!(log.list_unmeasured_helpfulness("s1").unwrap().is_empty());
    }
}
