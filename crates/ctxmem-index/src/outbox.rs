use crate::connection::EventLog;
use crate::error::Result;
use chrono::{DateTime, Duration, Utc};
use ctxmem_types::{ItemKind, JobStatus, OutboxJob};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

/// Aggregate counts surfaced to operators: `reconcile()` only reports
/// approximate recovered/retried counts because SQLite doesn't expose
/// affected-row counts from a bulk `UPDATE ... WHERE` the way a cursor-based
/// store would; treat `recovered`/`retried` below as indicative, not exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutboxMetrics {
    pub pending: i64,
    pub processing: i64,
    pub done: i64,
    pub failed: i64,
    pub oldest_pending_age_secs: Option<i64>,
}

const DEFAULT_MAX_RETRIES: i64 = 3;
const DEFAULT_STUCK_THRESHOLD_SECS: i64 = 5 * 60;

/// Enqueue inside an in-flight transaction, e.g. from `append`'s own
/// transaction. Unique on `(item_kind, item_id, embedding_version)`: a
/// second enqueue for the same triple is a no-op.
pub(crate) fn enqueue_tx(
    tx: &Transaction,
    item_kind: ItemKind,
    item_id: &str,
    embedding_version: i64,
) -> Result<()> {
    let now = Utc::now().to_rfc3339();
    tx.execute(
        r#"
        INSERT INTO outbox (item_kind, item_id, embedding_version, status, retry_count, created_at, updated_at)
        VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)
        ON CONFLICT(item_kind, item_id, embedding_version) DO NOTHING
        "#,
        params![item_kind.as_str(), item_id, embedding_version, now],
    )?;
    Ok(())
}

impl EventLog {
    /// Enqueue outside of `append`'s own transaction — used when an
    /// outbox item isn't itself a raw event (`entry`, `task_title`).
    pub fn enqueue(&self, item_kind: ItemKind, item_id: &str, embedding_version: i64) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            INSERT INTO outbox (item_kind, item_id, embedding_version, status, retry_count, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'pending', 0, ?4, ?4)
            ON CONFLICT(item_kind, item_id, embedding_version) DO NOTHING
            "#,
            params![item_kind.as_str(), item_id, embedding_version, now],
        )?;
        Ok(())
    }

    /// Atomically select up to `limit` pending jobs ordered by age, flip
    /// them to `processing`, and return them. One statement handles the
    /// select-then-update so no other claimer can observe the same rows
    /// as still pending.
    pub fn claim_outbox_jobs(&self, limit: usize) -> Result<Vec<OutboxJob>> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare(
            r#"
            UPDATE outbox SET status = 'processing', updated_at = ?1
            WHERE job_id IN (
                SELECT job_id FROM outbox WHERE status = 'pending'
                ORDER BY created_at ASC LIMIT ?2
            )
            RETURNING job_id, item_kind, item_id, embedding_version, status,
                      retry_count, error, created_at, updated_at
            "#,
        )?;
        let rows = stmt
            .query_map(params![now, limit as i64], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Same as [`EventLog::claim_outbox_jobs`] but scoped to one
    /// `embedding_version`, so a worker draining version 2 never steals
    /// work that belongs to the still-running version-1 worker during a
    /// reindex. Per component C4: "Single-writer loop per
    /// `embedding_version`."
    pub fn claim_outbox_jobs_for_version(&self, embedding_version: i64, limit: usize) -> Result<Vec<OutboxJob>> {
        let now = Utc::now().to_rfc3339();
        let mut stmt = self.conn.prepare(
            r#"
            UPDATE outbox SET status = 'processing', updated_at = ?1
            WHERE job_id IN (
                SELECT job_id FROM outbox WHERE status = 'pending' AND embedding_version = ?2
                ORDER BY created_at ASC LIMIT ?3
            )
            RETURNING job_id, item_kind, item_id, embedding_version, status,
                      retry_count, error, created_at, updated_at
            "#,
        )?;
        let rows = stmt
            .query_map(params![now, embedding_version, limit as i64], row_to_job)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn mark_outbox_done(&self, job_id: i64) -> Result<()> {
        self.conn.execute(
            "UPDATE outbox SET status = 'done', updated_at = ?2, error = NULL WHERE job_id = ?1 AND status = 'processing'",
            params![job_id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// `processing -> pending` (increment retry) while `retry_count <
    /// max_retries`, else `processing -> failed`.
    pub fn mark_outbox_failed(&self, job_id: i64, err: &str) -> Result<()> {
        self.mark_outbox_failed_with_max_retries(job_id, err, DEFAULT_MAX_RETRIES)
    }

    pub fn mark_outbox_failed_with_max_retries(
        &self,
        job_id: i64,
        err: &str,
        max_retries: i64,
    ) -> Result<()> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            r#"
            UPDATE outbox SET
                status = CASE WHEN retry_count + 1 < ?3 THEN 'pending' ELSE 'failed' END,
                retry_count = retry_count + 1,
                error = ?2,
                updated_at = ?4
            WHERE job_id = ?1 AND status = 'processing'
            "#,
            params![job_id, err, max_retries, now],
        )?;
        Ok(())
    }

    /// Crash recovery: any `processing` job untouched for longer than
    /// `stuck_threshold` goes back to `pending`; `failed` jobs still under
    /// `max_retries` also go back to `pending`. Returns approximate counts
    /// — see [`OutboxMetrics`] doc comment.
    pub fn reconcile_outbox(&self) -> Result<(i64, i64)> {
        self.reconcile_outbox_with(Duration::seconds(DEFAULT_STUCK_THRESHOLD_SECS), DEFAULT_MAX_RETRIES)
    }

    pub fn reconcile_outbox_with(
        &self,
        stuck_threshold: Duration,
        max_retries: i64,
    ) -> Result<(i64, i64)> {
        let now = Utc::now();
        let stuck_before = (now - stuck_threshold).to_rfc3339();

        let recovered = self.conn.execute(
            "UPDATE outbox SET status = 'pending', updated_at = ?1 \
             WHERE status = 'processing' AND updated_at < ?2",
            params![now.to_rfc3339(), stuck_before],
        )? as i64;

        let retried = self.conn.execute(
            "UPDATE outbox SET status = 'pending', updated_at = ?1 \
             WHERE status = 'failed' AND retry_count < ?2",
            params![now.to_rfc3339(), max_retries],
        )? as i64;

        Ok((recovered, retried))
    }

    /// Hard-delete `done` jobs older than `retention`.
    pub fn cleanup_outbox(&self, retention: Duration) -> Result<usize> {
        let cutoff = (Utc::now() - retention).to_rfc3339();
        let removed = self
            .conn
            .execute("DELETE FROM outbox WHERE status = 'done' AND updated_at < ?1", [cutoff])?;
        Ok(removed)
    }

    pub fn outbox_metrics(&self) -> Result<OutboxMetrics> {
        outbox_metrics(&self.conn)
    }
}

pub(crate) fn outbox_metrics(conn: &Connection) -> Result<OutboxMetrics> {
    let mut metrics = OutboxMetrics::default();
    let mut stmt = conn.prepare("SELECT status, COUNT(*) FROM outbox GROUP BY status")?;
    let rows = stmt.query_map([], |row| {
        Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
    })?;
    for row in rows {
        let (status, count) = row?;
        match status.as_str() {
            "pending" => metrics.pending = count,
            "processing" => metrics.processing = count,
            "done" => metrics.done = count,
            "failed" => metrics.failed = count,
            _ => {}
        }
    }

    let oldest: Option<String> = conn
        .query_row(
            "SELECT created_at FROM outbox WHERE status = 'pending' ORDER BY created_at ASC LIMIT 1",
            [],
            |row| row.get(0),
        )
        .optional()?;
    metrics.oldest_pending_age_secs = oldest
        .and_then(|ts| DateTime::parse_from_rfc3339(&ts).ok())
        .map(|ts| (Utc::now() - ts.with_timezone(&Utc)).num_seconds());

    Ok(metrics)
}

fn row_to_job(row: &Row) -> rusqlite::Result<OutboxJob> {
    let item_kind_str: String = row.get(1)?;
    let status_str: String = row.get(4)?;
    let created_at: String = row.get(7)?;
    let updated_at: String = row.get(8)?;

    Ok(OutboxJob {
        job_id: row.get(0)?,
        item_kind: ItemKind::parse(&item_kind_str).unwrap_or(ItemKind::Event),
        item_id: row.get(2)?,
        embedding_version: row.get(3)?,
        status: JobStatus::parse(&status_str).unwrap_or(JobStatus::Pending),
        retry_count: row.get(5)?,
        error: row.get(6)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
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
    use ctxmem_types::{EventInput, EventType};

    #[test]
    fn claim_flips_pending_to_processing() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hi"), &[1])
            .unwrap();

        let jobs = log.claim_outbox_jobs(10).unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].status, JobStatus::Processing);

        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.processing, 1);
        assert_eq!(metrics.pending, 0);
    }

    #[test]
    fn done_job_never_regresses() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hi"), &[1])
            .unwrap();
        let jobs = log.claim_outbox_jobs(10).unwrap();
        log.mark_outbox_done(jobs[0].job_id).unwrap();

        // Marking done again (already not processing) has no effect.
        log.mark_outbox_done(jobs[0].job_id).unwrap();
        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.done, 1);
        assert_eq!(metrics.failed, 0);
    }

    #[test]
    fn failed_job_exhausts_retries_then_terminal() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hi"), &[1])
            .unwrap();

        for _ in 0..3 {
            let jobs = log.claim_outbox_jobs(10).unwrap();
            log.mark_outbox_failed(jobs[0].job_id, "boom").unwrap();
            let (_, retried) = log.reconcile_outbox().unwrap();
            if retried == 0 {
                break;
            }
        }

        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.failed, 1);
        assert_eq!(metrics.pending, 0);
    }

    #[test]
    fn reconcile_recovers_stuck_processing_jobs() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hi"), &[1])
            .unwrap();
        log.claim_outbox_jobs(10).unwrap();

        // Force the job to look old by backdating updated_at directly.
        log.conn
            .execute(
                "UPDATE outbox SET updated_at = ?1",
                [(Utc::now() - Duration::hours(1)).to_rfc3339()],
            )
            .unwrap();

        let (recovered, _) = log.reconcile_outbox().unwrap();
        assert_eq!(recovered, 1);
        assert_eq!(log.outbox_metrics().unwrap().pending, 1);
    }

    #[test]
    fn claim_for_version_ignores_jobs_from_other_versions() {
        let mut log = EventLog::open_in_memory().unwrap();
        log.append(EventInput::new(EventType::UserPrompt, "s1", "hi"), &[1, 2])
            .unwrap();

        let v2_jobs = log.claim_outbox_jobs_for_version(2, 10).unwrap();
        assert_eq!(v2_jobs.len(), 1);
        assert_eq!(v2_jobs[0].embedding_version, 2);

        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.pending, 1, "the version-1 job must remain untouched");
    }

    #[test]
    fn enqueue_is_idempotent_per_version() {
        let log = EventLog::open_in_memory().unwrap();
        log.enqueue(ItemKind::Entry, "entry-1", 1).unwrap();
        log.enqueue(ItemKind::Entry, "entry-1", 1).unwrap();
        let metrics = log.outbox_metrics().unwrap();
        assert_eq!(metrics.pending, 1);
    }
}
