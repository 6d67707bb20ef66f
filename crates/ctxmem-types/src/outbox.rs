use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// What kind of row an outbox job refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Event,
    Entry,
    TaskTitle,
}

impl ItemKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemKind::Event => "event",
            ItemKind::Entry => "entry",
            ItemKind::TaskTitle => "task_title",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "event" => Some(ItemKind::Event),
            "entry" => Some(ItemKind::Entry),
            "task_title" => Some(ItemKind::TaskTitle),
            _ => None,
        }
    }
}

/// Lifecycle state of an outbox job. `Failed` jobs are returned to
/// `Pending` by the retry sweep; a job never observably leaves `Pending`
/// except by being claimed into `Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "processing" => Some(JobStatus::Processing),
            "done" => Some(JobStatus::Done),
            "failed" => Some(JobStatus::Failed),
            _ => None,
        }
    }
}

/// A transactional-outbox job: work that must eventually run exactly once
/// against an item (typically "compute and persist an embedding"), keyed
/// so that re-enqueueing the same `(item_kind, item_id, embedding_version)`
/// is a no-op rather than a duplicate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxJob {
    pub job_id: i64,
    pub item_kind: ItemKind,
    pub item_id: String,
    pub embedding_version: i64,
    pub status: JobStatus,
    pub retry_count: i64,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
