use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single retrieval-outcome record: logged when an event is retrieved
/// into a prompt, then scored post-hoc once the session reveals whether
/// the retrieval actually helped (C11).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpfulnessRecord {
    pub id: i64,
    pub event_id: String,
    pub session_id: String,
    pub retrieval_score: f64,
    pub query_preview: String,
    pub session_continued: Option<bool>,
    pub prompt_count_after: Option<i64>,
    pub tool_success_ratio: Option<f64>,
    pub was_reasked: Option<bool>,
    pub helpfulness_score: Option<f64>,
    pub measured_at: Option<DateTime<Utc>>,
}

impl HelpfulnessRecord {
    pub fn pending(
        event_id: impl Into<String>,
        session_id: impl Into<String>,
        retrieval_score: f64,
        query_preview: impl Into<String>,
    ) -> Self {
        Self {
            id: 0,
            event_id: event_id.into(),
            session_id: session_id.into(),
            retrieval_score,
            query_preview: query_preview.into(),
            session_continued: None,
            prompt_count_after: None,
            tool_success_ratio: None,
            was_reasked: None,
            helpfulness_score: None,
            measured_at: None,
        }
    }

    pub fn is_measured(&self) -> bool {
        self.helpfulness_score.is_some()
    }
}
