use crate::error::Result;
use chrono::{Duration, Utc};
use ctxmem_index::EventLog;

#[derive(Debug, Clone, Copy)]
pub struct WorkingSetConfig {
    pub window_hours: i64,
    pub max_events: usize,
}

impl Default for WorkingSetConfig {
    fn default() -> Self {
        Self {
            window_hours: 24,
            max_events: 100,
        }
    }
}

/// Adds an event to the working set, then expires stale rows and trims
/// down to `max_events` (lowest-relevance, oldest-first) — every mutation
/// re-enforces both bounds, not just the one it touched.
pub fn add(log: &EventLog, event_id: &str, relevance: f64, topics: &[String], config: WorkingSetConfig) -> Result<i64> {
    let now = Utc::now();
    let expires_at = now + Duration::hours(config.window_hours);
    let id = log.insert_working_set_item(event_id, relevance, topics, expires_at)?;
    maintain(log, config)?;
    Ok(id)
}

/// Rehearsal: reset an item's TTL without changing its relevance or topics.
pub fn refresh(log: &EventLog, event_id: &str, config: WorkingSetConfig) -> Result<bool> {
    let expires_at = Utc::now() + Duration::hours(config.window_hours);
    Ok(log.refresh_working_set_item(event_id, expires_at)?)
}

pub fn maintain(log: &EventLog, config: WorkingSetConfig) -> Result<()> {
    log.expire_working_set(Utc::now())?;
    log.trim_working_set(config.max_events)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ctxmem_types::{EventInput, EventType};

    #[test]
    fn add_trims_the_set_down_to_max_events() {
        let mut log = EventLog::open_in_memory().unwrap();
        let config = WorkingSetConfig { window_hours: 24, max_events: 1 };

        log.append(EventInput::new(EventType::UserPrompt, "s1", "a"), &[1]).unwrap();
        let a = log.get_session_events("s1").unwrap().remove(0).id;
        add(&log, &a, 0.2, &[], config).unwrap();

        log.append(EventInput::new(EventType::UserPrompt, "s1", "b"), &[1]).unwrap();
        let b = log.get_session_events("s1").unwrap().pop().unwrap().id;
        add(&log, &b, 0.9, &[], config).unwrap();

        let remaining = log.list_working_set().unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].event_id, b);
    }
}
