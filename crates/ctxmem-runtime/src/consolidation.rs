//! Scheduling for the working-set consolidator (C8). `ctxmem-engine`
//! owns the actual grouping/summarization algorithm
//! ([`run_consolidation`]); this module only decides *when* to call it,
//! tracking the interval/count/idle triggers described in §4.8.

use crate::error::Result;
use chrono::{DateTime, Utc};
use ctxmem_engine::{run_consolidation, should_trigger, ConsolidationReport, ConsolidationTriggers};
use ctxmem_index::EventLog;

/// Tracks the state `should_trigger` needs across ticks: when the last
/// run happened, and when the working set was last observed to change
/// size (its best available proxy for "idle").
pub struct ConsolidationScheduler {
    triggers: ConsolidationTriggers,
    last_run: DateTime<Utc>,
    idle_since: DateTime<Utc>,
    last_count: usize,
}

impl ConsolidationScheduler {
    pub fn new(triggers: ConsolidationTriggers) -> Self {
        let now = Utc::now();
        Self {
            triggers,
            last_run: now,
            idle_since: now,
            last_count: 0,
        }
    }

    /// Evaluates the triggers against the working set's current size and
    /// runs a consolidation pass if any fire. Returns `None` on a tick
    /// that didn't trigger anything.
    pub fn tick(&mut self, log: &EventLog) -> Result<Option<ConsolidationReport>> {
        let now = Utc::now();
        let count = log.list_working_set()?.len();
        if count != self.last_count {
            self.idle_since = now;
            self.last_count = count;
        }

        if !should_trigger(now, self.last_run, count, self.idle_since, self.triggers) {
            return Ok(None);
        }

        let report = run_consolidation(log)?;
        self.last_run = now;
        self.idle_since = now;
        self.last_count = log.list_working_set()?.len();
        Ok(Some(report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use ctxmem_engine::add_to_working_set;
    use ctxmem_types::{EventInput, EventType};

    #[test]
    fn tick_is_a_no_op_before_any_trigger_fires() {
        let log = EventLog::open_in_memory().unwrap();
        let mut scheduler = ConsolidationScheduler::new(ConsolidationTriggers {
            interval: Duration::hours(1),
            event_count: 1000,
            idle: Duration::hours(1),
        });

        assert!(scheduler.tick(&log).unwrap().is_none());
    }

    #[test]
    fn reaching_the_event_count_trigger_runs_a_consolidation_pass() {
        let mut log = EventLog::open_in_memory().unwrap();
        let base = Utc::now() - Duration::minutes(10);
        for i in 0..9 {
            let input = EventInput::new(EventType::UserPrompt, "s1", format!("retry attempt {i}."))
                .with_timestamp(base + Duration::minutes(i));
            log.append(input, &[1]).unwrap();
            let event = log.get_session_events("s1").unwrap().pop().unwrap();
            add_to_working_set(&log, &event.id, 0.8, &["retry".to_string()], Default::default()).unwrap();
        }

        let mut scheduler = ConsolidationScheduler::new(ConsolidationTriggers {
            interval: Duration::hours(1),
            event_count: 5,
            idle: Duration::hours(1),
        });

        let report = scheduler.tick(&log).unwrap().expect("event-count trigger should fire");
        assert_eq!(report.memories_created.len(), 1);
    }
}
